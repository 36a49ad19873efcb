//! Per-domain submission priorities.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::format_datetime;
use super::models::{DomainPriorityRecord, NewDomainPriorityRecord};
use super::pool::{DbError, DbPool};
use crate::models::DomainPriority;
use crate::schema::domain_priorities;
use crate::with_conn;

#[derive(Clone)]
pub struct DieselPriorityRepository {
    pool: DbPool,
}

impl DieselPriorityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Grant `priority` to `domain` and its subdomains until `expire`.
    pub async fn set(
        &self,
        domain: &str,
        priority: i32,
        expire: DateTime<Utc>,
    ) -> Result<DomainPriority, DbError> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let expire = format_datetime(expire);
        let record = NewDomainPriorityRecord {
            domain: &domain,
            priority,
            expire: &expire,
        };

        with_conn!(self.pool, conn => {
            diesel::insert_into(domain_priorities::table)
                .values(&record)
                .returning(DomainPriorityRecord::as_returning())
                .get_result(&mut conn)
                .await
                .map(DomainPriority::from)
        })
    }

    /// Entries that have not expired, highest priority first.
    pub async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<DomainPriority>, DbError> {
        let now = format_datetime(now);
        with_conn!(self.pool, conn => {
            domain_priorities::table
                .filter(domain_priorities::expire.gt(&now))
                .order((domain_priorities::priority.desc(), domain_priorities::domain.asc()))
                .select(DomainPriorityRecord::as_select())
                .load(&mut conn)
                .await
                .map(|records| records.into_iter().map(DomainPriority::from).collect())
        })
    }

    /// Highest live priority covering `host`, if any.
    pub async fn priority_for_host(
        &self,
        host: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>, DbError> {
        let entries = self.list_active(now).await?;
        Ok(entries
            .iter()
            .filter(|p| p.covers(host, now))
            .map(|p| p.priority)
            .max())
    }
}
