//! Request queue storage.
//!
//! Claims are taken with a conditional update that only succeeds when the
//! row's claim columns still hold the values the caller read. The database
//! serializes competing updates, so at most one caller wins a given claim.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::format_datetime;
use super::models::{NewRequestGroupRecord, NewRequestRecord, RequestGroupRecord, RequestRecord};
use super::pool::{DbError, DbPool};
use crate::models::{
    Claim, ClaimedRequest, NewRequestGroup, Plugin, QueueStats, Request, RequestGroup,
};
use crate::schema::{plugin_versions, request_groups, requests};
use crate::with_conn;

fn claimed(pair: (RequestRecord, RequestGroupRecord)) -> ClaimedRequest {
    ClaimedRequest {
        request: Request::from(pair.0),
        group: RequestGroup::from(pair.1),
    }
}

/// Diesel-based request repository.
#[derive(Clone)]
pub struct DieselRequestRepository {
    pool: DbPool,
}

impl DieselRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a request group and one request per browser selection.
    ///
    /// Every request gets the same `priority`.
    pub async fn submit(
        &self,
        submission: &NewRequestGroup,
        priority: i32,
        now: DateTime<Utc>,
    ) -> Result<(RequestGroup, Vec<Request>), DbError> {
        let submission = submission.clone();
        let submitted = format_datetime(now);
        let expire = format_datetime(submission.expire);

        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let submission = submission.clone();
                let submitted = submitted.clone();
                let expire = expire.clone();
                Box::pin(async move {
                    let group: RequestGroupRecord = diesel::insert_into(request_groups::table)
                        .values(&NewRequestGroupRecord {
                            website: &submission.website,
                            width: submission.width,
                            height: submission.height,
                            bits_per_pixel: submission.bits_per_pixel,
                            javascript: submission.javascript,
                            java: submission.java,
                            flash: submission.flash,
                            submitted: &submitted,
                            expire: &expire,
                        })
                        .returning(RequestGroupRecord::as_returning())
                        .get_result(conn)
                        .await?;

                    let mut created = Vec::with_capacity(submission.browsers.len());
                    for spec in &submission.browsers {
                        let record: RequestRecord = diesel::insert_into(requests::table)
                            .values(&NewRequestRecord {
                                request_group_id: group.id,
                                platform: spec.platform.as_deref(),
                                browser_group: &spec.browser_group,
                                major: spec.major,
                                minor: spec.minor,
                                priority,
                            })
                            .returning(RequestRecord::as_returning())
                            .get_result(conn)
                            .await?;
                        created.push(Request::from(record));
                    }

                    Ok((RequestGroup::from(group), created))
                })
            })
            .await
        })
    }

    /// Look up a request and its group.
    pub async fn get(&self, id: i32) -> Result<Option<ClaimedRequest>, DbError> {
        with_conn!(self.pool, conn => {
            requests::table
                .inner_join(request_groups::table)
                .filter(requests::id.eq(id))
                .select((RequestRecord::as_select(), RequestGroupRecord::as_select()))
                .first::<(RequestRecord, RequestGroupRecord)>(&mut conn)
                .await
                .optional()
                .map(|r| r.map(claimed))
        })
    }

    /// Claimable requests for the given browser families, in selection order.
    ///
    /// Claimable means unfulfilled, in a group that has not expired, and
    /// either unclaimed or held by a claim older than `lease`. Ordered by
    /// priority descending, then submission time, then id.
    pub async fn find_candidates(
        &self,
        browser_groups: &[String],
        now: DateTime<Utc>,
        lease: Duration,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ClaimedRequest>, DbError> {
        let now_str = format_datetime(now);
        let stale_before = format_datetime(now - lease);

        with_conn!(self.pool, conn => {
            requests::table
                .inner_join(request_groups::table)
                .filter(requests::browser_group.eq_any(browser_groups.to_vec()))
                .filter(requests::fulfilled_at.is_null())
                .filter(request_groups::expire.gt(&now_str))
                .filter(
                    requests::locked_at
                        .is_null()
                        .or(requests::locked_at.lt(&stale_before)),
                )
                .order((
                    requests::priority.desc(),
                    request_groups::submitted.asc(),
                    requests::id.asc(),
                ))
                .offset(offset)
                .limit(limit)
                .select((RequestRecord::as_select(), RequestGroupRecord::as_select()))
                .load::<(RequestRecord, RequestGroupRecord)>(&mut conn)
                .await
                .map(|rows| rows.into_iter().map(claimed).collect())
        })
    }

    /// Claim a request for `factory_id` if its claim is still `expected`.
    ///
    /// Returns false when another caller changed the claim first or the
    /// request was fulfilled in the meantime.
    pub async fn try_claim(
        &self,
        request_id: i32,
        factory_id: i32,
        expected: Option<Claim>,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let locked_at = format_datetime(now);
        let changes = (
            requests::factory_id.eq(factory_id),
            requests::locked_at.eq(&locked_at),
        );
        let unfulfilled = requests::table
            .filter(requests::id.eq(request_id))
            .filter(requests::fulfilled_at.is_null());

        let rows = match expected {
            None => {
                with_conn!(self.pool, conn => {
                    diesel::update(unfulfilled.filter(requests::locked_at.is_null()))
                        .set(changes)
                        .execute(&mut conn)
                        .await?
                })
            }
            Some(claim) => {
                let held_since = format_datetime(claim.locked_at);
                with_conn!(self.pool, conn => {
                    diesel::update(
                        unfulfilled
                            .filter(requests::factory_id.eq(claim.factory_id))
                            .filter(requests::locked_at.eq(&held_since)),
                    )
                    .set(changes)
                    .execute(&mut conn)
                    .await?
                })
            }
        };

        Ok(rows == 1)
    }

    /// Mark a request fulfilled by `factory_id`.
    ///
    /// Only succeeds while that factory holds a live claim; returns false
    /// if the claim is missing, held by someone else, stale, or the request
    /// is already fulfilled.
    pub async fn fulfill(
        &self,
        request_id: i32,
        factory_id: i32,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<bool, DbError> {
        let fulfilled_at = format_datetime(now);
        let live_since = format_datetime(now - lease);

        with_conn!(self.pool, conn => {
            diesel::update(
                requests::table
                    .filter(requests::id.eq(request_id))
                    .filter(requests::factory_id.eq(factory_id))
                    .filter(requests::fulfilled_at.is_null())
                    .filter(requests::locked_at.ge(&live_since)),
            )
            .set(requests::fulfilled_at.eq(&fulfilled_at))
            .execute(&mut conn)
            .await
            .map(|rows| rows == 1)
        })
    }

    /// Drop `factory_id`'s claim on an unfulfilled request.
    pub async fn release_claim(&self, request_id: i32, factory_id: i32) -> Result<bool, DbError> {
        with_conn!(self.pool, conn => {
            diesel::update(
                requests::table
                    .filter(requests::id.eq(request_id))
                    .filter(requests::factory_id.eq(factory_id))
                    .filter(requests::fulfilled_at.is_null()),
            )
            .set((
                requests::factory_id.eq(None::<i32>),
                requests::locked_at.eq(None::<String>),
            ))
            .execute(&mut conn)
            .await
            .map(|rows| rows == 1)
        })
    }

    /// Clear every stale claim on an unfulfilled request.
    pub async fn release_stale_claims(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<usize, DbError> {
        let stale_before = format_datetime(now - lease);

        with_conn!(self.pool, conn => {
            diesel::update(
                requests::table
                    .filter(requests::fulfilled_at.is_null())
                    .filter(requests::locked_at.lt(&stale_before)),
            )
            .set((
                requests::factory_id.eq(None::<i32>),
                requests::locked_at.eq(None::<String>),
            ))
            .execute(&mut conn)
            .await
        })
    }

    /// Delete unfulfilled requests of expired groups, then expired groups
    /// left without requests. Returns `(requests, groups)` deleted.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<(usize, usize), DbError> {
        let now_str = format_datetime(now);

        with_conn!(self.pool, conn => {
            conn.transaction(|conn| {
                let now_str = now_str.clone();
                Box::pin(async move {
                    let expired: Vec<i32> = request_groups::table
                        .filter(request_groups::expire.le(&now_str))
                        .select(request_groups::id)
                        .load(conn)
                        .await?;
                    if expired.is_empty() {
                        return Ok((0, 0));
                    }

                    let deleted_requests = diesel::delete(
                        requests::table
                            .filter(requests::request_group_id.eq_any(expired.clone()))
                            .filter(requests::fulfilled_at.is_null()),
                    )
                    .execute(conn)
                    .await?;

                    let still_referenced: Vec<i32> = requests::table
                        .filter(requests::request_group_id.eq_any(expired.clone()))
                        .select(requests::request_group_id)
                        .distinct()
                        .load(conn)
                        .await?;
                    let empty: Vec<i32> = expired
                        .into_iter()
                        .filter(|id| !still_referenced.contains(id))
                        .collect();

                    let deleted_groups = diesel::delete(
                        request_groups::table.filter(request_groups::id.eq_any(empty)),
                    )
                    .execute(conn)
                    .await?;

                    Ok((deleted_requests, deleted_groups))
                })
            })
            .await
        })
    }

    /// Most recently submitted requests first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<ClaimedRequest>, DbError> {
        with_conn!(self.pool, conn => {
            requests::table
                .inner_join(request_groups::table)
                .order((request_groups::submitted.desc(), requests::id.desc()))
                .limit(limit)
                .select((RequestRecord::as_select(), RequestGroupRecord::as_select()))
                .load::<(RequestRecord, RequestGroupRecord)>(&mut conn)
                .await
                .map(|rows| rows.into_iter().map(claimed).collect())
        })
    }

    /// Count requests in each lifecycle state.
    pub async fn stats(&self, now: DateTime<Utc>, lease: Duration) -> Result<QueueStats, DbError> {
        let now_str = format_datetime(now);
        let stale_before = format_datetime(now - lease);

        with_conn!(self.pool, conn => {
            let fulfilled: i64 = requests::table
                .filter(requests::fulfilled_at.is_not_null())
                .count()
                .get_result(&mut conn)
                .await?;

            let expired: i64 = requests::table
                .inner_join(request_groups::table)
                .filter(requests::fulfilled_at.is_null())
                .filter(request_groups::expire.le(&now_str))
                .count()
                .get_result(&mut conn)
                .await?;

            let open = || {
                requests::table
                    .inner_join(request_groups::table)
                    .filter(requests::fulfilled_at.is_null())
                    .filter(request_groups::expire.gt(&now_str))
            };

            let pending: i64 = open()
                .filter(requests::locked_at.is_null())
                .count()
                .get_result(&mut conn)
                .await?;

            let stale: i64 = open()
                .filter(requests::locked_at.lt(&stale_before))
                .count()
                .get_result(&mut conn)
                .await?;

            let claimed: i64 = open()
                .filter(requests::locked_at.ge(&stale_before))
                .count()
                .get_result(&mut conn)
                .await?;

            Ok(QueueStats {
                pending: pending as u64,
                claimed: claimed as u64,
                stale: stale as u64,
                fulfilled: fulfilled as u64,
                expired: expired as u64,
            })
        })
    }

    /// Human-readable label for a plugin version key, e.g. `enabled`.
    pub async fn plugin_label(&self, plugin: Plugin, id: i32) -> Result<Option<String>, DbError> {
        with_conn!(self.pool, conn => {
            plugin_versions::table
                .filter(plugin_versions::plugin.eq(plugin.as_str()))
                .filter(plugin_versions::id.eq(id))
                .select(plugin_versions::version)
                .first::<String>(&mut conn)
                .await
                .optional()
        })
    }
}
