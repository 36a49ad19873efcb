//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection pool and hands out repositories.

use std::path::Path;

use super::factory::DieselFactoryRepository;
use super::migrations::run_migrations;
use super::pool::{DbError, DbPool};
use super::priority::DieselPriorityRepository;
use super::request::DieselRequestRepository;

/// # Example
/// ```ignore
/// let ctx = DbContext::from_url("postgres://localhost/shotqueue")?;
/// let inventory = ctx.factories().get_inventory(7).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: DbPool,
    database_url: String,
}

impl DbContext {
    /// Create a context from a database URL.
    ///
    /// Supports:
    /// - SQLite: file paths or `sqlite:` URLs
    /// - PostgreSQL: `postgres://` or `postgresql://` URLs
    pub fn from_url(url: &str) -> Result<Self, DbError> {
        Ok(Self {
            pool: DbPool::from_url(url)?,
            database_url: url.to_string(),
        })
    }

    /// Create a context for a SQLite database file.
    pub fn from_sqlite_path(path: &Path) -> Self {
        Self {
            pool: DbPool::sqlite_from_path(path),
            database_url: path.display().to_string(),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Create or upgrade the schema.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        run_migrations(&self.database_url).await
    }

    pub fn factories(&self) -> DieselFactoryRepository {
        DieselFactoryRepository::new(self.pool.clone())
    }

    pub fn requests(&self) -> DieselRequestRepository {
        DieselRequestRepository::new(self.pool.clone())
    }

    pub fn priorities(&self) -> DieselPriorityRepository {
        DieselPriorityRepository::new(self.pool.clone())
    }
}
