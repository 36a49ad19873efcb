//! Repository layer for database persistence.
//!
//! All database access uses Diesel with diesel-async. SQLite is the default
//! backend; PostgreSQL is available with the `postgres` feature.

pub mod context;
pub mod factory;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod priority;
pub mod request;
pub mod util;

pub use context::DbContext;
pub use factory::DieselFactoryRepository;
pub use pool::{DbError, DbPool};
pub use priority::DieselPriorityRepository;
pub use request::DieselRequestRepository;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
///
/// Fixed width with microseconds and a `Z` suffix, so string comparison in
/// SQL agrees with chronological order.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
