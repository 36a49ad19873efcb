//! Database migrations using cetane.
//!
//! SQLite migrations run on a blocking task through rusqlite; PostgreSQL
//! migrations run on an async diesel connection.

use cetane::migrator::MigrationStateStore;
use tracing::info;

use super::pool::DbError;
use super::util::is_postgres_url;

/// Run pending migrations for a database URL.
pub async fn run_migrations(database_url: &str) -> Result<(), DbError> {
    if is_postgres_url(database_url) {
        #[cfg(feature = "postgres")]
        {
            run_postgres_migrations(database_url).await
        }
        #[cfg(not(feature = "postgres"))]
        {
            Err(migration_error(
                "PostgreSQL support not compiled. Use --features postgres",
            ))
        }
    } else {
        run_sqlite_migrations(database_url).await
    }
}

fn migration_error(msg: impl std::fmt::Display) -> DbError {
    DbError::QueryBuilderError(msg.to_string().into())
}

async fn run_sqlite_migrations(database_url: &str) -> Result<(), DbError> {
    use cetane::backend::Sqlite;
    use cetane::migrator::Migrator;

    let path = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let conn = rusqlite::Connection::open(&path).map_err(migration_error)?;

        // Persistent per database file; lets pollers read while one claims.
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(migration_error)?;

        let registry = crate::migrations::registry();
        let state = SqliteState::new(&conn)?;
        let mut migrator = Migrator::new(&registry, &Sqlite, state);
        let applied = migrator
            .migrate_forward(|sql| conn.execute_batch(sql).map_err(|e| e.to_string()))
            .map_err(migration_error)?;

        log_applied(&applied);
        Ok(())
    })
    .await
    .map_err(|e| DbError::QueryBuilderError(Box::new(e)))?
}

#[cfg(feature = "postgres")]
async fn run_postgres_migrations(database_url: &str) -> Result<(), DbError> {
    use cetane::backend::Postgres;
    use diesel::sql_types::Text;
    use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};

    #[derive(diesel::QueryableByName)]
    struct AppliedName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    let mut conn = AsyncPgConnection::establish(database_url)
        .await
        .map_err(super::util::to_diesel_error)?;

    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS __cetane_migrations (
            name TEXT PRIMARY KEY NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .await?;

    let already: Vec<String> = diesel::sql_query("SELECT name FROM __cetane_migrations")
        .load::<AppliedName>(&mut conn)
        .await?
        .into_iter()
        .map(|row| row.name)
        .collect();

    let registry = crate::migrations::registry();
    let order = registry.resolve_order().map_err(migration_error)?;
    let mut applied = Vec::new();

    for name in order {
        if already.iter().any(|a| a == name) {
            continue;
        }
        let migration = registry
            .get(name)
            .ok_or_else(|| migration_error(format!("unknown migration {}", name)))?;
        let statements = migration.forward_sql(&Postgres);
        let name = name.to_string();

        conn.transaction(|conn| {
            let name = name.clone();
            Box::pin(async move {
                for stmt in statements.iter().filter(|s| !s.trim().is_empty()) {
                    conn.batch_execute(stmt).await?;
                }
                diesel::sql_query("INSERT INTO __cetane_migrations (name) VALUES ($1)")
                    .bind::<Text, _>(&name)
                    .execute(conn)
                    .await?;
                Ok::<(), DbError>(())
            })
        })
        .await?;

        applied.push(name);
    }

    log_applied(&applied);
    Ok(())
}

fn log_applied<S: AsRef<str>>(applied: &[S]) {
    for name in applied {
        info!("Applied migration: {}", name.as_ref());
    }
    if applied.is_empty() {
        info!("No pending migrations");
    }
}

/// Applied-migration bookkeeping in the `__cetane_migrations` table.
struct SqliteState<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SqliteState<'a> {
    fn new(conn: &'a rusqlite::Connection) -> Result<Self, DbError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS __cetane_migrations (
                name TEXT PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .map_err(migration_error)?;

        Ok(Self { conn })
    }
}

impl MigrationStateStore for SqliteState<'_> {
    fn applied_migrations(&mut self) -> Result<Vec<String>, String> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM __cetane_migrations ORDER BY name")
            .map_err(|e| e.to_string())?;

        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| e.to_string())?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(names)
    }

    fn mark_applied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO __cetane_migrations (name) VALUES (?1)",
                [name],
            )
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn mark_unapplied(&mut self, name: &str) -> Result<(), String> {
        self.conn
            .execute("DELETE FROM __cetane_migrations WHERE name = ?1", [name])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(path: &std::path::Path) -> Vec<String> {
        let conn = rusqlite::Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_create_schema_and_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shotqueue.db");
        let url = path.display().to_string();

        run_migrations(&url).await.unwrap();
        run_migrations(&url).await.unwrap();

        let tables = table_names(&path);
        for expected in [
            "factories",
            "factory_browsers",
            "factory_color_depths",
            "factory_screen_sizes",
            "plugin_versions",
            "request_groups",
            "requests",
            "domain_priorities",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }

        let conn = rusqlite::Connection::open(&path).unwrap();
        let seeded: i64 = conn
            .query_row("SELECT COUNT(*) FROM plugin_versions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(seeded, 6);
    }
}
