//! Schema tests
//!
//! Runs the real migrations against a fresh SQLite file and inspects the
//! resulting tables, indexes and constraints.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, Result as SqliteResult};

use shotqueue::repository::migrations::run_migrations;

/// Represents a SQLite index
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexInfo {
    table: String,
    columns: Vec<String>,
    partial: Option<String>,
}

/// Column names per table
fn extract_tables(conn: &Connection) -> SqliteResult<BTreeMap<String, BTreeSet<String>>> {
    let mut tables = BTreeMap::new();

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let table_names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<_>>>()?;

    for table_name in table_names {
        let mut pragma = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table_name))?;
        let columns = pragma
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<SqliteResult<BTreeSet<_>>>()?;
        tables.insert(table_name, columns);
    }

    Ok(tables)
}

/// Extract indexes from a SQLite connection
fn extract_indexes(conn: &Connection) -> SqliteResult<BTreeMap<String, IndexInfo>> {
    let mut indexes = BTreeMap::new();

    let mut stmt = conn.prepare(
        "SELECT name, tbl_name, sql FROM sqlite_master WHERE type='index' AND sql IS NOT NULL ORDER BY name",
    )?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;

    for (name, table, sql) in rows {
        let partial = sql
            .to_uppercase()
            .find(" WHERE ")
            .map(|idx| sql[idx + 7..].trim().to_string());

        let mut pragma = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name))?;
        let columns: Vec<String> = pragma
            .query_map([], |row| {
                row.get::<_, Option<String>>(2)
                    .map(|opt| opt.unwrap_or_else(|| "<expr>".to_string()))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        indexes.insert(
            name,
            IndexInfo {
                table,
                columns,
                partial,
            },
        );
    }

    Ok(indexes)
}

async fn migrated() -> (Connection, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.db");
    run_migrations(&format!("sqlite:{}", path.display()))
        .await
        .unwrap();
    (Connection::open(&path).unwrap(), dir)
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_tables_and_columns() {
    let (conn, _dir) = migrated().await;
    let tables = extract_tables(&conn).unwrap();

    assert_eq!(
        tables["factories"],
        set(&[
            "id",
            "name",
            "operating_system",
            "password_hash",
            "ip",
            "last_poll",
            "last_upload",
            "created_at"
        ])
    );
    assert_eq!(
        tables["requests"],
        set(&[
            "id",
            "request_group_id",
            "platform",
            "browser_group",
            "major",
            "minor",
            "priority",
            "factory_id",
            "locked_at",
            "fulfilled_at"
        ])
    );
    assert_eq!(
        tables["request_groups"],
        set(&[
            "id",
            "website",
            "width",
            "height",
            "bits_per_pixel",
            "javascript",
            "java",
            "flash",
            "submitted",
            "expire"
        ])
    );
    for table in [
        "factory_screen_sizes",
        "factory_color_depths",
        "factory_browsers",
        "plugin_versions",
        "domain_priorities",
    ] {
        assert!(tables.contains_key(table), "missing table {}", table);
    }
}

#[tokio::test]
async fn test_open_request_index_is_partial() {
    let (conn, _dir) = migrated().await;
    let indexes = extract_indexes(&conn).unwrap();

    let open = &indexes["idx_requests_open"];
    assert_eq!(open.table, "requests");
    assert_eq!(open.columns, vec!["browser_group", "priority"]);
    assert_eq!(open.partial.as_deref(), Some("fulfilled_at IS NULL"));

    assert_eq!(indexes["idx_requests_group"].columns, vec!["request_group_id"]);
    assert_eq!(indexes["idx_request_groups_expire"].columns, vec!["expire"]);
}

#[tokio::test]
async fn test_claim_columns_set_together() {
    let (conn, _dir) = migrated().await;
    conn.execute_batch(
        "INSERT INTO request_groups (website, submitted, expire)
         VALUES ('http://example.com/', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:30:00.000000Z');
         INSERT INTO factories (name, operating_system, created_at)
         VALUES ('shot01', 'linux', '2024-01-01T00:00:00.000000Z');",
    )
    .unwrap();

    let half_claim = conn.execute(
        "INSERT INTO requests (request_group_id, browser_group, factory_id) VALUES (1, 'Firefox', 1)",
        [],
    );
    assert!(half_claim.is_err());

    let full_claim = conn.execute(
        "INSERT INTO requests (request_group_id, browser_group, factory_id, locked_at)
         VALUES (1, 'Firefox', 1, '2024-01-01T00:00:00.000000Z')",
        [],
    );
    assert!(full_claim.is_ok());
}

#[tokio::test]
async fn test_journal_mode_is_wal() {
    let (conn, _dir) = migrated().await;
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
