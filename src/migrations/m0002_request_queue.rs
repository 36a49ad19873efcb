use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_request_queue")
        .depends_on(&["0001_factories"])
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE request_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    website TEXT NOT NULL,
    width INTEGER,
    height INTEGER,
    bits_per_pixel INTEGER,
    javascript INTEGER,
    java INTEGER,
    flash INTEGER,
    submitted TEXT NOT NULL,
    expire TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE request_groups (
    id SERIAL PRIMARY KEY,
    website TEXT NOT NULL,
    width INTEGER,
    height INTEGER,
    bits_per_pixel INTEGER,
    javascript INTEGER,
    java INTEGER,
    flash INTEGER,
    submitted TEXT NOT NULL,
    expire TEXT NOT NULL
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    request_group_id INTEGER NOT NULL REFERENCES request_groups(id),
    platform TEXT,
    browser_group TEXT NOT NULL,
    major INTEGER,
    minor INTEGER,
    priority INTEGER NOT NULL DEFAULT 0,
    factory_id INTEGER REFERENCES factories(id),
    locked_at TEXT,
    fulfilled_at TEXT,
    CHECK ((factory_id IS NULL) = (locked_at IS NULL))
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE requests (
    id SERIAL PRIMARY KEY,
    request_group_id INTEGER NOT NULL REFERENCES request_groups(id),
    platform TEXT,
    browser_group TEXT NOT NULL,
    major INTEGER,
    minor INTEGER,
    priority INTEGER NOT NULL DEFAULT 0,
    factory_id INTEGER REFERENCES factories(id),
    locked_at TEXT,
    fulfilled_at TEXT,
    CHECK ((factory_id IS NULL) = (locked_at IS NULL))
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_requests_open ON requests(browser_group, priority DESC) WHERE fulfilled_at IS NULL",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX idx_requests_open ON requests(browser_group, priority DESC) WHERE fulfilled_at IS NULL",
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_requests_group ON requests(request_group_id)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX idx_requests_group ON requests(request_group_id)",
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_request_groups_expire ON request_groups(expire)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX idx_request_groups_expire ON request_groups(expire)",
                ),
        )
}
