use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_factories")
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE factories (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL UNIQUE,
    operating_system TEXT NOT NULL,
    password_hash TEXT,
    ip TEXT,
    last_poll TEXT,
    last_upload TEXT,
    created_at TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE factories (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    operating_system TEXT NOT NULL,
    password_hash TEXT,
    ip TEXT,
    last_poll TEXT,
    last_upload TEXT,
    created_at TEXT NOT NULL
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE factory_screen_sizes (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    UNIQUE (factory_id, width, height)
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE factory_screen_sizes (
    id SERIAL PRIMARY KEY,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    UNIQUE (factory_id, width, height)
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE factory_color_depths (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    bits_per_pixel INTEGER NOT NULL,
    UNIQUE (factory_id, bits_per_pixel)
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE factory_color_depths (
    id SERIAL PRIMARY KEY,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    bits_per_pixel INTEGER NOT NULL,
    UNIQUE (factory_id, bits_per_pixel)
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE factory_browsers (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    browser_group TEXT NOT NULL,
    version TEXT NOT NULL,
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    command TEXT NOT NULL DEFAULT '',
    javascript INTEGER NOT NULL DEFAULT 1,
    java INTEGER NOT NULL DEFAULT 1,
    flash INTEGER NOT NULL DEFAULT 1,
    active INTEGER NOT NULL DEFAULT 1
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE factory_browsers (
    id SERIAL PRIMARY KEY,
    factory_id INTEGER NOT NULL REFERENCES factories(id),
    browser_group TEXT NOT NULL,
    version TEXT NOT NULL,
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    command TEXT NOT NULL DEFAULT '',
    javascript INTEGER NOT NULL DEFAULT 1,
    java INTEGER NOT NULL DEFAULT 1,
    flash INTEGER NOT NULL DEFAULT 1,
    active INTEGER NOT NULL DEFAULT 1
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_factory_browsers_factory ON factory_browsers(factory_id)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX idx_factory_browsers_factory ON factory_browsers(factory_id)",
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE plugin_versions (
    plugin TEXT NOT NULL,
    id INTEGER NOT NULL,
    version TEXT NOT NULL,
    PRIMARY KEY (plugin, id)
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE plugin_versions (
    plugin TEXT NOT NULL,
    id INTEGER NOT NULL,
    version TEXT NOT NULL,
    PRIMARY KEY (plugin, id)
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"INSERT INTO plugin_versions (plugin, id, version) VALUES
    ('javascript', 1, 'disabled'), ('javascript', 2, 'enabled'),
    ('java', 1, 'disabled'), ('java', 2, 'enabled'),
    ('flash', 1, 'disabled'), ('flash', 2, 'enabled')"#,
                )
                .for_backend(
                    "postgres",
                    r#"INSERT INTO plugin_versions (plugin, id, version) VALUES
    ('javascript', 1, 'disabled'), ('javascript', 2, 'enabled'),
    ('java', 1, 'disabled'), ('java', 2, 'enabled'),
    ('flash', 1, 'disabled'), ('flash', 2, 'enabled')"#,
                ),
        )
}
