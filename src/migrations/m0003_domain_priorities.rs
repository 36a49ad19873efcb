use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0003_domain_priorities")
        .depends_on(&["0002_request_queue"])
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    r#"CREATE TABLE domain_priorities (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    domain TEXT NOT NULL,
    priority INTEGER NOT NULL,
    expire TEXT NOT NULL
)"#,
                )
                .for_backend(
                    "postgres",
                    r#"CREATE TABLE domain_priorities (
    id SERIAL PRIMARY KEY,
    domain TEXT NOT NULL,
    priority INTEGER NOT NULL,
    expire TEXT NOT NULL
)"#,
                ),
        )
        .operation(
            RunSql::portable()
                .for_backend(
                    "sqlite",
                    "CREATE INDEX idx_domain_priorities_domain ON domain_priorities(domain)",
                )
                .for_backend(
                    "postgres",
                    "CREATE INDEX idx_domain_priorities_domain ON domain_priorities(domain)",
                ),
        )
}
