//! Schema migrations, applied by `repository::migrations::run_migrations`.

mod m0001_factories;
mod m0002_request_queue;
mod m0003_domain_priorities;

use cetane::prelude::MigrationRegistry;

pub fn registry() -> MigrationRegistry {
    let mut reg = MigrationRegistry::new();
    reg.register(m0001_factories::migration());
    reg.register(m0002_request_queue::migration());
    reg.register(m0003_domain_priorities::migration());
    reg
}
