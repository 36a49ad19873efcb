//! Initialize command.

use console::style;

use crate::config::Settings;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    println!(
        "{} Initialized shotqueue in {}",
        style("✓").green(),
        if settings.is_postgres() {
            "PostgreSQL".to_string()
        } else {
            settings.database_path().display().to_string()
        }
    );
    println!("  Register a factory with: shotqueue factory add <name>");

    Ok(())
}
