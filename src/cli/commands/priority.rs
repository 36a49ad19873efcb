//! Domain priority commands.

use chrono::{Duration, Utc};
use console::style;

use crate::config::Settings;

/// Boost a domain until the given number of days from now.
pub async fn cmd_priority_set(
    settings: &Settings,
    domain: &str,
    priority: i32,
    days: i64,
) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    let expire = Utc::now() + Duration::days(days);
    let entry = ctx.priorities().set(domain, priority, expire).await?;
    println!(
        "{} {} priority {} until {}",
        style("✓").green(),
        style(&entry.domain).bold(),
        entry.priority,
        entry.expire.format("%Y-%m-%d")
    );
    Ok(())
}

/// List live domain priorities.
pub async fn cmd_priority_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    let entries = ctx.priorities().list_active(Utc::now()).await?;
    if entries.is_empty() {
        println!("{} No domain priorities set", style("!").yellow());
        return Ok(());
    }
    for entry in entries {
        println!(
            "{:>4}  {}  until {}",
            entry.priority,
            entry.domain,
            entry.expire.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
