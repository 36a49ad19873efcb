//! Factory registry commands.

use chrono::Utc;
use console::style;

use super::super::helpers::split_version;
use crate::auth::hash_password;
use crate::config::Settings;
use crate::models::{ColorDepth, Factory, NewBrowser, NewFactory, ScreenSize};
use crate::repository::{DbContext, DieselFactoryRepository};

/// Browser registration arguments.
pub struct BrowserArgs {
    pub browser: String,
    pub version: String,
    pub command: String,
    pub javascript: i32,
    pub java: i32,
    pub flash: i32,
}

async fn open(settings: &Settings) -> anyhow::Result<DbContext> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    Ok(ctx)
}

async fn find(repo: &DieselFactoryRepository, name: &str) -> anyhow::Result<Factory> {
    repo.get_by_name(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Factory '{}' not found", name))
}

/// Register a new factory.
pub async fn cmd_factory_add(
    settings: &Settings,
    name: &str,
    os: &str,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.factories();

    if repo.get_by_name(name).await?.is_some() {
        anyhow::bail!("Factory '{}' already exists", name);
    }

    let factory = repo
        .create(
            &NewFactory {
                name: name.to_string(),
                operating_system: os.to_lowercase(),
                password_hash: password.map(hash_password),
            },
            Utc::now(),
        )
        .await?;

    println!(
        "{} Registered factory {} (id {}, {})",
        style("✓").green(),
        style(&factory.name).bold(),
        factory.id,
        factory.operating_system
    );
    if password.is_none() {
        println!(
            "  {} No password set; any credential will be accepted",
            style("!").yellow()
        );
    }
    Ok(())
}

/// Register screen sizes for a factory.
pub async fn cmd_factory_screen(
    settings: &Settings,
    name: &str,
    sizes: &[ScreenSize],
) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.factories();
    let factory = find(&repo, name).await?;

    for size in sizes {
        repo.add_screen_size(factory.id, *size).await?;
        println!("  {} {} {}", style("✓").green(), factory.name, size);
    }
    Ok(())
}

/// Register color depths for a factory.
pub async fn cmd_factory_depth(
    settings: &Settings,
    name: &str,
    depths: &[i32],
) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.factories();
    let factory = find(&repo, name).await?;

    for &bits_per_pixel in depths {
        if bits_per_pixel <= 0 {
            anyhow::bail!("Invalid color depth: {}", bits_per_pixel);
        }
        repo.add_color_depth(factory.id, ColorDepth { bits_per_pixel })
            .await?;
        println!("  {} {} {}bpp", style("✓").green(), factory.name, bits_per_pixel);
    }
    Ok(())
}

/// Register a browser installation for a factory.
pub async fn cmd_factory_browser(
    settings: &Settings,
    name: &str,
    args: BrowserArgs,
) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.factories();
    let factory = find(&repo, name).await?;

    let (major, minor) = split_version(&args.version).map_err(anyhow::Error::msg)?;
    let mut browser = NewBrowser::new(args.browser, args.version, major, minor);
    browser.command = args.command;
    browser.javascript = args.javascript;
    browser.java = args.java;
    browser.flash = args.flash;

    let browser = repo.add_browser(factory.id, &browser).await?;
    println!(
        "{} Added {} {} to {} (browser id {})",
        style("✓").green(),
        browser.browser_group,
        browser.version,
        factory.name,
        browser.id
    );
    Ok(())
}

/// Enable or disable a browser.
pub async fn cmd_factory_toggle(
    settings: &Settings,
    browser_id: i32,
    active: bool,
) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    if !ctx.factories().set_browser_active(browser_id, active).await? {
        anyhow::bail!("Browser {} not found", browser_id);
    }
    println!(
        "{} Browser {} {}",
        style("✓").green(),
        browser_id,
        if active { "enabled" } else { "disabled" }
    );
    Ok(())
}

/// List factories with their inventory.
pub async fn cmd_factory_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.factories();
    let factories = repo.list().await?;

    if factories.is_empty() {
        println!("{} No factories registered", style("!").yellow());
        return Ok(());
    }

    for factory in factories {
        let last_poll = factory
            .last_poll
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{} {} [{}] last poll {}",
            style(factory.id).dim(),
            style(&factory.name).bold(),
            factory.operating_system,
            last_poll
        );

        let Some(inventory) = repo.get_inventory(factory.id).await? else {
            continue;
        };
        let sizes: Vec<String> = inventory.screen_sizes.iter().map(|s| s.to_string()).collect();
        let depths: Vec<String> = inventory
            .color_depths
            .iter()
            .map(|d| d.bits_per_pixel.to_string())
            .collect();
        println!("    screens: {}", sizes.join(", "));
        println!("    depths:  {}", depths.join(", "));
        for browser in &inventory.browsers {
            let state = if browser.active {
                style("active").green()
            } else {
                style("inactive").red()
            };
            println!(
                "    #{} {} {} ({}.{}) js={} java={} flash={} {}",
                browser.id,
                browser.browser_group,
                browser.version,
                browser.major,
                browser.minor,
                browser.javascript,
                browser.java,
                browser.flash,
                state
            );
        }
    }
    Ok(())
}
