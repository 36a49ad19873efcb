//! Queue commands: submit, list, clean up and summarize requests.

use chrono::{Duration, Utc};
use console::style;

use crate::config::Settings;
use crate::models::{BrowserSpec, NewRequestGroup, RequestStatus};
use crate::repository::DbContext;
use crate::services::SubmitService;

/// Request group submission arguments.
pub struct SubmitArgs {
    pub url: String,
    pub browsers: Vec<BrowserSpec>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub bpp: Option<i32>,
    pub javascript: Option<i32>,
    pub java: Option<i32>,
    pub flash: Option<i32>,
    pub expire_minutes: Option<i64>,
}

async fn open(settings: &Settings) -> anyhow::Result<DbContext> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    Ok(ctx)
}

/// Queue a request group with one request per browser.
pub async fn cmd_submit(settings: &Settings, args: SubmitArgs) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let now = Utc::now();
    let lifetime = args
        .expire_minutes
        .map(Duration::minutes)
        .unwrap_or_else(|| settings.default_expire());

    let mut submission = NewRequestGroup::new(args.url, now + lifetime);
    submission.width = args.width;
    submission.height = args.height;
    submission.bits_per_pixel = args.bpp;
    submission.javascript = args.javascript;
    submission.java = args.java;
    submission.flash = args.flash;
    submission.browsers = args.browsers;

    let service = SubmitService::new(&ctx, settings.default_priority);
    let (group, requests) = service.submit(&submission, now).await?;

    println!(
        "{} Queued {} (group {}, expires {})",
        style("✓").green(),
        style(&group.website).bold(),
        group.id,
        group.expire.format("%Y-%m-%d %H:%M:%S")
    );
    for request in requests {
        println!(
            "  #{} {} priority {}",
            request.id,
            describe_browser(
                &request.browser_group,
                request.major,
                request.minor,
                request.platform.as_deref()
            ),
            request.priority
        );
    }
    Ok(())
}

fn describe_browser(
    group: &str,
    major: Option<i32>,
    minor: Option<i32>,
    platform: Option<&str>,
) -> String {
    let mut out = group.to_string();
    if let Some(major) = major {
        out.push_str(&format!(" {}", major));
        if let Some(minor) = minor {
            out.push_str(&format!(".{}", minor));
        }
    }
    if let Some(platform) = platform {
        out.push_str(&format!(" on {}", platform));
    }
    out
}

/// List the newest requests.
pub async fn cmd_requests(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let now = Utc::now();
    let items = ctx.requests().recent(limit.max(1)).await?;

    if items.is_empty() {
        println!("{} No requests queued", style("!").yellow());
        return Ok(());
    }

    for item in items {
        let (request, group) = (&item.request, &item.group);
        let status = request.status(group, now, settings.lease());
        let label = match status {
            RequestStatus::Pending => style(status.as_str()).cyan(),
            RequestStatus::Claimed => style(status.as_str()).yellow(),
            RequestStatus::Stale => style(status.as_str()).magenta(),
            RequestStatus::Fulfilled => style(status.as_str()).green(),
            RequestStatus::Expired => style(status.as_str()).red(),
        };
        let holder = request
            .claim
            .map(|c| format!(" by factory {}", c.factory_id))
            .unwrap_or_default();
        println!(
            "{:>6} {:<9} p{:<3} {} [{}]{}",
            request.id,
            label,
            request.priority,
            group.website,
            describe_browser(
                &request.browser_group,
                request.major,
                request.minor,
                request.platform.as_deref()
            ),
            holder
        );
    }
    Ok(())
}

/// Release stale claims and delete expired work.
pub async fn cmd_cleanup(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let repo = ctx.requests();
    let now = Utc::now();

    let released = repo.release_stale_claims(now, settings.lease()).await?;
    let (requests, groups) = repo.purge_expired(now).await?;

    println!(
        "{} Released {} stale claims, purged {} expired requests in {} groups",
        style("✓").green(),
        released,
        requests,
        groups
    );
    Ok(())
}

/// Show queue counters.
pub async fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open(settings).await?;
    let stats = ctx.requests().stats(Utc::now(), settings.lease()).await?;
    let active = ctx.factories().list_active().await?;

    println!("{}", style("Queue").bold());
    println!("  pending:   {}", stats.pending);
    println!("  claimed:   {}", stats.claimed);
    println!("  stale:     {}", stats.stale);
    println!("  fulfilled: {}", stats.fulfilled);
    println!("  expired:   {}", stats.expired);
    println!("{}", style("Factories").bold());
    if active.is_empty() {
        println!("  none have polled yet");
    }
    for factory in active {
        let last_poll = factory
            .last_poll
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!(
            "  {} last poll {}{}",
            factory.name,
            last_poll,
            factory
                .ip
                .map(|ip| format!(" from {}", ip))
                .unwrap_or_default()
        );
    }
    Ok(())
}
