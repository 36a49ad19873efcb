//! Factory-side commands: poll for work and report fulfillment.
//!
//! Both talk to a remote server when `--server` is given and to the local
//! database otherwise.

use std::sync::Arc;

use chrono::Utc;
use console::style;

use crate::auth::PasswordVerifier;
use crate::client::{default_factory_name, FactoryClient};
use crate::config::Settings;
use crate::models::Assignment;
use crate::services::{PollError, PollService};
use crate::work_queue::DbWorkQueue;

async fn local_service(settings: &Settings) -> anyhow::Result<PollService> {
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;
    let queue = Arc::new(DbWorkQueue::new(ctx.requests(), settings.lease()));
    Ok(PollService::new(&ctx, queue, Arc::new(PasswordVerifier))
        .with_release_on_browser_mismatch(settings.release_on_browser_mismatch))
}

fn print_assignment(assignment: &Assignment) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(assignment)?);
    Ok(())
}

/// Claim the next request this factory can serve.
pub async fn cmd_poll(
    settings: &Settings,
    server: Option<&str>,
    factory: Option<String>,
    credential: &str,
) -> anyhow::Result<()> {
    let factory = factory.unwrap_or_else(default_factory_name);

    if let Some(server) = server {
        let client = FactoryClient::new(server)?;
        return match client.poll(&factory, credential).await {
            Ok(assignment) => print_assignment(&assignment),
            Err(e) if e.is_no_work() => {
                eprintln!("{} No matching request", style("!").yellow());
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
    }

    let service = local_service(settings).await?;
    match service.poll(&factory, credential, None, Utc::now()).await {
        Ok(assignment) => print_assignment(&assignment),
        Err(PollError::NoMatchingRequest) => {
            eprintln!("{} No matching request", style("!").yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Report a claimed request as done.
pub async fn cmd_fulfill(
    settings: &Settings,
    request_id: i32,
    server: Option<&str>,
    factory: Option<String>,
    credential: &str,
) -> anyhow::Result<()> {
    let factory = factory.unwrap_or_else(default_factory_name);

    if let Some(server) = server {
        FactoryClient::new(server)?
            .fulfill(&factory, credential, request_id)
            .await?;
    } else {
        local_service(settings)
            .await?
            .fulfill(&factory, credential, request_id, Utc::now())
            .await?;
    }

    println!(
        "{} Request {} fulfilled by {}",
        style("✓").green(),
        request_id,
        factory
    );
    Ok(())
}
