//! Web server command.

use console::style;

use super::super::helpers::parse_bind_address;
use crate::config::Settings;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    if let Some(bind) = bind {
        let (host, port) = parse_bind_address(bind, settings.port);
        settings.host = host;
        settings.port = port;
    }
    settings.ensure_directories()?;

    println!(
        "{} Starting shotqueue server at http://{} (lease {}s)",
        style("→").cyan(),
        settings.bind_addr(),
        settings.lease_seconds
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(&settings).await
}
