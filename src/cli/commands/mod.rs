//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod factory;
mod init;
mod poll;
mod priority;
mod queue;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::helpers::parse_plugin_version;
use crate::config::{load_settings_with_options, LoadOptions};
use crate::models::{BrowserSpec, ScreenSize};

#[derive(Parser)]
#[command(name = "shotqueue")]
#[command(about = "Screenshot request queue and factory coordination server")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing shotqueue.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Start the HTTP API server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config)
        bind: Option<String>,
    },

    /// Manage screenshot factories
    Factory {
        #[command(subcommand)]
        command: FactoryCommands,
    },

    /// Queue a screenshot request group
    Submit {
        /// Website URL to capture
        url: String,
        /// Browser selection: NAME[:MAJOR[.MINOR]][@PLATFORM] (repeatable)
        #[arg(short, long = "browser", required = true)]
        browsers: Vec<BrowserSpec>,
        /// Required screen size, WIDTHxHEIGHT
        #[arg(long)]
        size: Option<ScreenSize>,
        /// Required width only
        #[arg(long, conflicts_with = "size")]
        width: Option<i32>,
        /// Required height only
        #[arg(long, conflicts_with = "size")]
        height: Option<i32>,
        /// Required color depth in bits per pixel
        #[arg(long)]
        bpp: Option<i32>,
        /// JavaScript: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version)]
        javascript: Option<i32>,
        /// Java: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version)]
        java: Option<i32>,
        /// Flash: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version)]
        flash: Option<i32>,
        /// Minutes until the request expires (default from config)
        #[arg(short, long)]
        expire: Option<i64>,
    },

    /// List recent requests
    Requests {
        /// Number of requests to show
        #[arg(short, long, default_value = "100")]
        limit: i64,
    },

    /// Poll for work as a factory
    Poll {
        /// Server URL; polls the local database when omitted
        #[arg(short, long)]
        server: Option<String>,
        /// Factory name (default: lowercase host name)
        #[arg(short, long)]
        factory: Option<String>,
        /// Factory credential
        #[arg(long, env = "SHOTQUEUE_CREDENTIAL", default_value = "")]
        credential: String,
    },

    /// Mark a claimed request as fulfilled
    Fulfill {
        /// Request ID
        request_id: i32,
        /// Server URL; uses the local database when omitted
        #[arg(short, long)]
        server: Option<String>,
        /// Factory name (default: lowercase host name)
        #[arg(short, long)]
        factory: Option<String>,
        /// Factory credential
        #[arg(long, env = "SHOTQUEUE_CREDENTIAL", default_value = "")]
        credential: String,
    },

    /// Release stale claims and purge expired requests
    Cleanup,

    /// Manage domain priorities
    Priority {
        #[command(subcommand)]
        command: PriorityCommands,
    },

    /// Show queue statistics
    Stats,
}

#[derive(Subcommand)]
enum FactoryCommands {
    /// Register a new factory
    Add {
        /// Factory name
        name: String,
        /// Operating system family (linux, windows, mac, ...)
        #[arg(long, default_value = "linux")]
        os: String,
        /// Password the factory authenticates with
        #[arg(long, env = "SHOTQUEUE_FACTORY_PASSWORD")]
        password: Option<String>,
    },
    /// Register supported screen sizes
    Screen {
        /// Factory name
        name: String,
        /// Sizes as WIDTHxHEIGHT, in preference order
        #[arg(required = true)]
        sizes: Vec<ScreenSize>,
    },
    /// Register supported color depths
    Depth {
        /// Factory name
        name: String,
        /// Bits per pixel
        #[arg(required = true)]
        depths: Vec<i32>,
    },
    /// Register an installed browser
    Browser {
        /// Factory name
        name: String,
        /// Browser family, e.g. Firefox
        browser: String,
        /// Full version string, e.g. 2.0.0.4
        version: String,
        /// Command line used to launch the browser
        #[arg(long, default_value = "")]
        command: String,
        /// JavaScript: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version, default_value = "enabled")]
        javascript: i32,
        /// Java: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version, default_value = "disabled")]
        java: i32,
        /// Flash: disabled, enabled or a version key
        #[arg(long, value_parser = parse_plugin_version, default_value = "disabled")]
        flash: i32,
    },
    /// Enable or disable a registered browser
    Toggle {
        /// Browser ID
        browser_id: i32,
        /// Disable instead of enable
        #[arg(long)]
        off: bool,
    },
    /// List factories and their inventory
    List,
}

#[derive(Subcommand)]
enum PriorityCommands {
    /// Boost requests for a domain and its subdomains
    Set {
        /// Domain, e.g. example.com
        domain: String,
        /// Priority (higher runs first)
        priority: i32,
        /// Days until the boost expires
        #[arg(short, long, default_value = "30")]
        days: i64,
    },
    /// List active domain priorities
    List,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
        target: cli.target,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Factory { command } => match command {
            FactoryCommands::Add { name, os, password } => {
                factory::cmd_factory_add(&settings, &name, &os, password.as_deref()).await
            }
            FactoryCommands::Screen { name, sizes } => {
                factory::cmd_factory_screen(&settings, &name, &sizes).await
            }
            FactoryCommands::Depth { name, depths } => {
                factory::cmd_factory_depth(&settings, &name, &depths).await
            }
            FactoryCommands::Browser {
                name,
                browser,
                version,
                command,
                javascript,
                java,
                flash,
            } => {
                factory::cmd_factory_browser(
                    &settings,
                    &name,
                    factory::BrowserArgs {
                        browser,
                        version,
                        command,
                        javascript,
                        java,
                        flash,
                    },
                )
                .await
            }
            FactoryCommands::Toggle { browser_id, off } => {
                factory::cmd_factory_toggle(&settings, browser_id, !off).await
            }
            FactoryCommands::List => factory::cmd_factory_list(&settings).await,
        },
        Commands::Submit {
            url,
            browsers,
            size,
            width,
            height,
            bpp,
            javascript,
            java,
            flash,
            expire,
        } => {
            let args = queue::SubmitArgs {
                url,
                browsers,
                width: size.map(|s| s.width).or(width),
                height: size.map(|s| s.height).or(height),
                bpp,
                javascript,
                java,
                flash,
                expire_minutes: expire,
            };
            queue::cmd_submit(&settings, args).await
        }
        Commands::Requests { limit } => queue::cmd_requests(&settings, limit).await,
        Commands::Poll {
            server,
            factory,
            credential,
        } => poll::cmd_poll(&settings, server.as_deref(), factory, &credential).await,
        Commands::Fulfill {
            request_id,
            server,
            factory,
            credential,
        } => {
            poll::cmd_fulfill(&settings, request_id, server.as_deref(), factory, &credential)
                .await
        }
        Commands::Cleanup => queue::cmd_cleanup(&settings).await,
        Commands::Priority { command } => match command {
            PriorityCommands::Set {
                domain,
                priority,
                days,
            } => priority::cmd_priority_set(&settings, &domain, priority, days).await,
            PriorityCommands::List => priority::cmd_priority_list(&settings).await,
        },
        Commands::Stats => queue::cmd_stats(&settings).await,
    }
}
