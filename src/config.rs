//! Configuration management for shotqueue using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::util::is_postgres_url;
use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "shotqueue.db";

/// Default soft lease on a claimed request, in seconds.
pub const DEFAULT_LEASE_SECONDS: u64 = 300;

/// Default lifetime of a submitted request group, in minutes.
pub const DEFAULT_EXPIRE_MINUTES: u64 = 30;

pub const DEFAULT_PORT: u16 = 3040;

/// Upper bound for configured lease and expiry durations (about 100 years).
pub const MAX_DURATION_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Seconds before an unfulfilled claim goes stale.
    pub lease_seconds: u64,
    /// Release the claim when a polled request has no matching browser.
    pub release_on_browser_mismatch: bool,
    /// Lifetime of newly submitted request groups, in minutes.
    pub default_expire_minutes: u64,
    /// Priority for submissions no domain priority applies to.
    pub default_priority: i32,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/.local/share/shotqueue, falling back to home then CWD
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shotqueue");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            lease_seconds: DEFAULT_LEASE_SECONDS,
            release_on_browser_mismatch: false,
            default_expire_minutes: DEFAULT_EXPIRE_MINUTES,
            default_priority: 0,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Full path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn is_postgres(&self) -> bool {
        self.database_url
            .as_ref()
            .is_some_and(|url| is_postgres_url(url))
    }

    /// Soft lease as a duration, capped at [`MAX_DURATION_SECONDS`].
    pub fn lease(&self) -> chrono::Duration {
        capped_seconds(self.lease_seconds)
    }

    pub fn default_expire(&self) -> chrono::Duration {
        capped_seconds(self.default_expire_minutes.saturating_mul(60))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create the data directory when using SQLite.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if self.is_postgres() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Create a database context for the configured database.
    pub fn create_db_context(&self) -> Result<DbContext, diesel::result::Error> {
        DbContext::from_url(&self.database_url())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_on_browser_mismatch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_expire_minutes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for discovery of `shotqueue.*` files.
    pub async fn load() -> Self {
        match prefer::load("shotqueue").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// The config file's directory, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// `~` is expanded; relative paths are joined onto `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(lease) = self.lease_seconds {
            settings.lease_seconds = lease;
        }
        if let Some(release) = self.release_on_browser_mismatch {
            settings.release_on_browser_mismatch = release;
        }
        if let Some(minutes) = self.default_expire_minutes {
            settings.default_expire_minutes = minutes;
        }
        if let Some(priority) = self.default_priority {
            settings.default_priority = priority;
        }
        if let Some(ref host) = self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (`--target`).
    pub target: Option<PathBuf>,
}

fn capped_seconds(seconds: u64) -> chrono::Duration {
    let seconds = i64::try_from(seconds)
        .map_or(MAX_DURATION_SECONDS, |s| s.min(MAX_DURATION_SECONDS));
    chrono::Duration::seconds(seconds)
}

/// Split a `--target` path into data directory and optional database filename.
fn resolve_target(path: &Path) -> (PathBuf, Option<String>) {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let is_db_file = path
        .extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
        || path.is_file();

    if is_db_file {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToString::to_string);
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        (dir, filename)
    } else {
        (path, None)
    }
}

/// Load settings with explicit options.
///
/// Precedence, lowest first: defaults, config file, `--target`,
/// environment (`DATABASE_URL`, `SHOTQUEUE_LEASE_SECONDS`).
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        }),
        None => Config::load().await,
    };

    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(ref target) = options.target {
        let (dir, filename) = resolve_target(target);
        settings.data_dir = dir;
        if let Some(filename) = filename {
            settings.database_filename = filename;
        }
    }

    if let Some(database_url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using DATABASE_URL from environment");
        settings.database_url = Some(database_url);
    }

    if let Ok(raw) = std::env::var("SHOTQUEUE_LEASE_SECONDS") {
        match raw.parse() {
            Ok(lease) => settings.lease_seconds = lease,
            Err(_) => tracing::warn!("Ignoring invalid SHOTQUEUE_LEASE_SECONDS: {}", raw),
        }
    }

    (settings, config)
}
