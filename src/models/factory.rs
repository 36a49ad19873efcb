//! Screenshot factories and their registered inventory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::version::{Plugin, DISABLED};

/// A remote machine that captures screenshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: i32,
    pub name: String,
    /// Operating system family, e.g. `linux`, `windows`, `mac`.
    pub operating_system: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub ip: Option<String>,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_upload: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Registration data for a new factory.
#[derive(Debug, Clone)]
pub struct NewFactory {
    pub name: String,
    pub operating_system: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl std::fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for ScreenSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width '{}'", w))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height '{}'", h))?;
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorDepth {
    pub bits_per_pixel: i32,
}

/// A browser installation on a factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Browser {
    pub id: i32,
    /// Browser family name, e.g. `Firefox`.
    pub browser_group: String,
    /// Full version string, e.g. `2.0.0.4`.
    pub version: String,
    pub major: i32,
    pub minor: i32,
    /// Command line used to launch it, empty for the factory default.
    pub command: String,
    pub javascript: i32,
    pub java: i32,
    pub flash: i32,
    pub active: bool,
}

impl Browser {
    /// Installed version key for a plugin.
    pub fn plugin(&self, plugin: Plugin) -> i32 {
        match plugin {
            Plugin::Javascript => self.javascript,
            Plugin::Java => self.java,
            Plugin::Flash => self.flash,
        }
    }
}

/// Registration data for a browser installation.
#[derive(Debug, Clone)]
pub struct NewBrowser {
    pub browser_group: String,
    pub version: String,
    pub major: i32,
    pub minor: i32,
    pub command: String,
    pub javascript: i32,
    pub java: i32,
    pub flash: i32,
}

impl NewBrowser {
    /// Browser with all plugins disabled.
    pub fn new(browser_group: impl Into<String>, version: impl Into<String>, major: i32, minor: i32) -> Self {
        Self {
            browser_group: browser_group.into(),
            version: version.into(),
            major,
            minor,
            command: String::new(),
            javascript: DISABLED,
            java: DISABLED,
            flash: DISABLED,
        }
    }
}

/// Everything the matcher needs to know about one factory.
///
/// Collections are kept in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub factory_id: i32,
    pub operating_system: String,
    pub screen_sizes: Vec<ScreenSize>,
    pub color_depths: Vec<ColorDepth>,
    pub browsers: Vec<Browser>,
}

impl Inventory {
    pub fn active_browsers(&self) -> impl Iterator<Item = &Browser> {
        self.browsers.iter().filter(|b| b.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_screen_size() {
        let size: ScreenSize = "1024x768".parse().unwrap();
        assert_eq!(size, ScreenSize { width: 1024, height: 768 });
        assert_eq!(size.to_string(), "1024x768");
        assert!("1024".parse::<ScreenSize>().is_err());
        assert!("axb".parse::<ScreenSize>().is_err());
    }
}
