//! Plugin and browser version constraints.
//!
//! Plugin versions are small integer keys into the `plugin_versions` table,
//! numbered per plugin. Key `1` is "disabled" and key `2` is "enabled"; any
//! larger key names a specific installed version.

use serde::{Deserialize, Serialize};

/// Version key meaning "disabled".
pub const DISABLED: i32 = 1;

/// Version key meaning "enabled, any version".
pub const ENABLED: i32 = 2;

/// Browser plugin a request may constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plugin {
    Javascript,
    Java,
    Flash,
}

impl Plugin {
    pub const ALL: [Plugin; 3] = [Plugin::Javascript, Plugin::Java, Plugin::Flash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Java => "java",
            Self::Flash => "flash",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "javascript" | "js" => Some(Self::Javascript),
            "java" => Some(Self::Java),
            "flash" => Some(Self::Flash),
            _ => None,
        }
    }
}

/// How a version constraint is compared against an installed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionMatch {
    /// The installed version must equal the constraint.
    Exact,
    /// A constraint of [`ENABLED`] accepts any installed version `>= ENABLED`.
    AllowEnabled,
}

/// Check an installed version against an optional constraint.
///
/// `None` accepts anything.
pub fn version_matches(constraint: Option<i32>, installed: i32, mode: VersionMatch) -> bool {
    match constraint {
        None => true,
        Some(ENABLED) if mode == VersionMatch::AllowEnabled => installed >= ENABLED,
        Some(wanted) => installed == wanted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_matches_everything() {
        assert!(version_matches(None, DISABLED, VersionMatch::Exact));
        assert!(version_matches(None, 17, VersionMatch::AllowEnabled));
    }

    #[test]
    fn enabled_sentinel_accepts_newer_versions() {
        assert!(version_matches(Some(ENABLED), 3, VersionMatch::AllowEnabled));
        assert!(version_matches(Some(ENABLED), ENABLED, VersionMatch::AllowEnabled));
        assert!(!version_matches(Some(ENABLED), DISABLED, VersionMatch::AllowEnabled));
    }

    #[test]
    fn exact_mode_ignores_sentinel() {
        assert!(!version_matches(Some(ENABLED), 3, VersionMatch::Exact));
        assert!(version_matches(Some(ENABLED), ENABLED, VersionMatch::Exact));
    }

    #[test]
    fn specific_version_requires_equality() {
        assert!(version_matches(Some(5), 5, VersionMatch::AllowEnabled));
        assert!(!version_matches(Some(5), 6, VersionMatch::AllowEnabled));
    }

    #[test]
    fn plugin_names_round_trip() {
        for plugin in Plugin::ALL {
            assert_eq!(Plugin::from_str(plugin.as_str()), Some(plugin));
        }
        assert_eq!(Plugin::from_str("js"), Some(Plugin::Javascript));
        assert_eq!(Plugin::from_str("silverlight"), None);
    }
}
