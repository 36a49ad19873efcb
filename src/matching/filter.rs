//! Capability filter: which requests a factory is able to serve.
//!
//! Built once per poll from the factory's registered inventory and evaluated
//! against typed request data. Each constraint on a request is either unset
//! (any factory qualifies) or must be satisfied by at least one registered
//! value of the factory.

use std::collections::BTreeSet;

use crate::models::{
    version_matches, Inventory, Plugin, Request, RequestGroup, VersionMatch,
};

/// Distinct browser family and version the factory has installed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BrowserCapability {
    pub browser_group: String,
    pub major: i32,
    pub minor: i32,
}

/// Predicate over requests, derived from one factory's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityFilter {
    operating_system: String,
    browsers: BTreeSet<BrowserCapability>,
    widths: BTreeSet<i32>,
    color_depths: BTreeSet<i32>,
    javascript: BTreeSet<i32>,
    java: BTreeSet<i32>,
    flash: BTreeSet<i32>,
}

impl CapabilityFilter {
    /// Build the filter for a factory. Inactive browsers are ignored.
    pub fn for_inventory(inventory: &Inventory) -> Self {
        let mut filter = Self {
            operating_system: inventory.operating_system.to_lowercase(),
            browsers: BTreeSet::new(),
            widths: inventory.screen_sizes.iter().map(|s| s.width).collect(),
            color_depths: inventory
                .color_depths
                .iter()
                .map(|d| d.bits_per_pixel)
                .collect(),
            javascript: BTreeSet::new(),
            java: BTreeSet::new(),
            flash: BTreeSet::new(),
        };

        for browser in inventory.active_browsers() {
            filter.browsers.insert(BrowserCapability {
                browser_group: browser.browser_group.clone(),
                major: browser.major,
                minor: browser.minor,
            });
            filter.javascript.insert(browser.javascript);
            filter.java.insert(browser.java);
            filter.flash.insert(browser.flash);
        }

        tracing::debug!(
            "Capability filter for factory {}: os={}, {} browsers, widths={:?}, depths={:?}",
            inventory.factory_id,
            filter.operating_system,
            filter.browsers.len(),
            filter.widths,
            filter.color_depths
        );

        filter
    }

    /// Browser families this filter can ever match. Used to narrow the
    /// candidate query before the full predicate runs.
    pub fn browser_groups(&self) -> Vec<String> {
        let groups: BTreeSet<&str> = self
            .browsers
            .iter()
            .map(|b| b.browser_group.as_str())
            .collect();
        groups.into_iter().map(ToString::to_string).collect()
    }

    /// Whether the factory can serve `request` from `group`.
    pub fn matches(&self, request: &Request, group: &RequestGroup) -> bool {
        self.matches_platform(request)
            && self.matches_browser(request)
            && Self::matches_any(group.width, &self.widths)
            && Self::matches_any(group.bits_per_pixel, &self.color_depths)
            && Plugin::ALL
                .iter()
                .all(|&plugin| self.matches_plugin(plugin, group.plugin(plugin)))
    }

    fn matches_platform(&self, request: &Request) -> bool {
        request
            .platform
            .as_deref()
            .map_or(true, |os| os.eq_ignore_ascii_case(&self.operating_system))
    }

    fn matches_browser(&self, request: &Request) -> bool {
        self.browsers.iter().any(|b| {
            b.browser_group == request.browser_group
                && version_matches(request.major, b.major, VersionMatch::Exact)
                && version_matches(request.minor, b.minor, VersionMatch::Exact)
        })
    }

    fn matches_plugin(&self, plugin: Plugin, constraint: Option<i32>) -> bool {
        let installed = match plugin {
            Plugin::Javascript => &self.javascript,
            Plugin::Java => &self.java,
            Plugin::Flash => &self.flash,
        };
        constraint.is_none()
            || installed
                .iter()
                .any(|&v| version_matches(constraint, v, VersionMatch::AllowEnabled))
    }

    fn matches_any(constraint: Option<i32>, registered: &BTreeSet<i32>) -> bool {
        constraint.map_or(true, |wanted| registered.contains(&wanted))
    }
}
