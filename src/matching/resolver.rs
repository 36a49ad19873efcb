//! Resolve a claimed request to concrete browser, screen and color depth.

use crate::models::{
    version_matches, Browser, ColorDepth, Inventory, Plugin, Request, RequestGroup, ScreenSize,
    VersionMatch,
};

/// Widths tried in order when several screen sizes qualify.
pub const POPULAR_WIDTHS: [i32; 5] = [1024, 800, 1152, 1280, 640];

/// Used when the factory registered no qualifying screen size.
pub const DEFAULT_SCREEN_SIZE: ScreenSize = ScreenSize {
    width: 1024,
    height: 768,
};

/// Used when the factory registered no qualifying color depth.
pub const DEFAULT_COLOR_DEPTH: ColorDepth = ColorDepth { bits_per_pixel: 24 };

/// Pick the browser that will render `request`.
///
/// Browser family and major/minor numbers must match exactly; plugin
/// constraints accept the "enabled" sentinel. Returns the first qualifying
/// active browser in registration order, or `None`.
pub fn resolve_browser<'a>(
    inventory: &'a Inventory,
    request: &Request,
    group: &RequestGroup,
) -> Option<&'a Browser> {
    inventory.active_browsers().find(|browser| {
        browser.browser_group == request.browser_group
            && version_matches(request.major, browser.major, VersionMatch::Exact)
            && version_matches(request.minor, browser.minor, VersionMatch::Exact)
            && Plugin::ALL.iter().all(|&plugin| {
                version_matches(
                    group.plugin(plugin),
                    browser.plugin(plugin),
                    VersionMatch::AllowEnabled,
                )
            })
    })
}

/// Pick the screen size. Never fails.
pub fn resolve_screen_size(inventory: &Inventory, group: &RequestGroup) -> ScreenSize {
    let candidates: Vec<ScreenSize> = inventory
        .screen_sizes
        .iter()
        .filter(|s| group.width.map_or(true, |w| s.width == w))
        .filter(|s| group.height.map_or(true, |h| s.height == h))
        .copied()
        .collect();

    // Factory configuration incomplete
    let Some(&first) = candidates.first() else {
        return DEFAULT_SCREEN_SIZE;
    };

    if candidates.len() > 1 {
        for popular in POPULAR_WIDTHS {
            if let Some(size) = candidates.iter().find(|s| s.width == popular) {
                return *size;
            }
        }
    }

    first
}

/// Pick the color depth: the deepest qualifying one. Never fails.
pub fn resolve_color_depth(inventory: &Inventory, group: &RequestGroup) -> ColorDepth {
    inventory
        .color_depths
        .iter()
        .filter(|d| group.bits_per_pixel.map_or(true, |bpp| d.bits_per_pixel == bpp))
        .max_by_key(|d| d.bits_per_pixel)
        .copied()
        .unwrap_or(DEFAULT_COLOR_DEPTH)
}
