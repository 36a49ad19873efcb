//! Matching factories to requests.
//!
//! - `filter`: which requests a factory may claim
//! - `resolver`: which browser, screen size and color depth to use once claimed

pub mod filter;
pub mod resolver;

pub use filter::{BrowserCapability, CapabilityFilter};
pub use resolver::{resolve_browser, resolve_color_depth, resolve_screen_size};
