//! Domain models for shotqueue.

mod assignment;
mod factory;
mod priority;
mod request;
pub mod version;

pub use assignment::Assignment;
pub use factory::{Browser, ColorDepth, Factory, Inventory, NewBrowser, NewFactory, ScreenSize};
pub use priority::DomainPriority;
pub use request::{
    BrowserSpec, Claim, ClaimedRequest, NewRequestGroup, QueueStats, Request, RequestGroup,
    RequestStatus,
};
pub use version::{version_matches, Plugin, VersionMatch};
