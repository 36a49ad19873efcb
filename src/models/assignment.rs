//! The work assignment returned to a polling factory.

use serde::{Deserialize, Serialize};

/// A fully resolved screenshot job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Request id, used again when uploading.
    pub request: i32,
    /// Browser name.
    pub browser: String,
    /// Browser version string.
    pub version: String,
    pub major: i32,
    pub minor: i32,
    /// Browser command to run, empty for default.
    pub command: String,
    pub width: i32,
    pub height: i32,
    pub bpp: i32,
    /// Requested plugin versions, empty when unconstrained.
    pub javascript: String,
    pub java: String,
    pub flash: String,
}
