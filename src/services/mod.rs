//! Service layer for shotqueue business logic.
//!
//! Services are shared by the CLI and the HTTP server.

pub mod poll;
pub mod submit;

pub use poll::{PollError, PollService};
pub use submit::{SubmitError, SubmitService};
