//! Work queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkQueueError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    /// Nothing claimable for this factory. Expected during normal polling.
    #[error("{0}")]
    NotFound(String),
    /// The caller no longer holds a live claim on the request.
    #[error("Claim on request {0} is not held or has expired")]
    ClaimInvalid(i32),
    #[error("{0}")]
    Other(String),
}
