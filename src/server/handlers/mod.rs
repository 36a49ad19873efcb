//! HTTP request handlers for the web server.

mod api;
mod factory;

pub use api::{api_factories, api_queue, api_requests, health};
pub use factory::{fulfill, poll};
