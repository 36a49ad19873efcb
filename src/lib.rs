//! shotqueue - screenshot request queue and factory coordination.
//!
//! Clients submit websites to capture with a set of browsers. Screenshot
//! factories poll the queue, claim one matching request at a time under a
//! soft lease, and report back when the screenshot is uploaded.

#![allow(clippy::should_implement_trait)]

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod matching;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod work_queue;
