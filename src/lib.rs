//! Smoke-test runner for a library book-issuing HTTP API.
//!
//! A run registers a member, logs in, lists books, issues up to
//! `max_issues` available books, checks the member's issued list, and
//! returns books according to the configured [`config::ReturnPolicy`].

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod library;
pub mod runner;
pub mod testing;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use runner::Runner;
pub use testing::RunReport;
