//! # Library service
//!
//! Wire models and typed calls for the member-facing endpoints under `/api`.

pub mod api;
pub mod models;

pub use api::{LibraryApi, Outcome, Rejection};
pub use models::{BookRef, BookSummary, IssueReceipt, IssuedBook, IssuedRecord, LoginResponse};
