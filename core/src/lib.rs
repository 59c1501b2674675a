//! Client core for the reminders service.
//!
//! # Overview
//! Creates, fetches, deletes and lists reminders through a remote service
//! whose JSON bodies are keyed by protobuf field numbers. `wire` translates
//! between that format and the `Reminder` model; `client` sends the requests
//! through an authenticated `Transport` obtained from a `CredentialProvider`.
//!
//! # Design
//! - Request building and response parsing are pure and testable without a
//!   network; only `Transport::execute` does I/O.
//! - Every operation is one blocking POST, success means HTTP 200, and
//!   nothing is retried.
//! - Failures are `ApiError` values. The presentation layer decides how to
//!   show them.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod remind;
pub mod reminder;
pub mod time;
pub mod wire;

pub use auth::{CredentialProvider, OAuthProvider, StaticTokenProvider};
pub use client::{ListEntry, RemindersClient};
pub use config::{Operation, RemindersConfig};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use remind::{generate_id, remind};
pub use reminder::Reminder;
pub use time::parse_time_expression;
