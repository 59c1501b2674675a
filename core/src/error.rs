//! Error types for the reminders client.
//!
//! # Design
//! Every failure the client can hit is a variant here, and every operation
//! returns it as a value. `NotFound` is separate from `Http` because the
//! service answers a lookup for a missing id with `200 {}`, which is a
//! different situation from a rejected request. `MalformedReminder` is
//! produced per record, so a single odd record in a list response never
//! aborts the whole batch.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by `RemindersClient`, the codec and the auth layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable credential and no way to obtain one interactively.
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    /// The OAuth consent, exchange or refresh step failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service answered with a status other than 200.
    #[error("{operation} failed with HTTP {status}: {body}")]
    Http {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("transport error: {0}")]
    Transport(String),

    /// A get request matched no reminder.
    #[error("reminder not found")]
    NotFound,

    /// A reminder record had a shape the codec does not recognize.
    #[error("unrecognized reminder format: {0}")]
    MalformedReminder(String),

    /// A free-text time expression could not be turned into a date-time.
    #[error("Unrecognizable time text: {0:?}")]
    UnparsableTime(String),

    /// A reminder was constructed with missing required data.
    #[error("invalid reminder: {0}")]
    InvalidReminder(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body was not the JSON document expected.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
