//! Error types for the relayer.

use crate::response::ClaimResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

/// Relayer error type.
#[derive(Debug)]
pub enum Error {
    /// Required settings are missing. Raised before any engine call.
    Config(String),
    /// Client sent a body we cannot act on.
    InvalidRequest(String),
    /// Engine rejected or failed the mint submission. Holds the engine's
    /// diagnostic text.
    Submission(String),
    /// Engine call other than submission failed.
    Relay(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::Submission(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Relay(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Error::Config(_) => "Server misconfigured",
            Error::InvalidRequest(_) => "Invalid request body",
            Error::Submission(_) => "Failed to initiate transaction",
            Error::Relay(_) => "Failed to fetch transaction status",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Error::Config(msg)
            | Error::InvalidRequest(msg)
            | Error::Submission(msg)
            | Error::Relay(msg) => msg,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Error::Submission(msg) => write!(f, "mint submission failed: {msg}"),
            Error::Relay(msg) => write!(f, "engine error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = ClaimResponse::err(self.message(), self.detail());
        (self.status_code(), Json(body)).into_response()
    }
}
