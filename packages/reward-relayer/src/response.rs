//! Response types for the relayer API.

use serde::Serialize;

pub const MSG_MINED: &str = "Transaction mined successfully!";
pub const MSG_TIMED_OUT: &str = "Transaction not mined within the timeout period.";
pub const MSG_CANCELLED: &str = "Polling cancelled before confirmation.";

/// Body returned by `/claimToken` and by every error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClaimResponse {
    pub fn queued(message: impl Into<String>, queue_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            queue_id: Some(queue_id.into()),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            queue_id: None,
            error: Some(error.into()),
        }
    }
}

/// Response from `GET /transaction/{queue_id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStatusResponse {
    pub queue_id: String,
    pub status: String,
    pub mined: bool,
}

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain_id: u64,
    pub token_address: String,
    pub uptime_secs: u64,
    pub requests: u64,
    pub in_flight_polls: u64,
}
