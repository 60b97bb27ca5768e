//! Transaction engine HTTP client.
//!
//! The engine queues contract calls and executes them asynchronously. A mint
//! returns a queue id; the status endpoint reports progress for that id.

use crate::config::ServerConfig;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const BACKEND_WALLET_HEADER: &str = "x-backend-wallet-address";

/// Body of an ERC20 `mint-to` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub to_address: String,
    pub amount: String,
}

/// Handle for a queued engine transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTransaction {
    pub queue_id: String,
}

/// Engine-reported state of a queued transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TransactionStatus {
    Queued,
    Sent,
    Mined,
    Errored,
    Cancelled,
    Other(String),
}

impl TransactionStatus {
    pub fn is_mined(&self) -> bool {
        matches!(self, TransactionStatus::Mined)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Queued => "queued",
            TransactionStatus::Sent => "sent",
            TransactionStatus::Mined => "mined",
            TransactionStatus::Errored => "errored",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Other(s) => s,
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => TransactionStatus::Queued,
            "sent" => TransactionStatus::Sent,
            "mined" => TransactionStatus::Mined,
            "errored" => TransactionStatus::Errored,
            "cancelled" => TransactionStatus::Cancelled,
            _ => TransactionStatus::Other(s),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Engine REST envelopes ---

#[derive(Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuedResult {
    queue_id: String,
}

#[derive(Deserialize)]
struct StatusResult {
    status: TransactionStatus,
}

/// Append `segments` to `ENGINE_URL`, percent-encoding each one so a
/// caller-supplied id can never add path segments or a query.
fn engine_url(creds: &ServerConfig, segments: &[&str]) -> Result<reqwest::Url, String> {
    let mut url = reqwest::Url::parse(&creds.engine_url)
        .map_err(|e| format!("invalid ENGINE_URL: {e}"))?;
    if segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..") {
        return Err("empty or relative path segment".into());
    }
    url.path_segments_mut()
        .map_err(|_| "ENGINE_URL cannot carry a path".to_string())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Client for the engine REST API.
pub struct EngineClient {
    http: reqwest::Client,
}

impl EngineClient {
    pub fn new(request_timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self { http })
    }

    /// Queue an ERC20 mint. Non-2xx responses surface the engine's body text.
    pub async fn mint_to(
        &self,
        creds: &ServerConfig,
        chain_id: u64,
        token_address: &str,
        request: &MintRequest,
    ) -> Result<QueuedTransaction, Error> {
        let chain = chain_id.to_string();
        let url = engine_url(
            creds,
            &["contract", chain.as_str(), token_address, "erc20", "mint-to"],
        )
        .map_err(Error::Submission)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&creds.secret_key)
            .header(BACKEND_WALLET_HEADER, &creds.backend_wallet_address)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("engine unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("HTTP {status} (body unreadable: {e})"));
            return Err(Error::Submission(text));
        }

        let body: Envelope<QueuedResult> = response
            .json()
            .await
            .map_err(|e| Error::Submission(format!("malformed engine response: {e}")))?;

        debug!(queue_id = %body.result.queue_id, to = %request.to_address, "Mint queued");
        Ok(QueuedTransaction {
            queue_id: body.result.queue_id,
        })
    }

    /// Read the current status of a queued transaction.
    pub async fn transaction_status(
        &self,
        creds: &ServerConfig,
        queue_id: &str,
    ) -> Result<TransactionStatus, Error> {
        let url =
            engine_url(creds, &["transaction", "status", queue_id]).map_err(Error::Relay)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(&creds.secret_key)
            .send()
            .await
            .map_err(|e| Error::Relay(format!("status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Relay(format!("status HTTP {status}")));
        }

        let body: Envelope<StatusResult> = response
            .json()
            .await
            .map_err(|e| Error::Relay(format!("status parse error: {e}")))?;
        Ok(body.result.status)
    }
}
