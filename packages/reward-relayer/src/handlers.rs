//! HTTP request handlers.

use crate::engine::MintRequest;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::poller::{poll_until_mined, EngineStatusChecker, PollOutcome};
use crate::response::{
    ClaimResponse, HealthResponse, TxStatusResponse, MSG_CANCELLED, MSG_MINED, MSG_TIMED_OUT,
};
use crate::state::AppState;
use crate::Error;
use axum::body::Bytes;
use axum::extract::{FromRequest, Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Inbound body of `POST /claimToken`.
#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

/// Liveness plus whether engine credentials are present.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = if state.server_config().is_ok() {
        "ok"
    } else {
        "misconfigured"
    };

    Json(HealthResponse {
        status,
        chain_id: state.config.chain_id,
        token_address: state.config.token_address.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
        in_flight_polls: state.in_flight_polls.load(Ordering::Relaxed),
    })
}

/// Prometheus metrics in text exposition format.
pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        METRICS.render(),
    )
}

/// Mint reward tokens to the caller's address and wait for the engine to
/// report the transaction mined.
pub async fn claim_token(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let start = Instant::now();
    METRICS.claims_total.fetch_add(1, Ordering::Relaxed);
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let req_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let Ok(_slot) = state.claim_slots.try_acquire() else {
        METRICS.claims_busy.fetch_add(1, Ordering::Relaxed);
        warn!(req_id = %req_id, "Claim slots exhausted");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ClaimResponse::err(
                "Relayer busy, try again",
                "too many claims in flight",
            )),
        )
            .into_response();
    };

    let response = match run_claim(&state, &req_id, request).await {
        Ok((status, body)) => (status, Json(body)).into_response(),
        Err(e) => e.into_response(),
    };
    METRICS.record_claim_duration(start);
    response
}

async fn run_claim(
    state: &AppState,
    req_id: &str,
    request: Request,
) -> Result<(StatusCode, ClaimResponse), Error> {
    // Credentials first: a misconfigured server must not touch the engine.
    let creds = state.server_config().inspect_err(|e| {
        METRICS.claims_config_error.fetch_add(1, Ordering::Relaxed);
        error!(req_id, error = %e, "Refusing claim");
    })?;

    let claim = parse_claim(request).await.inspect_err(|e| {
        METRICS.claims_invalid.fetch_add(1, Ordering::Relaxed);
        warn!(req_id, error = %e, "Invalid claim body");
    })?;

    let mint = MintRequest {
        to_address: claim.address,
        amount: state.config.mint_amount.clone(),
    };
    info!(req_id, to = %mint.to_address, amount = %mint.amount, "Submitting mint");

    let queued = state
        .engine
        .mint_to(
            &creds,
            state.config.chain_id,
            &state.config.token_address,
            &mint,
        )
        .await
        .inspect_err(|e| {
            METRICS.claims_submit_error.fetch_add(1, Ordering::Relaxed);
            error!(req_id, error = %e, "Mint submission failed");
        })?;

    let queue_id = queued.queue_id;
    info!(req_id, queue_id = %queue_id, "Mint queued, polling for confirmation");

    // Dropping this request (client gone) cancels the poll.
    let cancel = state.shutdown.child_token();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let _in_flight = InFlightPoll::enter(&state.in_flight_polls);

    let checker = EngineStatusChecker::new(&state.engine, &creds);
    let outcome = poll_until_mined(&checker, &queue_id, state.poll_policy(), &cancel).await;

    Ok(match outcome {
        PollOutcome::Mined { attempts } => {
            METRICS.claims_mined.fetch_add(1, Ordering::Relaxed);
            info!(req_id, queue_id = %queue_id, attempts, "Transaction mined");
            (StatusCode::OK, ClaimResponse::queued(MSG_MINED, queue_id))
        }
        PollOutcome::TimedOut => {
            METRICS.claims_timed_out.fetch_add(1, Ordering::Relaxed);
            warn!(req_id, queue_id = %queue_id, "Transaction not mined within poll budget");
            (
                StatusCode::REQUEST_TIMEOUT,
                ClaimResponse::queued(MSG_TIMED_OUT, queue_id),
            )
        }
        PollOutcome::Cancelled => {
            METRICS.claims_cancelled.fetch_add(1, Ordering::Relaxed);
            warn!(req_id, queue_id = %queue_id, "Polling cancelled");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ClaimResponse::queued(MSG_CANCELLED, queue_id),
            )
        }
    })
}

async fn parse_claim(request: Request) -> Result<ClaimRequest, Error> {
    let bytes = Bytes::from_request(request, &())
        .await
        .map_err(|e| Error::InvalidRequest(format!("unreadable body: {e}")))?;

    let claim: ClaimRequest = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidRequest(format!("expected {{\"address\": string}}: {e}")))?;

    if claim.address.trim().is_empty() {
        return Err(Error::InvalidRequest("address must not be empty".into()));
    }
    Ok(claim)
}

/// Keeps the in-flight gauges accurate even when the request future is dropped.
struct InFlightPoll<'a> {
    local: &'a AtomicU64,
}

impl<'a> InFlightPoll<'a> {
    fn enter(local: &'a AtomicU64) -> Self {
        METRICS.in_flight_polls.fetch_add(1, Ordering::Relaxed);
        local.fetch_add(1, Ordering::Relaxed);
        Self { local }
    }
}

impl Drop for InFlightPoll<'_> {
    fn drop(&mut self) {
        METRICS.in_flight_polls.fetch_sub(1, Ordering::Relaxed);
        self.local.fetch_sub(1, Ordering::Relaxed);
    }
}

/// One-shot status read for a queue id. `GET /transaction/{queue_id}`
pub async fn tx_status(
    State(state): State<Arc<AppState>>,
    Path(queue_id): Path<String>,
) -> Result<Json<TxStatusResponse>, Error> {
    let creds = state.server_config()?;

    if !is_queue_id(&queue_id) {
        warn!(queue_id = %queue_id, "Rejecting malformed queue id");
        return Err(Error::InvalidRequest(format!(
            "queue id must be 1-128 characters of [A-Za-z0-9_-], got {queue_id:?}"
        )));
    }

    let status = state
        .engine
        .transaction_status(&creds, &queue_id)
        .await
        .inspect_err(|e| warn!(queue_id = %queue_id, error = %e, "Status lookup failed"))?;

    Ok(Json(TxStatusResponse {
        mined: status.is_mined(),
        status: status.as_str().to_string(),
        queue_id,
    }))
}

/// Engine queue ids are UUIDs; anything outside this shape never reaches it.
fn is_queue_id(id: &str) -> bool {
    (1..=128).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
