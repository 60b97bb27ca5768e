//! Confirmation polling for queued engine transactions.
//!
//! [`poll_until_mined`] drives a [`StatusCheck`] at a fixed interval until it
//! reports mined, the attempt budget runs out, or the cancellation token
//! fires. Checks never overlap and the delay sits only between attempts.

use crate::config::ServerConfig;
use crate::engine::EngineClient;
use crate::metrics::METRICS;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One "is it mined yet?" probe. Must not fail: errors read as `false`.
pub trait StatusCheck {
    fn is_mined(&self, queue_id: &str) -> impl Future<Output = bool> + Send;
}

/// Attempt budget for one poll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            interval: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Mined on the given (1-based) attempt.
    Mined { attempts: u32 },
    TimedOut,
    Cancelled,
}

/// Poll `checker` for `queue_id` under `policy`.
pub async fn poll_until_mined<C: StatusCheck>(
    checker: &C,
    queue_id: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
) -> PollOutcome {
    for attempt in 1..=policy.max_attempts {
        // select! builds every branch future up front; don't start a check
        // the token has already ruled out.
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let mined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            mined = checker.is_mined(queue_id) => mined,
        };

        if mined {
            debug!(queue_id, attempt, "Transaction mined");
            return PollOutcome::Mined { attempts: attempt };
        }

        if attempt < policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    debug!(queue_id, attempts = policy.max_attempts, "Poll budget exhausted");
    PollOutcome::TimedOut
}

/// [`StatusCheck`] backed by the engine's status endpoint.
pub struct EngineStatusChecker<'a> {
    engine: &'a EngineClient,
    creds: &'a ServerConfig,
}

impl<'a> EngineStatusChecker<'a> {
    pub fn new(engine: &'a EngineClient, creds: &'a ServerConfig) -> Self {
        Self { engine, creds }
    }
}

impl StatusCheck for EngineStatusChecker<'_> {
    async fn is_mined(&self, queue_id: &str) -> bool {
        METRICS.status_checks_total.fetch_add(1, Ordering::Relaxed);
        match self.engine.transaction_status(self.creds, queue_id).await {
            Ok(status) => {
                debug!(queue_id, status = %status, "Status check");
                status.is_mined()
            }
            Err(e) => {
                METRICS.status_check_errors.fetch_add(1, Ordering::Relaxed);
                warn!(queue_id, error = %e, "Status check failed, treating as not mined");
                false
            }
        }
    }
}
