//! Application state shared across handlers.

use crate::config::{Config, EnvSource, ServerConfig};
use crate::engine::EngineClient;
use crate::poller::PollPolicy;
use std::sync::atomic::AtomicU64;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub env: EnvSource,
    pub engine: EngineClient,
    /// Cancelled on shutdown; every claim polls under a child of it.
    pub shutdown: CancellationToken,
    /// Bounds claims that are submitting or polling at once.
    pub claim_slots: Semaphore,
    pub start_time: Instant,
    pub request_count: AtomicU64,
    /// Claims of this instance currently polling the engine.
    pub in_flight_polls: AtomicU64,
}

impl AppState {
    /// Create application state reading engine credentials from the process env.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        Self::with_env(config, EnvSource::Process)
    }

    pub fn with_env(config: Config, env: EnvSource) -> Result<Self, crate::Error> {
        let engine = EngineClient::new(config.engine_timeout())?;

        info!(
            chain_id = config.chain_id,
            token = %config.token_address,
            amount = %config.mint_amount,
            "Engine client ready"
        );

        let claim_slots = Semaphore::new(config.max_concurrent_claims);

        Ok(Self {
            config,
            env,
            engine,
            shutdown: CancellationToken::new(),
            claim_slots,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            in_flight_polls: AtomicU64::new(0),
        })
    }

    /// Engine credentials for the current request.
    pub fn server_config(&self) -> Result<ServerConfig, crate::Error> {
        ServerConfig::resolve(&self.env)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.config.poll_max_attempts,
            interval: self.config.poll_interval(),
        }
    }
}
