//! # Reward Relayer
//!
//! Mints reward tokens to a user's wallet through a transaction engine and
//! holds the request open until the engine reports the transaction mined.
//!
//! ## Endpoints
//! - `POST /claimToken` - Mint to `{ "address": ... }` and wait for confirmation
//! - `GET /transaction/{queue_id}` - Current engine status of a queued mint
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod engine;
mod error;
mod handlers;
pub mod metrics;
pub mod middleware;
pub mod poller;
mod response;
mod router;
mod state;

pub use config::{Config, EnvSource, ServerConfig};
pub use error::Error;
pub use router::create as create_router;
pub use state::AppState;
