//! Relayer configuration.
//!
//! Two layers: [`Config`] holds service settings loaded once at startup
//! (`relayer.toml` + `RELAYER_*` env), while [`ServerConfig`] holds the
//! engine credentials, resolved from an [`EnvSource`] on every request.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Env var naming the backend wallet that signs mints.
pub const BACKEND_WALLET_ADDRESS: &str = "BACKEND_WALLET_ADDRESS";
/// Env var naming the engine base URL.
pub const ENGINE_URL: &str = "ENGINE_URL";
/// Env var naming the engine secret key.
pub const THIRDWEB_SECRET_KEY: &str = "THIRDWEB_SECRET_KEY";

/// Service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    /// Chain the reward token lives on.
    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    /// ERC20 reward token contract.
    #[serde(default = "defaults::token_address")]
    pub token_address: String,

    /// Token units minted per claim, forwarded to the engine as a string.
    #[serde(default = "defaults::mint_amount")]
    pub mint_amount: String,

    #[serde(default = "defaults::poll_max_attempts")]
    pub poll_max_attempts: u32,

    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-call timeout for engine HTTP requests.
    #[serde(default = "defaults::engine_timeout_secs")]
    pub engine_timeout_secs: u64,

    #[serde(default = "defaults::max_concurrent_claims")]
    pub max_concurrent_claims: usize,

    /// When set, `/claimToken` and `/transaction/*` require this key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            chain_id: defaults::chain_id(),
            token_address: defaults::token_address(),
            mint_amount: defaults::mint_amount(),
            poll_max_attempts: defaults::poll_max_attempts(),
            poll_interval_ms: defaults::poll_interval_ms(),
            engine_timeout_secs: defaults::engine_timeout_secs(),
            max_concurrent_claims: defaults::max_concurrent_claims(),
            api_key: None,
        }
    }
}

mod defaults {
    pub fn bind_address() -> String {
        "0.0.0.0:3040".into()
    }

    /// Base Sepolia.
    pub fn chain_id() -> u64 {
        84532
    }

    pub fn token_address() -> String {
        "0x4D9604603527322F44c318FB984ED9b5A9Ce9f71".into()
    }

    pub fn mint_amount() -> String {
        "100".into()
    }

    pub fn poll_max_attempts() -> u32 {
        15
    }

    pub fn poll_interval_ms() -> u64 {
        3000
    }

    pub fn engine_timeout_secs() -> u64 {
        10
    }

    pub fn max_concurrent_claims() -> usize {
        256
    }
}

/// Where engine credentials are read from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment, read on every lookup.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a variable. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Engine credentials required to mint and poll.
#[derive(Clone)]
pub struct ServerConfig {
    pub backend_wallet_address: String,
    pub engine_url: String,
    pub secret_key: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("backend_wallet_address", &self.backend_wallet_address)
            .field("engine_url", &self.engine_url)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    /// Resolve all three credentials, reporting every missing one at once.
    pub fn resolve(env: &EnvSource) -> Result<Self, crate::Error> {
        let backend_wallet_address = env.get(BACKEND_WALLET_ADDRESS);
        let engine_url = env.get(ENGINE_URL);
        let secret_key = env.get(THIRDWEB_SECRET_KEY);

        match (backend_wallet_address, engine_url, secret_key) {
            (Some(backend_wallet_address), Some(engine_url), Some(secret_key)) => Ok(Self {
                backend_wallet_address,
                engine_url: engine_url.trim_end_matches('/').to_string(),
                secret_key,
            }),
            (wallet, url, key) => {
                let missing: Vec<&str> = [
                    (wallet.is_none(), BACKEND_WALLET_ADDRESS),
                    (url.is_none(), ENGINE_URL),
                    (key.is_none(), THIRDWEB_SECRET_KEY),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(crate::Error::Config(format!(
                    "server misconfigured, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}
