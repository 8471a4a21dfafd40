//! Relay configuration with TOML file support.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Failures wiring a service out of a [`RelayConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("relayer key is not configured (set RELAYER_PRIVATE_KEY)")]
    MissingRelayerKey,

    #[error("invalid {name}: {reason}")]
    InvalidKey { name: &'static str, reason: String },

    #[error("could not open approval cache: {0}")]
    Cache(String),
}

/// Configuration for the relay service.
///
/// Can be loaded from a TOML file via [`RelayConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Key material never lives in the
/// file; the daemon injects it from the environment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// JSON-RPC endpoint of the chain node.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Chain id used for EIP-155 and EIP-712 domains.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Deployed public voting contract.
    #[serde(default = "default_public_contract")]
    pub public_contract: Address,

    /// Deployed private voting contract.
    #[serde(default = "default_private_contract")]
    pub private_contract: Address,

    /// Relayer signing key, hex encoded (injected from the environment,
    /// never read from the config file).
    #[serde(skip)]
    pub relayer_key: Option<String>,

    /// Optional whitelist-signer key for the creator self-sign convenience
    /// (injected from the environment).
    #[serde(skip)]
    pub whitelist_signer_key: Option<String>,

    /// Port for the HTTP API.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Allowed CORS origin (`"*"` for any).
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Base URL of the remote signature vault. Absent means local-only.
    #[serde(default)]
    pub vault_url: Option<String>,

    /// Bearer token for the vault.
    #[serde(default)]
    pub vault_token: Option<String>,

    /// Path of the local approval cache file.
    #[serde(default = "default_cache_path")]
    pub approval_cache_path: PathBuf,

    /// Minimum relayer balance, in wei, below which every vote is refused.
    #[serde(default = "default_balance_floor")]
    pub relayer_balance_floor_wei: u64,

    /// Broadcast attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_submit_attempts: u32,

    /// Delay between broadcast attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub submit_retry_delay_ms: u64,

    /// Polls of the network before a broadcast counts as propagated.
    #[serde(default = "default_propagation_attempts")]
    pub propagation_attempts: u32,

    /// Delay between propagation polls, in milliseconds.
    #[serde(default = "default_propagation_delay_ms")]
    pub propagation_delay_ms: u64,

    /// Bound on the background confirmation wait, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    /// Overall per-request deadline, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose the Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_chain_id() -> u64 {
    137
}

fn default_public_contract() -> Address {
    address!("7f3bdcfa2d93052b7f552e6c9a19f7ad40954a65")
}

fn default_private_contract() -> Address {
    address!("5a66f9f14e1bdef2e484a3e6a47701526dcb0f04")
}

fn default_listen_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./metavote_data/approvals.json")
}

fn default_balance_floor() -> u64 {
    // 0.1 native token
    100_000_000_000_000_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_propagation_attempts() -> u32 {
    10
}

fn default_propagation_delay_ms() -> u64 {
    1_000
}

fn default_confirmation_timeout_secs() -> u64 {
    180
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize from defaults")
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
