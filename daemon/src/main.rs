//! metavote daemon — entry point for running the vote relay.

mod shutdown;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::Context;
use clap::Parser;

use metavote_api::ApiServer;
use metavote_chain::HttpTransport;
use metavote_relay::{RelayConfig, RelayService};
use metavote_utils::{init_logging, LogFormat};
use shutdown::ShutdownSignal;

#[derive(Parser)]
#[command(name = "metavote-relayd", about = "Meta-transaction relay for the voting system")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint of the chain node.
    #[arg(long, env = "METAVOTE_RPC_URL")]
    rpc_url: Option<String>,

    /// Chain id for EIP-155 and EIP-712 domains.
    #[arg(long, env = "METAVOTE_CHAIN_ID")]
    chain_id: Option<u64>,

    /// Port for the HTTP API.
    #[arg(long, env = "METAVOTE_PORT")]
    port: Option<u16>,

    /// Relayer signing key (hex).
    #[arg(long, env = "RELAYER_PRIVATE_KEY", hide_env_values = true)]
    relayer_key: Option<String>,

    /// Whitelist-signer key enabling the creator self-sign convenience.
    #[arg(long, env = "WHITELIST_SIGNER_KEY", hide_env_values = true)]
    whitelist_signer_key: Option<String>,

    /// Public voting contract address.
    #[arg(long, env = "PUBLIC_VOTING_CONTRACT")]
    public_contract: Option<String>,

    /// Private voting contract address.
    #[arg(long, env = "PRIVATE_VOTING_CONTRACT")]
    private_contract: Option<String>,

    /// Allowed CORS origin.
    #[arg(long, env = "METAVOTE_CORS_ORIGIN")]
    cors_origin: Option<String>,

    /// Remote signature vault base URL.
    #[arg(long, env = "METAVOTE_VAULT_URL")]
    vault_url: Option<String>,

    /// Bearer token for the signature vault.
    #[arg(long, env = "METAVOTE_VAULT_TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "METAVOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "METAVOTE_LOG_FORMAT")]
    log_format: Option<String>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "METAVOTE_METRICS")]
    metrics: bool,
}

impl Cli {
    /// File config as the base, flags and env vars on top.
    fn into_config(self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_toml_file(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(rpc_url) = self.rpc_url {
            config.rpc_url = rpc_url;
        }
        if let Some(chain_id) = self.chain_id {
            config.chain_id = chain_id;
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(address) = self.public_contract {
            config.public_contract =
                Address::from_str(&address).context("invalid public contract address")?;
        }
        if let Some(address) = self.private_contract {
            config.private_contract =
                Address::from_str(&address).context("invalid private contract address")?;
        }
        if let Some(origin) = self.cors_origin {
            config.cors_origin = origin;
        }
        if self.vault_url.is_some() {
            config.vault_url = self.vault_url;
        }
        if self.vault_token.is_some() {
            config.vault_token = self.vault_token;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if self.metrics {
            config.enable_metrics = true;
        }
        config.relayer_key = self.relayer_key;
        config.whitelist_signer_key = self.whitelist_signer_key;

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    init_logging(LogFormat::from_config(&config.log_format), &config.log_level);
    tracing::info!(
        rpc_url = %config.rpc_url,
        chain_id = config.chain_id,
        port = config.listen_port,
        "starting metavote relay"
    );

    let transport = Arc::new(HttpTransport::new(config.rpc_url.clone()));
    let service = Arc::new(RelayService::new(config, transport).context("wiring relay service")?);

    let shutdown = ShutdownSignal::new();
    let server_shutdown = shutdown.wait();
    tokio::spawn(async move {
        shutdown.listen_for_signals().await;
    });

    ApiServer::new(service)
        .serve(server_shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("metavote relay stopped");
    Ok(())
}
