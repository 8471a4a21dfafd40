//! JSON-RPC transport.
//!
//! The [`RpcTransport`] trait is the single seam between the relay and the
//! outside chain; every read and write goes through `request`. The
//! production implementation is a thin reqwest client speaking JSON-RPC 2.0
//! over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ChainError;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One JSON-RPC endpoint.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Perform a single `method(params)` call and return the `result` value.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError>;
}

/// Reqwest-backed JSON-RPC client.
pub struct HttpTransport {
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for `url` with default timeout settings.
    pub fn new(url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%method, %id, "rpc request");

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout(e.to_string())
                } else {
                    ChainError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::Transport(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = envelope.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            let data = error
                .get("data")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(ChainError::Rpc {
                code,
                message,
                data,
            });
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse("missing result field".into()))
    }
}

/// Issue a read-only request, retrying transient failures with a linear
/// backoff before surfacing the error. Never used for writes, since a broadcast
/// that timed out may still have landed.
pub async fn read_with_retries(
    transport: &dyn RpcTransport,
    method: &str,
    params: Value,
    attempts: u32,
    base_delay: Duration,
) -> Result<Value, ChainError> {
    let mut last = None;
    for attempt in 1..=attempts.max(1) {
        match transport.request(method, params.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(%method, attempt, error = %e, "transient rpc failure, retrying");
                tokio::time::sleep(base_delay * attempt).await;
                last = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last.unwrap_or_else(|| ChainError::Transport("no attempts made".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_transport::NullTransport;

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let transport = NullTransport::new();
        transport.fail_times("eth_chainId", 2, ChainError::Transport("reset".into()));
        transport.respond("eth_chainId", json!("0x89"));

        let result = read_with_retries(
            &transport,
            "eth_chainId",
            json!([]),
            3,
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(result, json!("0x89"));
        assert_eq!(transport.calls_for("eth_chainId"), 3);
    }

    #[tokio::test]
    async fn gives_up_after_bound() {
        let transport = NullTransport::new();
        transport.fail_times("eth_chainId", 10, ChainError::Transport("reset".into()));

        let result = read_with_retries(
            &transport,
            "eth_chainId",
            json!([]),
            3,
            Duration::from_millis(1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(transport.calls_for("eth_chainId"), 3);
    }

    #[tokio::test]
    async fn rpc_errors_are_not_retried() {
        let transport = NullTransport::new();
        transport.fail_times(
            "eth_call",
            10,
            ChainError::Rpc {
                code: 3,
                message: "execution reverted".into(),
                data: None,
            },
        );

        let result = read_with_retries(
            &transport,
            "eth_call",
            json!([]),
            3,
            Duration::from_millis(1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(transport.calls_for("eth_call"), 1);
    }
}
