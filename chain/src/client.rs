//! Typed `eth_*` calls over an [`RpcTransport`].

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ChainError;
use crate::fees::FeeData;
use crate::transport::{read_with_retries, RpcTransport};

/// Attempts for read-only calls before surfacing a transient error.
const READ_ATTEMPTS: u32 = 3;

/// Base backoff between read retries (scaled linearly per attempt).
const READ_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A mined transaction receipt, reduced to what the relay observes.
#[derive(Clone, Debug)]
pub struct TxReceipt {
    /// `true` for a successful execution, `false` for a revert.
    pub success: bool,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: u128,
}

/// Thin typed wrapper over the JSON-RPC transport.
///
/// Read calls retry transient failures a bounded number of times; write
/// calls (`eth_sendRawTransaction`) never retry here; the submitter owns
/// that loop because a timed-out broadcast may still have landed.
#[derive(Clone)]
pub struct EvmClient {
    transport: Arc<dyn RpcTransport>,
}

impl EvmClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn RpcTransport> {
        &self.transport
    }

    async fn read(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        read_with_retries(
            self.transport.as_ref(),
            method,
            params,
            READ_ATTEMPTS,
            READ_RETRY_DELAY,
        )
        .await
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let result = self.read("eth_chainId", json!([])).await?;
        parse_u64(&result)
    }

    /// Native-token balance of `address` at the latest block.
    pub async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        let result = self
            .read("eth_getBalance", json!([format!("{address:#x}"), "latest"]))
            .await?;
        parse_u256(&result)
    }

    /// The account's next nonce, including pending transactions.
    pub async fn transaction_count(&self, address: Address) -> Result<u64, ChainError> {
        let result = self
            .read(
                "eth_getTransactionCount",
                json!([format!("{address:#x}"), "pending"]),
            )
            .await?;
        parse_u64(&result)
    }

    /// Read-only contract call at the latest block.
    pub async fn call(&self, to: Address, data: &Bytes) -> Result<Bytes, ChainError> {
        let result = self
            .read(
                "eth_call",
                json!([{"to": format!("{to:#x}"), "data": format!("{data}")}, "latest"]),
            )
            .await?;
        parse_bytes(&result)
    }

    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &Bytes,
    ) -> Result<u64, ChainError> {
        let result = self
            .read(
                "eth_estimateGas",
                json!([{
                    "from": format!("{from:#x}"),
                    "to": format!("{to:#x}"),
                    "data": format!("{data}"),
                }]),
            )
            .await?;
        parse_u64(&result)
    }

    /// Live fee data. `eth_gasPrice` is mandatory; a node that does not
    /// serve `eth_maxPriorityFeePerGas` simply yields no priority fee.
    pub async fn fee_data(&self) -> Result<FeeData, ChainError> {
        let gas_price = parse_u128(&self.read("eth_gasPrice", json!([])).await?)?;
        let max_priority_fee_per_gas = match self
            .transport
            .request("eth_maxPriorityFeePerGas", json!([]))
            .await
        {
            Ok(value) => Some(parse_u128(&value)?),
            Err(e) => {
                debug!(error = %e, "node does not serve a priority fee, using gas price only");
                None
            }
        };
        Ok(FeeData {
            gas_price: Some(gas_price),
            max_fee_per_gas: None,
            max_priority_fee_per_gas,
        })
    }

    /// Broadcast a signed raw transaction. No retries at this layer.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ChainError> {
        let result = self
            .transport
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_b256(&result)
    }

    /// Whether the network knows the transaction (pending or mined).
    pub async fn transaction_exists(&self, hash: B256) -> Result<bool, ChainError> {
        let result = self
            .read("eth_getTransactionByHash", json!([format!("{hash:#x}")]))
            .await?;
        Ok(!result.is_null())
    }

    /// The receipt, if the transaction has been mined.
    pub async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        let result = self
            .read("eth_getTransactionReceipt", json!([format!("{hash:#x}")]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let status = result
            .get("status")
            .map(parse_u64)
            .transpose()?
            .unwrap_or(0);
        let block_number = result
            .get("blockNumber")
            .map(parse_u64)
            .transpose()?
            .unwrap_or(0);
        let gas_used = result
            .get("gasUsed")
            .map(parse_u64)
            .transpose()?
            .unwrap_or(0);
        let effective_gas_price = result
            .get("effectiveGasPrice")
            .map(parse_u128)
            .transpose()?
            .unwrap_or(0);
        Ok(Some(TxReceipt {
            success: status == 1,
            block_number,
            gas_used,
            effective_gas_price,
        }))
    }
}

fn quantity(value: &Value) -> Result<&str, ChainError> {
    value
        .as_str()
        .ok_or_else(|| ChainError::InvalidResponse(format!("expected hex string, got {value}")))
}

pub(crate) fn parse_u64(value: &Value) -> Result<u64, ChainError> {
    let s = quantity(value)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

pub(crate) fn parse_u128(value: &Value) -> Result<u128, ChainError> {
    let s = quantity(value)?;
    u128::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

pub(crate) fn parse_u256(value: &Value) -> Result<U256, ChainError> {
    let s = quantity(value)?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

pub(crate) fn parse_b256(value: &Value) -> Result<B256, ChainError> {
    let s = quantity(value)?;
    s.parse::<B256>()
        .map_err(|e| ChainError::InvalidResponse(format!("bad hash {s}: {e}")))
}

pub(crate) fn parse_bytes(value: &Value) -> Result<Bytes, ChainError> {
    let s = quantity(value)?;
    s.parse::<Bytes>()
        .map_err(|e| ChainError::InvalidResponse(format!("bad byte string: {e}")))
}
