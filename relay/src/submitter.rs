//! Transaction submission with bounded retries.
//!
//! A validated vote moves through `Built → Signed → Broadcast → Propagated`,
//! after which the caller gets its transaction hash; the final
//! `Confirmed | Reverted` outcome is tracked on a detached task and only
//! logged. Broadcast failures are retried a fixed number of times with a
//! fixed delay, re-reserving the nonce each time; a fee-too-low rejection
//! escalates the fee bid, a contract revert stops immediately.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use metavote_chain::{build_signed_tx, ChainError, EvmClient};
use metavote_types::GasPlan;
use metavote_utils::{ether, gwei};
use alloy_signer_local::PrivateKeySigner;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::metrics::RelayMetrics;
use crate::nonce::NonceHandle;

/// Interval between receipt polls during the confirmation wait.
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Timing and bound knobs for the submitter.
#[derive(Clone, Copy, Debug)]
pub struct SubmitterConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub propagation_attempts: u32,
    pub propagation_delay: Duration,
    pub confirmation_timeout: Duration,
}

impl From<&RelayConfig> for SubmitterConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_attempts: config.max_submit_attempts,
            retry_delay: Duration::from_millis(config.submit_retry_delay_ms),
            propagation_attempts: config.propagation_attempts,
            propagation_delay: Duration::from_millis(config.propagation_delay_ms),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        }
    }
}

/// What the caller learns about a broadcast transaction.
#[derive(Clone, Debug)]
pub struct SubmitOutcome {
    pub tx_hash: B256,
    pub nonce: u64,
    pub chain_id: u64,
    pub plan: GasPlan,
}

/// Signs and broadcasts relayed votes from the relayer account.
pub struct TransactionSubmitter {
    client: EvmClient,
    signer: PrivateKeySigner,
    chain_id: u64,
    nonces: NonceHandle,
    config: SubmitterConfig,
    metrics: Arc<RelayMetrics>,
}

impl TransactionSubmitter {
    pub fn new(
        client: EvmClient,
        signer: PrivateKeySigner,
        chain_id: u64,
        nonces: NonceHandle,
        config: SubmitterConfig,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            client,
            signer,
            chain_id,
            nonces,
            config,
            metrics,
        }
    }

    /// Broadcast `calldata` against `to`, retrying transient failures.
    ///
    /// Success means the transaction is visible network-wide, not merely
    /// accepted by the submitting node. Returns after spawning the
    /// confirmation watcher; the wait for a mined receipt never blocks the
    /// caller.
    pub async fn submit(
        &self,
        to: Address,
        calldata: Bytes,
        plan: GasPlan,
    ) -> Result<SubmitOutcome, RelayError> {
        let mut plan = plan;
        let mut last_error = String::from("no attempts made");

        for attempt in 1..=self.config.max_attempts.max(1) {
            if attempt > 1 {
                self.metrics.submission_retries.inc();
                sleep(self.config.retry_delay).await;
            }

            let nonce = self.nonces.reserve().await?;
            let (tx_hash, raw) = build_signed_tx(
                self.chain_id,
                nonce,
                &plan,
                to,
                calldata.clone(),
                &self.signer,
            )?;
            info!(
                %tx_hash,
                nonce,
                attempt,
                gas_limit = plan.gas_limit,
                max_fee_gwei = %gwei(plan.max_fee_per_gas),
                "broadcasting vote transaction"
            );

            match self.client.send_raw_transaction(&raw).await {
                Ok(_) => {
                    if self.await_propagation(tx_hash).await {
                        self.spawn_confirmation_watch(tx_hash);
                        return Ok(SubmitOutcome {
                            tx_hash,
                            nonce,
                            chain_id: self.chain_id,
                            plan,
                        });
                    }
                    // The node took the transaction but the network never
                    // saw it. Resync; if the chain never counted our slot,
                    // put it back.
                    warn!(%tx_hash, attempt, "transaction failed to propagate");
                    last_error = "transaction failed to propagate to the network".into();
                    match self.nonces.resync().await {
                        Ok(count) if count <= nonce => self.nonces.release(nonce).await,
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "nonce resync failed after lost broadcast"),
                    }
                }
                Err(e) if e.is_revert() => {
                    // Contract-level rejection: a retry with the same input
                    // cannot succeed.
                    self.nonces.release(nonce).await;
                    self.metrics.submissions_failed.inc();
                    let detail = match e {
                        ChainError::Reverted(reason) => format!("execution reverted: {reason}"),
                        other => other.to_string(),
                    };
                    return Err(RelayError::SubmissionFailed { attempts: attempt, detail });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "broadcast attempt failed");
                    last_error = e.to_string();
                    if e.is_nonce_too_low() {
                        // Slot was consumed out from under us; never reuse it.
                        if let Err(resync_err) = self.nonces.resync().await {
                            warn!(error = %resync_err, "nonce resync failed");
                        }
                    } else {
                        self.nonces.release(nonce).await;
                    }
                    if e.is_fee_too_low() {
                        plan = plan.escalated();
                        debug!(
                            max_fee_gwei = %gwei(plan.max_fee_per_gas),
                            "fee too low, escalating bid"
                        );
                    }
                }
            }
        }

        self.metrics.submissions_failed.inc();
        Err(RelayError::SubmissionFailed {
            attempts: self.config.max_attempts,
            detail: last_error,
        })
    }

    /// Poll the network until the transaction is visible or the bound is
    /// hit. Transient poll errors count as "not yet visible".
    async fn await_propagation(&self, tx_hash: B256) -> bool {
        for attempt in 1..=self.config.propagation_attempts {
            match self.client.transaction_exists(tx_hash).await {
                Ok(true) => return true,
                Ok(false) => {
                    debug!(%tx_hash, attempt, "transaction not yet visible network-wide")
                }
                Err(e) => warn!(%tx_hash, attempt, error = %e, "propagation poll failed"),
            }
            if attempt < self.config.propagation_attempts {
                sleep(self.config.propagation_delay).await;
            }
        }
        false
    }

    /// Watch for one confirmation on a detached task; outcomes are recorded
    /// for observability only.
    fn spawn_confirmation_watch(&self, tx_hash: B256) {
        let client = self.client.clone();
        let metrics = Arc::clone(&self.metrics);
        let timeout = self.config.confirmation_timeout;

        tokio::spawn(async move {
            let wait = async {
                loop {
                    match client.transaction_receipt(tx_hash).await {
                        Ok(Some(receipt)) => return receipt,
                        Ok(None) => {}
                        Err(e) => {
                            warn!(%tx_hash, error = %e, "confirmation poll failed")
                        }
                    }
                    sleep(CONFIRMATION_POLL_INTERVAL).await;
                }
            };

            match tokio::time::timeout(timeout, wait).await {
                Ok(receipt) if receipt.success => {
                    metrics.confirmations_observed.inc();
                    let actual_cost = alloy_primitives::U256::from(receipt.gas_used)
                        * alloy_primitives::U256::from(receipt.effective_gas_price);
                    info!(
                        %tx_hash,
                        block = receipt.block_number,
                        gas_used = receipt.gas_used,
                        effective_gas_price_gwei = %gwei(receipt.effective_gas_price),
                        actual_cost = %ether(actual_cost),
                        "vote transaction confirmed"
                    );
                }
                Ok(receipt) => {
                    metrics.reverts_observed.inc();
                    warn!(
                        %tx_hash,
                        block = receipt.block_number,
                        "vote transaction reverted on chain"
                    );
                }
                Err(_) => {
                    warn!(%tx_hash, timeout_secs = timeout.as_secs(), "confirmation wait timed out");
                }
            }
        });
    }
}
