//! Serialized nonce allocation for the relayer account.
//!
//! The chain requires strictly increasing, gap-free nonces per sender, and
//! every HTTP request submits from the same relayer account. Two handlers
//! that each read "current nonce" from the node and submit will collide, so
//! issuance is owned by a single actor: handlers send a reserve request
//! over a channel and the actor replies with the next slot. A failed
//! submission releases its slot for lowest-first reuse instead of leaking a
//! gap; a node-reported stale nonce triggers a resync from the chain's
//! pending count.

use std::collections::BTreeSet;

use alloy_primitives::Address;
use metavote_chain::{ChainError, EvmClient};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Channel buffer size for nonce requests.
const CHANNEL_BUFFER: usize = 64;

enum NonceCommand {
    /// Hand out the next usable nonce.
    Reserve {
        reply: oneshot::Sender<Result<u64, ChainError>>,
    },
    /// Return a slot whose submission never reached the chain.
    Release { nonce: u64 },
    /// Re-read the chain's pending count and drop stale state.
    Resync {
        reply: oneshot::Sender<Result<u64, ChainError>>,
    },
}

/// Cloneable client handle for the nonce actor.
#[derive(Clone)]
pub struct NonceHandle {
    tx: mpsc::Sender<NonceCommand>,
}

impl NonceHandle {
    /// Reserve the next nonce. Slots are strictly increasing across
    /// concurrent callers, with released slots reused lowest-first.
    pub async fn reserve(&self) -> Result<u64, ChainError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceCommand::Reserve { reply })
            .await
            .map_err(|_| ChainError::Transport("nonce manager stopped".into()))?;
        rx.await
            .map_err(|_| ChainError::Transport("nonce manager stopped".into()))?
    }

    /// Release a slot that was reserved but never broadcast.
    pub async fn release(&self, nonce: u64) {
        let _ = self.tx.send(NonceCommand::Release { nonce }).await;
    }

    /// Force the actor to refetch the pending count. Returns the new floor.
    pub async fn resync(&self) -> Result<u64, ChainError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NonceCommand::Resync { reply })
            .await
            .map_err(|_| ChainError::Transport("nonce manager stopped".into()))?;
        rx.await
            .map_err(|_| ChainError::Transport("nonce manager stopped".into()))?
    }
}

struct NonceManager {
    client: EvmClient,
    relayer: Address,
    /// Next never-used nonce. `None` until the first successful chain read.
    next: Option<u64>,
    /// Slots handed out and returned without ever reaching the chain.
    released: BTreeSet<u64>,
}

impl NonceManager {
    async fn ensure_initialized(&mut self) -> Result<(), ChainError> {
        if self.next.is_none() {
            let count = self.client.transaction_count(self.relayer).await?;
            info!(relayer = %self.relayer, nonce = count, "initialized nonce from chain pending count");
            self.next = Some(count);
        }
        Ok(())
    }

    async fn reserve(&mut self) -> Result<u64, ChainError> {
        self.ensure_initialized().await?;
        if let Some(&lowest) = self.released.iter().next() {
            self.released.remove(&lowest);
            debug!(nonce = lowest, "reusing released nonce slot");
            return Ok(lowest);
        }
        let next = self.next.expect("initialized above");
        self.next = Some(next + 1);
        Ok(next)
    }

    fn release(&mut self, nonce: u64) {
        match self.next {
            // Undo the most recent reservation outright when possible.
            Some(next) if nonce + 1 == next && self.released.is_empty() => {
                self.next = Some(nonce);
            }
            Some(next) if nonce < next => {
                self.released.insert(nonce);
            }
            _ => warn!(nonce, "released a nonce that was never reserved"),
        }
    }

    async fn resync(&mut self) -> Result<u64, ChainError> {
        let count = self.client.transaction_count(self.relayer).await?;
        // Slots below the chain's pending count were consumed on-chain.
        self.released.retain(|&n| n >= count);
        let next = self.next.unwrap_or(0).max(count);
        self.next = Some(next);
        info!(nonce = count, "resynced nonce from chain");
        Ok(count)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<NonceCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                NonceCommand::Reserve { reply } => {
                    let _ = reply.send(self.reserve().await);
                }
                NonceCommand::Release { nonce } => self.release(nonce),
                NonceCommand::Resync { reply } => {
                    let _ = reply.send(self.resync().await);
                }
            }
        }
    }
}

/// Spawn the nonce actor for `relayer` and return its handle.
pub fn spawn_nonce_manager(client: EvmClient, relayer: Address) -> NonceHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
    let manager = NonceManager {
        client,
        relayer,
        next: None,
        released: BTreeSet::new(),
    };
    tokio::spawn(manager.run(rx));
    NonceHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metavote_chain::NullTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn handle_with_count(transport: Arc<NullTransport>, count: u64) -> NonceHandle {
        transport.respond("eth_getTransactionCount", json!(format!("{count:#x}")));
        spawn_nonce_manager(EvmClient::new(transport), Address::repeat_byte(0x01))
    }

    #[tokio::test]
    async fn sequential_reserves_increase() {
        let handle = handle_with_count(Arc::new(NullTransport::new()), 5);
        assert_eq!(handle.reserve().await.unwrap(), 5);
        assert_eq!(handle.reserve().await.unwrap(), 6);
        assert_eq!(handle.reserve().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn concurrent_reserves_are_distinct_and_gap_free() {
        let handle = handle_with_count(Arc::new(NullTransport::new()), 0);

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move { handle.reserve().await.unwrap() }));
        }
        let mut nonces = Vec::new();
        for task in tasks {
            nonces.push(task.await.unwrap());
        }
        nonces.sort_unstable();
        let expected: Vec<u64> = (0..20).collect();
        assert_eq!(nonces, expected);
    }

    #[tokio::test]
    async fn released_slot_is_reused_lowest_first() {
        let handle = handle_with_count(Arc::new(NullTransport::new()), 0);
        let a = handle.reserve().await.unwrap();
        let b = handle.reserve().await.unwrap();
        let c = handle.reserve().await.unwrap();
        assert_eq!((a, b, c), (0, 1, 2));

        handle.release(b).await;
        assert_eq!(handle.reserve().await.unwrap(), 1);
        assert_eq!(handle.reserve().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn releasing_top_slot_undoes_reservation() {
        let handle = handle_with_count(Arc::new(NullTransport::new()), 4);
        let n = handle.reserve().await.unwrap();
        handle.release(n).await;
        assert_eq!(handle.reserve().await.unwrap(), n);
    }

    #[tokio::test]
    async fn chain_is_read_once_for_many_reserves() {
        let transport = Arc::new(NullTransport::new());
        let handle = handle_with_count(transport.clone(), 0);
        for _ in 0..5 {
            handle.reserve().await.unwrap();
        }
        assert_eq!(transport.calls_for("eth_getTransactionCount"), 1);
    }

    #[tokio::test]
    async fn resync_advances_past_consumed_slots() {
        let transport = Arc::new(NullTransport::new());
        transport.enqueue("eth_getTransactionCount", json!("0x0"));
        transport.respond("eth_getTransactionCount", json!("0x5"));
        let handle =
            spawn_nonce_manager(EvmClient::new(transport), Address::repeat_byte(0x01));

        let n = handle.reserve().await.unwrap();
        assert_eq!(n, 0);
        // Node reports our slot as stale; resync jumps to the chain's count.
        handle.release(n).await;
        assert_eq!(handle.resync().await.unwrap(), 5);
        assert_eq!(handle.reserve().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn failed_initialization_surfaces_error() {
        let transport = Arc::new(NullTransport::new());
        transport.fail_times(
            "eth_getTransactionCount",
            10,
            ChainError::Transport("node down".into()),
        );
        let handle =
            spawn_nonce_manager(EvmClient::new(transport), Address::repeat_byte(0x01));
        assert!(handle.reserve().await.is_err());
    }
}
