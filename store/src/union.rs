//! Composition of the remote vault and the local cache.
//!
//! Degrade-don't-fail: no operation here returns an error. A backend
//! failure falls through to the other backend (or to "absent"), and an
//! authorization failure from the vault demotes it for the rest of the
//! process: a backend known to reject our credentials is never retried.
//!
//! Absence of a stored approval is not an eligibility decision; it only
//! means the caller must supply one explicitly or request one from the
//! signer.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use metavote_types::WhitelistApproval;
use tracing::{debug, warn};

use crate::ApprovalBackend;

/// Approval store combining an optional remote vault with a local cache.
pub struct UnionApprovalStore {
    vault: Option<Arc<dyn ApprovalBackend>>,
    cache: Arc<dyn ApprovalBackend>,
    vault_demoted: AtomicBool,
}

impl UnionApprovalStore {
    pub fn new(vault: Option<Arc<dyn ApprovalBackend>>, cache: Arc<dyn ApprovalBackend>) -> Self {
        Self {
            vault,
            cache,
            vault_demoted: AtomicBool::new(false),
        }
    }

    /// Local-only store (no vault configured).
    pub fn local_only(cache: Arc<dyn ApprovalBackend>) -> Self {
        Self::new(None, cache)
    }

    /// Whether the vault is configured and has not been demoted.
    pub fn vault_active(&self) -> bool {
        self.vault.is_some() && !self.vault_demoted.load(Ordering::Relaxed)
    }

    fn active_vault(&self) -> Option<&Arc<dyn ApprovalBackend>> {
        if self.vault_demoted.load(Ordering::Relaxed) {
            return None;
        }
        self.vault.as_ref()
    }

    fn note_vault_failure(&self, op: &str, error: &crate::StoreError) {
        if error.is_authorization() {
            // One-way latch: once credentials are rejected we stay local
            // for the remainder of the process.
            if !self.vault_demoted.swap(true, Ordering::Relaxed) {
                warn!(%op, %error, "vault rejected credentials, demoting to local-only mode");
            }
        } else {
            warn!(%op, %error, "vault operation failed, falling back to local cache");
        }
    }

    /// Fetch a current (non-expired) approval for `(poll_id, voter)`.
    pub async fn get(&self, poll_id: U256, voter: Address, now: u64) -> Option<WhitelistApproval> {
        if let Some(vault) = self.active_vault() {
            match vault.get(poll_id, voter, now).await {
                Ok(Some(approval)) => return Some(approval),
                Ok(None) => {}
                Err(e) => self.note_vault_failure("get", &e),
            }
        }
        match self.cache.get(poll_id, voter, now).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "local approval cache read failed");
                None
            }
        }
    }

    /// Upsert an approval into every reachable backend.
    ///
    /// The local cache is always written so a later vault outage cannot
    /// lose the entry.
    pub async fn put(&self, approval: &WhitelistApproval) {
        if let Err(e) = self.cache.put(approval).await {
            warn!(error = %e, "local approval cache write failed");
        }
        if let Some(vault) = self.active_vault() {
            if let Err(e) = vault.put(approval).await {
                self.note_vault_failure("put", &e);
            }
        }
    }

    /// Union of addresses known to any backend, deduplicated.
    ///
    /// Union, not intersection: an address whitelisted in either backend is
    /// present, because eligibility is ultimately decided by signature
    /// validity. This list is advisory.
    pub async fn list_addresses(&self, poll_id: U256) -> Vec<Address> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let mut absorb = |addresses: Vec<Address>| {
            for address in addresses {
                if seen.insert(address) {
                    result.push(address);
                }
            }
        };

        match self.cache.list_addresses(poll_id).await {
            Ok(addresses) => absorb(addresses),
            Err(e) => warn!(error = %e, "local approval cache list failed"),
        }
        if let Some(vault) = self.active_vault() {
            match vault.list_addresses(poll_id).await {
                Ok(addresses) => absorb(addresses),
                Err(e) => self.note_vault_failure("list", &e),
            }
        }

        debug!(%poll_id, count = result.len(), "listed whitelisted addresses");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalApprovalStore, StoreError};
    use alloy_primitives::Bytes;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn approval(poll_id: u64, voter: Address, expiry: u64) -> WhitelistApproval {
        WhitelistApproval {
            poll_id: U256::from(poll_id),
            voter,
            expiry,
            signature: Bytes::from(vec![0xcd; 65]),
            signer: Address::repeat_byte(0x01),
        }
    }

    /// Backend with fixed contents that can be switched to failing modes.
    struct FakeBackend {
        approvals: Vec<WhitelistApproval>,
        unauthorized: bool,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn with(approvals: Vec<WhitelistApproval>) -> Self {
            Self {
                approvals,
                unauthorized: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn unauthorized() -> Self {
            Self {
                approvals: Vec::new(),
                unauthorized: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ApprovalBackend for FakeBackend {
        async fn get(
            &self,
            poll_id: U256,
            voter: Address,
            now: u64,
        ) -> Result<Option<WhitelistApproval>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized {
                return Err(StoreError::Unauthorized("permission denied".into()));
            }
            Ok(self
                .approvals
                .iter()
                .find(|a| a.poll_id == poll_id && a.voter == voter && !a.is_expired(now))
                .cloned())
        }

        async fn put(&self, _approval: &WhitelistApproval) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized {
                return Err(StoreError::Unauthorized("permission denied".into()));
            }
            Ok(())
        }

        async fn list_addresses(&self, poll_id: U256) -> Result<Vec<Address>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unauthorized {
                return Err(StoreError::Unauthorized("permission denied".into()));
            }
            Ok(self
                .approvals
                .iter()
                .filter(|a| a.poll_id == poll_id)
                .map(|a| a.voter)
                .collect())
        }
    }

    fn local_cache() -> (tempfile::TempDir, Arc<LocalApprovalStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(LocalApprovalStore::open(dir.path().join("approvals.json")).unwrap());
        (dir, store)
    }

    #[tokio::test]
    async fn union_deduplicates_across_backends() {
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        let (_dir, cache) = local_cache();
        cache.put(&approval(7, a, 2_000)).await.unwrap();

        let vault = Arc::new(FakeBackend::with(vec![
            approval(7, a, 2_000),
            approval(7, b, 2_000),
        ]));
        let store = UnionApprovalStore::new(Some(vault), cache);

        let mut addresses = store.list_addresses(U256::from(7)).await;
        addresses.sort();
        assert_eq!(addresses, vec![a, b]);
    }

    #[tokio::test]
    async fn vault_demotes_permanently_on_auth_failure() {
        let (_dir, cache) = local_cache();
        let vault = Arc::new(FakeBackend::unauthorized());
        let store = UnionApprovalStore::new(Some(vault.clone()), cache);

        assert!(store.vault_active());
        let _ = store.get(U256::from(7), Address::ZERO, 0).await;
        assert!(!store.vault_active());

        // Subsequent operations must not touch the vault again.
        let calls_after_demotion = vault.calls.load(Ordering::SeqCst);
        let _ = store.get(U256::from(7), Address::ZERO, 0).await;
        let _ = store.list_addresses(U256::from(7)).await;
        assert_eq!(vault.calls.load(Ordering::SeqCst), calls_after_demotion);
    }

    #[tokio::test]
    async fn get_falls_back_to_cache() {
        let voter = Address::repeat_byte(0x05);
        let (_dir, cache) = local_cache();
        cache.put(&approval(7, voter, 2_000)).await.unwrap();

        let store = UnionApprovalStore::new(Some(Arc::new(FakeBackend::unauthorized())), cache);
        let found = store.get(U256::from(7), voter, 1_000).await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn put_always_writes_cache() {
        let voter = Address::repeat_byte(0x05);
        let (_dir, cache) = local_cache();
        let store =
            UnionApprovalStore::new(Some(Arc::new(FakeBackend::unauthorized())), cache.clone());

        store.put(&approval(7, voter, 2_000)).await;
        assert!(cache
            .get(U256::from(7), voter, 1_000)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn local_only_never_touches_vault() {
        let (_dir, cache) = local_cache();
        let store = UnionApprovalStore::local_only(cache);
        assert!(!store.vault_active());
        assert!(store.get(U256::from(7), Address::ZERO, 0).await.is_none());
    }
}
