//! Local JSON-file approval cache.
//!
//! A flat file holding every approval this process has seen, keyed by poll.
//! Loaded once at open; every `put` rewrites the file. Write volume is tiny
//! (one entry per whitelisted voter), so no journal is needed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use metavote_types::WhitelistApproval;
use tokio::sync::RwLock;
use tracing::warn;

use crate::{ApprovalBackend, StoreError};

type PollApprovals = HashMap<String, Vec<WhitelistApproval>>;

/// File-backed approval cache.
pub struct LocalApprovalStore {
    path: PathBuf,
    inner: RwLock<PollApprovals>,
}

fn poll_key(poll_id: U256) -> String {
    poll_id.to_string()
}

impl LocalApprovalStore {
    /// Open the cache at `path`, loading any existing contents.
    ///
    /// A missing file is an empty cache; a corrupt file is logged and
    /// treated as empty rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<PollApprovals>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "approval cache corrupt, starting empty");
                    PollApprovals::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PollApprovals::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            inner: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &PollApprovals) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl ApprovalBackend for LocalApprovalStore {
    async fn get(
        &self,
        poll_id: U256,
        voter: Address,
        now: u64,
    ) -> Result<Option<WhitelistApproval>, StoreError> {
        let entries = self.inner.read().await;
        let found = entries
            .get(&poll_key(poll_id))
            .and_then(|approvals| approvals.iter().find(|a| a.voter == voter))
            .filter(|a| !a.is_expired(now))
            .cloned();
        Ok(found)
    }

    async fn put(&self, approval: &WhitelistApproval) -> Result<(), StoreError> {
        let mut entries = self.inner.write().await;
        let approvals = entries.entry(poll_key(approval.poll_id)).or_default();
        match approvals.iter_mut().find(|a| a.voter == approval.voter) {
            Some(existing) => *existing = approval.clone(),
            None => approvals.push(approval.clone()),
        }
        self.persist(&entries).await
    }

    async fn list_addresses(&self, poll_id: U256) -> Result<Vec<Address>, StoreError> {
        let entries = self.inner.read().await;
        Ok(entries
            .get(&poll_key(poll_id))
            .map(|approvals| approvals.iter().map(|a| a.voter).collect())
            .unwrap_or_default())
    }
}
