//! Whitelist approval storage.
//!
//! Approvals live in two places: a remote signature vault shared by every
//! relay instance, and a local JSON cache that survives vault outages. Both
//! implement [`ApprovalBackend`]; the rest of the codebase depends only on
//! the trait and on [`UnionApprovalStore`], which composes the two with
//! degrade-don't-fail semantics.

pub mod error;
pub mod local;
pub mod remote;
pub mod union;

pub use error::StoreError;
pub use local::LocalApprovalStore;
pub use remote::RemoteVaultStore;
pub use union::UnionApprovalStore;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use metavote_types::WhitelistApproval;

/// One approval storage backend.
///
/// `get` must filter expired entries (an approval with `expiry <= now` is
/// reported as absent). `put` is an upsert keyed on `(poll_id, voter)`;
/// voter comparison is case-insensitive, which address byte equality
/// subsumes.
#[async_trait]
pub trait ApprovalBackend: Send + Sync {
    async fn get(
        &self,
        poll_id: U256,
        voter: Address,
        now: u64,
    ) -> Result<Option<WhitelistApproval>, StoreError>;

    async fn put(&self, approval: &WhitelistApproval) -> Result<(), StoreError>;

    /// All voter addresses with a stored approval for `poll_id`, expired or
    /// not. Advisory only; eligibility is decided by signature validity.
    async fn list_addresses(&self, poll_id: U256) -> Result<Vec<Address>, StoreError>;
}
