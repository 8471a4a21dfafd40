//! A voter's signed intent to cast a ballot.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// An off-chain vote authorization, produced by the voter's wallet.
///
/// The signature covers `Vote{pollId, candidateId, voter}`, either as
/// EIP-712 typed data or, for artifacts issued before the typed-data
/// upgrade, as a personal-message signature over the packed keccak hash.
/// Immutable once created; consumed exactly once by a successful relay.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteIntent {
    pub poll_id: U256,
    pub candidate_id: u16,
    pub voter: Address,
    pub signature: Bytes,
}
