//! On-chain poll state as seen by the relay.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which voting contract a poll lives on.
///
/// Public polls accept any voter; private polls additionally require a
/// whitelist approval signed by the poll's designated signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollKind {
    Public,
    Private,
}

impl PollKind {
    /// The EIP-712 domain name for signatures scoped to this contract.
    pub fn domain_name(self) -> &'static str {
        match self {
            PollKind::Public => "PublicVotingSystem",
            PollKind::Private => "PrivateVotingSystem",
        }
    }
}

impl fmt::Display for PollKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollKind::Public => write!(f, "public"),
            PollKind::Private => write!(f, "private"),
        }
    }
}

/// Read-only projection of a poll's on-chain state.
///
/// Fetched fresh for every vote attempt: `end_time` never moves but
/// `voter_count` is mutated concurrently by other voters, so a snapshot must
/// not outlive a single validation pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSnapshot {
    pub title: String,
    pub creator: Address,
    /// Unix seconds after which votes are rejected.
    pub end_time: u64,
    pub candidate_count: u16,
    pub voter_count: u64,
    pub max_voters: u64,
    /// Set only for private polls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist_signer: Option<Address>,
}

impl PollSnapshot {
    /// Whether the poll has ended at `now` (Unix seconds).
    pub fn has_ended(&self, now: u64) -> bool {
        now > self.end_time
    }

    /// Whether the voter cap has been reached.
    pub fn is_full(&self) -> bool {
        self.voter_count >= self.max_voters
    }
}

/// A single candidate with its running tally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    pub vote_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(end_time: u64, voter_count: u64, max_voters: u64) -> PollSnapshot {
        PollSnapshot {
            title: "test poll".into(),
            creator: Address::ZERO,
            end_time,
            candidate_count: 2,
            voter_count,
            max_voters,
            whitelist_signer: None,
        }
    }

    #[test]
    fn end_time_is_inclusive() {
        let poll = snapshot(1_000, 0, 10);
        assert!(!poll.has_ended(1_000));
        assert!(poll.has_ended(1_001));
    }

    #[test]
    fn capacity_boundary() {
        assert!(!snapshot(1_000, 9, 10).is_full());
        assert!(snapshot(1_000, 10, 10).is_full());
    }

    #[test]
    fn domain_names() {
        assert_eq!(PollKind::Public.domain_name(), "PublicVotingSystem");
        assert_eq!(PollKind::Private.domain_name(), "PrivateVotingSystem");
    }
}
