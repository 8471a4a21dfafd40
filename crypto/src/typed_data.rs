//! EIP-712 domains and struct definitions.
//!
//! The struct and field names here are wire format: they feed the EIP-712
//! `encodeType` string and must match what wallets sign byte for byte.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, Eip712Domain};
use metavote_types::PollKind;

sol! {
    /// Payload a voter signs to authorize one ballot.
    struct Vote {
        uint256 pollId;
        uint16 candidateId;
        address voter;
    }

    /// Payload the whitelist signer issues to admit one voter to a poll.
    struct WhitelistApproval {
        uint256 pollId;
        address voter;
        uint256 expiry;
    }
}

/// Build the EIP-712 domain for signatures scoped to a voting contract.
///
/// The domain name distinguishes the public and private systems
/// (`"PublicVotingSystem"` / `"PrivateVotingSystem"`), version is fixed at
/// `"1"`. Whitelist approvals always live in the private domain.
pub fn signing_domain(kind: PollKind, chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    Eip712Domain::new(
        Some(kind.domain_name().into()),
        Some("1".into()),
        Some(U256::from(chain_id)),
        Some(verifying_contract),
        None,
    )
}
