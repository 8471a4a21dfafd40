//! Time-bounded whitelist approvals for private polls.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Default lifetime of a newly issued approval, in days.
pub const DEFAULT_APPROVAL_TTL_DAYS: u64 = 7;

/// A signer-issued credential proving an address may vote in a private poll.
///
/// Treated as a capability token: possession plus validity implies
/// eligibility, independent of any separate address list. Valid iff
/// `expiry > now` and the recovered signer equals the poll's on-chain
/// whitelist signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistApproval {
    pub poll_id: U256,
    pub voter: Address,
    /// Unix seconds; the approval is invalid once `expiry <= now`.
    pub expiry: u64,
    pub signature: Bytes,
    /// Address that produced `signature`, recorded at issuance.
    pub signer: Address,
}

impl WhitelistApproval {
    /// Whether the approval has expired at `now` (Unix seconds).
    ///
    /// `expiry == now` counts as expired; only a strictly future expiry is
    /// usable.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expiry <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approval(expiry: u64) -> WhitelistApproval {
        WhitelistApproval {
            poll_id: U256::from(7),
            voter: Address::ZERO,
            expiry,
            signature: Bytes::from(vec![0u8; 65]),
            signer: Address::ZERO,
        }
    }

    #[test]
    fn expiry_boundary() {
        let now = 1_700_000_000;
        assert!(approval(now - 1).is_expired(now));
        assert!(approval(now).is_expired(now));
        assert!(!approval(now + 1).is_expired(now));
    }
}
