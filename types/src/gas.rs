//! Gas planning for relayed transactions.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Caller-selected processing speed, scaling the fee bid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    #[default]
    Standard,
    Fast,
    Rapid,
}

impl SpeedTier {
    /// Fee multiplier in basis points (standard ×1, fast ×1.5, rapid ×2).
    pub fn multiplier_bps(self) -> u128 {
        match self {
            SpeedTier::Standard => 10_000,
            SpeedTier::Fast => 15_000,
            SpeedTier::Rapid => 20_000,
        }
    }
}

/// Escalation applied to the fee bid on each retry, in basis points (+20%).
pub const RETRY_ESCALATION_BPS: u128 = 12_000;

/// A concrete gas budget for one transaction attempt.
///
/// EIP-1559 shaped; on legacy networks the fee fields are both derived from
/// the node's `gasPrice`, which degrades to the pre-1559 behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasPlan {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl GasPlan {
    /// Worst-case cost of this plan in wei.
    pub fn max_cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.max_fee_per_gas)
    }

    /// Return a copy with both fee fields bumped by the retry escalation
    /// factor. The gas limit is left untouched.
    pub fn escalated(&self) -> Self {
        Self {
            gas_limit: self.gas_limit,
            max_fee_per_gas: scale_bps(self.max_fee_per_gas, RETRY_ESCALATION_BPS),
            max_priority_fee_per_gas: scale_bps(
                self.max_priority_fee_per_gas,
                RETRY_ESCALATION_BPS,
            ),
        }
    }
}

/// Scale `value` by `bps` basis points, rounding down, saturating on overflow.
pub fn scale_bps(value: u128, bps: u128) -> u128 {
    value
        .checked_mul(bps)
        .map(|v| v / 10_000)
        .unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_multipliers() {
        assert_eq!(SpeedTier::Standard.multiplier_bps(), 10_000);
        assert_eq!(SpeedTier::Fast.multiplier_bps(), 15_000);
        assert_eq!(SpeedTier::Rapid.multiplier_bps(), 20_000);
    }

    #[test]
    fn escalation_adds_twenty_percent() {
        let plan = GasPlan {
            gas_limit: 100_000,
            max_fee_per_gas: 50_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        };
        let bumped = plan.escalated();
        assert_eq!(bumped.gas_limit, 100_000);
        assert_eq!(bumped.max_fee_per_gas, 60_000_000_000);
        assert_eq!(bumped.max_priority_fee_per_gas, 2_400_000_000);
    }

    #[test]
    fn max_cost_is_limit_times_fee() {
        let plan = GasPlan {
            gas_limit: 21_000,
            max_fee_per_gas: 10,
            max_priority_fee_per_gas: 1,
        };
        assert_eq!(plan.max_cost(), U256::from(210_000u64));
    }

    #[test]
    fn scale_saturates() {
        assert_eq!(scale_bps(u128::MAX, 12_000), u128::MAX);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn scale_is_identity_at_one(value in 0u128..=u128::MAX / 10_000) {
            prop_assert_eq!(scale_bps(value, 10_000), value);
        }

        #[test]
        fn scale_is_monotonic_in_value(a in any::<u128>(), b in any::<u128>(), bps in 1u128..=30_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(scale_bps(lo, bps) <= scale_bps(hi, bps));
        }
    }
}
