//! Fee data and gas planning.

use metavote_types::{scale_bps, GasPlan, SpeedTier};

use crate::error::ChainError;

/// Margin added to the estimated gas before it becomes the limit (+20%).
const GAS_LIMIT_MARGIN_BPS: u128 = 12_000;

/// Live fee observations from the node.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeeData {
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl FeeData {
    /// The fee ceiling to bid: `maxFeePerGas` when the node reports one,
    /// otherwise the legacy `gasPrice`.
    pub fn max_fee(&self) -> Result<u128, ChainError> {
        self.max_fee_per_gas
            .or(self.gas_price)
            .ok_or(ChainError::MissingFeeData)
    }
}

/// Derive a [`GasPlan`] from an estimate and live fee data.
///
/// The gas limit gets a 20% buffer over the node's estimate. Both fee
/// fields scale with the caller's speed tier; the priority fee never
/// exceeds the fee ceiling.
pub fn plan_gas(
    estimated_gas: u64,
    fees: &FeeData,
    tier: SpeedTier,
) -> Result<GasPlan, ChainError> {
    let gas_limit =
        u64::try_from(scale_bps(estimated_gas as u128, GAS_LIMIT_MARGIN_BPS)).unwrap_or(u64::MAX);

    let base_fee = fees.max_fee()?;
    let max_fee_per_gas = scale_bps(base_fee, tier.multiplier_bps());
    let priority = fees.max_priority_fee_per_gas.unwrap_or(base_fee);
    let max_priority_fee_per_gas =
        scale_bps(priority, tier.multiplier_bps()).min(max_fee_per_gas);

    Ok(GasPlan {
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
    })
}
