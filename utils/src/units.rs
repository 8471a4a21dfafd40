//! Display helpers for on-chain amounts.
//!
//! Log lines and API responses show fees in gwei and balances in the
//! chain's native token, mirroring what block explorers display.

use alloy_primitives::utils::{format_ether, format_units};
use alloy_primitives::U256;

/// Format a wei amount as a decimal native-token string (18 decimals).
pub fn ether(value: U256) -> String {
    format_ether(value)
}

/// Format a wei amount as a decimal gwei string.
pub fn gwei(value: u128) -> String {
    format_units(U256::from(value), "gwei").unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_ether() {
        let wei = U256::from(1_500_000_000_000_000_000u128);
        assert!(ether(wei).starts_with("1.5"));
    }

    #[test]
    fn formats_gwei() {
        assert!(gwei(2_000_000_000).starts_with("2"));
    }
}
