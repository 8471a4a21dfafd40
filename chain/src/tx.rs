//! EIP-1559 transaction assembly and signing.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, TxKind, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use metavote_types::GasPlan;

use crate::error::ChainError;

/// Build, sign, and encode a contract call from the relayer account.
///
/// Returns the transaction hash and the raw bytes ready for
/// `eth_sendRawTransaction`.
pub fn build_signed_tx(
    chain_id: u64,
    nonce: u64,
    plan: &GasPlan,
    to: Address,
    calldata: Bytes,
    signer: &PrivateKeySigner,
) -> Result<(B256, Vec<u8>), ChainError> {
    let tx = TxEip1559 {
        chain_id,
        nonce,
        gas_limit: plan.gas_limit,
        max_fee_per_gas: plan.max_fee_per_gas,
        max_priority_fee_per_gas: plan.max_priority_fee_per_gas,
        to: TxKind::Call(to),
        value: U256::ZERO,
        access_list: AccessList::default(),
        input: calldata,
    };

    let signature = signer
        .sign_hash_sync(&tx.signature_hash())
        .map_err(|e| ChainError::Signing(e.to_string()))?;
    let signed = tx.into_signed(signature);
    let hash = *signed.hash();

    let envelope = TxEnvelope::Eip1559(signed);
    Ok((hash, envelope.encoded_2718()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> GasPlan {
        GasPlan {
            gas_limit: 120_000,
            max_fee_per_gas: 60_000_000_000,
            max_priority_fee_per_gas: 2_000_000_000,
        }
    }

    #[test]
    fn signs_and_encodes() {
        let signer = PrivateKeySigner::random();
        let (hash, raw) = build_signed_tx(
            137,
            0,
            &plan(),
            Address::repeat_byte(0x42),
            Bytes::from(vec![0xde, 0xad]),
            &signer,
        )
        .unwrap();

        // Typed-transaction envelope: first byte is the EIP-1559 marker.
        assert_eq!(raw[0], 0x02);
        assert_ne!(hash, B256::ZERO);
    }

    #[test]
    fn hash_depends_on_nonce() {
        let signer = PrivateKeySigner::random();
        let to = Address::repeat_byte(0x42);
        let (h0, _) =
            build_signed_tx(137, 0, &plan(), to, Bytes::new(), &signer).unwrap();
        let (h1, _) =
            build_signed_tx(137, 1, &plan(), to, Bytes::new(), &signer).unwrap();
        assert_ne!(h0, h1);
    }
}
