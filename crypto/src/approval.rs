//! Whitelist approval issuance and recovery.
//!
//! Approvals postdate the typed-data upgrade, so unlike votes there is a
//! single verification scheme and no legacy fallback.

use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct};

use crate::error::CodecError;
use crate::typed_data::WhitelistApproval as ApprovalMessage;
use metavote_types::WhitelistApproval;

fn approval_digest(poll_id: U256, voter: Address, expiry: u64, domain: &Eip712Domain) -> B256 {
    let message = ApprovalMessage {
        pollId: poll_id,
        voter,
        expiry: U256::from(expiry),
    };
    message.eip712_signing_hash(domain)
}

/// Recover the address that signed a whitelist approval.
///
/// The caller compares the result against the poll's on-chain whitelist
/// signer; this function only performs the cryptographic recovery.
pub fn recover_approval_signer(
    poll_id: U256,
    voter: Address,
    expiry: u64,
    signature: &[u8],
    domain: &Eip712Domain,
) -> Result<Address, CodecError> {
    let sig = Signature::from_raw(signature)
        .map_err(|e| CodecError::MalformedSignature(e.to_string()))?;
    sig.recover_address_from_prehash(&approval_digest(poll_id, voter, expiry, domain))
        .map_err(|e| CodecError::RecoveryFailed(e.to_string()))
}

/// Whether `signature` is a valid approval from `expected_signer`. Never
/// raises on malformed input.
pub fn verify_approval(
    poll_id: U256,
    voter: Address,
    expiry: u64,
    signature: &[u8],
    expected_signer: Address,
    domain: &Eip712Domain,
) -> bool {
    recover_approval_signer(poll_id, voter, expiry, signature, domain)
        .map(|recovered| recovered == expected_signer)
        .unwrap_or(false)
}

/// Issue a fresh approval for `voter`, signed by `signer`.
pub fn issue_approval(
    signer: &PrivateKeySigner,
    poll_id: U256,
    voter: Address,
    expiry: u64,
    domain: &Eip712Domain,
) -> Result<WhitelistApproval, CodecError> {
    let digest = approval_digest(poll_id, voter, expiry, domain);
    let sig = signer
        .sign_hash_sync(&digest)
        .map_err(|e| CodecError::Signing(e.to_string()))?;
    Ok(WhitelistApproval {
        poll_id,
        voter,
        expiry,
        signature: Bytes::from(sig.as_bytes().to_vec()),
        signer: signer.address(),
    })
}
