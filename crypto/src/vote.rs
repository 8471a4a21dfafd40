//! Vote signature recovery — typed data with legacy fallback.

use alloy_primitives::utils::eip191_hash_message;
use alloy_primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolStruct};
use tracing::debug;

use crate::error::CodecError;
use crate::typed_data::Vote;

/// Which signing scheme a vote signature was recovered under.
///
/// Tried in fixed priority order: typed data first, then the legacy
/// packed-keccak personal-message scheme. Supporting both keeps signatures
/// issued before the typed-data upgrade valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationScheme {
    TypedData,
    LegacyHash,
}

/// EIP-712 signing hash for a vote.
fn typed_digest(poll_id: U256, candidate_id: u16, voter: Address, domain: &Eip712Domain) -> B256 {
    let message = Vote {
        pollId: poll_id,
        candidateId: candidate_id,
        voter,
    };
    message.eip712_signing_hash(domain)
}

/// Legacy signing hash: `keccak256(abi.encodePacked(pollId, candidateId,
/// voter))` wrapped in the EIP-191 personal-message prefix.
fn legacy_digest(poll_id: U256, candidate_id: u16, voter: Address) -> B256 {
    let mut packed = Vec::with_capacity(32 + 2 + 20);
    packed.extend_from_slice(&poll_id.to_be_bytes::<32>());
    packed.extend_from_slice(&candidate_id.to_be_bytes());
    packed.extend_from_slice(voter.as_slice());
    eip191_hash_message(keccak256(&packed))
}

/// Recover the signer of a vote and report which scheme succeeded.
///
/// A scheme "succeeds" when recovery yields the expected voter address;
/// a typed-data mismatch falls through to the legacy scheme rather than
/// erroring. If neither scheme recovers the voter, the error carries the
/// last recovered address for logging.
pub fn recover_vote_signer(
    poll_id: U256,
    candidate_id: u16,
    voter: Address,
    signature: &[u8],
    domain: &Eip712Domain,
) -> Result<(Address, VerificationScheme), CodecError> {
    let sig = Signature::from_raw(signature)
        .map_err(|e| CodecError::MalformedSignature(e.to_string()))?;

    let mut last_recovered = None;

    let typed = typed_digest(poll_id, candidate_id, voter, domain);
    match sig.recover_address_from_prehash(&typed) {
        Ok(recovered) if recovered == voter => {
            return Ok((recovered, VerificationScheme::TypedData));
        }
        Ok(recovered) => {
            debug!(%recovered, expected = %voter, "typed-data recovery mismatch, trying legacy scheme");
            last_recovered = Some(recovered);
        }
        Err(e) => {
            debug!(error = %e, "typed-data recovery failed, trying legacy scheme");
        }
    }

    let legacy = legacy_digest(poll_id, candidate_id, voter);
    match sig.recover_address_from_prehash(&legacy) {
        Ok(recovered) if recovered == voter => Ok((recovered, VerificationScheme::LegacyHash)),
        Ok(recovered) => Err(CodecError::SignerMismatch {
            expected: voter,
            recovered,
        }),
        Err(e) => match last_recovered {
            Some(recovered) => Err(CodecError::SignerMismatch {
                expected: voter,
                recovered,
            }),
            None => Err(CodecError::RecoveryFailed(e.to_string())),
        },
    }
}

/// Boolean wrapper over [`recover_vote_signer`]; never raises.
pub fn verify_vote(
    poll_id: U256,
    candidate_id: u16,
    voter: Address,
    signature: &[u8],
    domain: &Eip712Domain,
) -> bool {
    recover_vote_signer(poll_id, candidate_id, voter, signature, domain).is_ok()
}

/// Sign a vote as EIP-712 typed data (the current scheme).
pub fn sign_vote(
    signer: &PrivateKeySigner,
    poll_id: U256,
    candidate_id: u16,
    domain: &Eip712Domain,
) -> Result<Bytes, CodecError> {
    let digest = typed_digest(poll_id, candidate_id, signer.address(), domain);
    let sig = signer
        .sign_hash_sync(&digest)
        .map_err(|e| CodecError::Signing(e.to_string()))?;
    Ok(Bytes::from(sig.as_bytes().to_vec()))
}

/// Sign a vote under the legacy packed-keccak scheme. Kept for exercising
/// the fallback path against artifacts produced by old clients.
pub fn sign_vote_legacy(
    signer: &PrivateKeySigner,
    poll_id: U256,
    candidate_id: u16,
) -> Result<Bytes, CodecError> {
    let digest = legacy_digest(poll_id, candidate_id, signer.address());
    let sig = signer
        .sign_hash_sync(&digest)
        .map_err(|e| CodecError::Signing(e.to_string()))?;
    Ok(Bytes::from(sig.as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed_data::signing_domain;
    use metavote_types::PollKind;

    fn domain() -> Eip712Domain {
        signing_domain(PollKind::Public, 137, Address::repeat_byte(0x42))
    }

    #[test]
    fn typed_data_round_trip() {
        let signer = PrivateKeySigner::random();
        let poll_id = U256::from(5);
        let sig = sign_vote(&signer, poll_id, 2, &domain()).unwrap();

        let (recovered, scheme) =
            recover_vote_signer(poll_id, 2, signer.address(), &sig, &domain()).unwrap();
        assert_eq!(recovered, signer.address());
        assert_eq!(scheme, VerificationScheme::TypedData);
    }

    #[test]
    fn legacy_round_trip() {
        let signer = PrivateKeySigner::random();
        let poll_id = U256::from(5);
        let sig = sign_vote_legacy(&signer, poll_id, 2).unwrap();

        let (recovered, scheme) =
            recover_vote_signer(poll_id, 2, signer.address(), &sig, &domain()).unwrap();
        assert_eq!(recovered, signer.address());
        assert_eq!(scheme, VerificationScheme::LegacyHash);
    }

    #[test]
    fn wrong_candidate_rejected() {
        let signer = PrivateKeySigner::random();
        let sig = sign_vote(&signer, U256::from(5), 2, &domain()).unwrap();

        let err = recover_vote_signer(U256::from(5), 3, signer.address(), &sig, &domain());
        assert!(err.is_err());
    }

    #[test]
    fn wrong_signer_rejected() {
        let signer = PrivateKeySigner::random();
        let other = PrivateKeySigner::random();
        let sig = sign_vote(&signer, U256::from(5), 2, &domain()).unwrap();

        assert!(!verify_vote(U256::from(5), 2, other.address(), &sig, &domain()));
    }

    #[test]
    fn wrong_domain_rejected() {
        let signer = PrivateKeySigner::random();
        let sig = sign_vote(&signer, U256::from(5), 2, &domain()).unwrap();

        let other_domain = signing_domain(PollKind::Private, 137, Address::repeat_byte(0x42));
        assert!(!verify_vote(
            U256::from(5),
            2,
            signer.address(),
            &sig,
            &other_domain
        ));
    }

    #[test]
    fn malformed_signature_is_error_not_panic() {
        let result =
            recover_vote_signer(U256::from(5), 2, Address::ZERO, &[0xab; 10], &domain());
        assert!(matches!(result, Err(CodecError::MalformedSignature(_))));
    }

    #[test]
    fn garbage_signature_rejected() {
        let garbage = [0x01u8; 65];
        assert!(!verify_vote(
            U256::from(5),
            2,
            Address::repeat_byte(0x22),
            &garbage,
            &domain()
        ));
    }
}
