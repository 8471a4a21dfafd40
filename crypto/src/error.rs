use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("recovered signer {recovered} does not match expected {expected}")]
    SignerMismatch {
        expected: Address,
        recovered: Address,
    },

    #[error("signing failed: {0}")]
    Signing(String),
}
