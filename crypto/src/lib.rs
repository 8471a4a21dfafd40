//! Signature construction and recovery for the voting protocol.
//!
//! Two signed artifacts exist:
//! - **Votes** — `Vote{pollId, candidateId, voter}` signed by the voter.
//!   Verified as EIP-712 typed data first, with a fallback to the legacy
//!   packed-keccak / personal-message scheme for signatures issued before
//!   the typed-data upgrade.
//! - **Whitelist approvals** — `WhitelistApproval{pollId, voter, expiry}`
//!   signed by a poll's designated whitelist signer. Single-format EIP-712,
//!   no legacy fallback.
//!
//! Recovery never panics on malformed input; every scheme produces a
//! `Result` so callers can log a mismatch without raising.

pub mod approval;
pub mod error;
pub mod typed_data;
pub mod vote;

pub use approval::{issue_approval, recover_approval_signer, verify_approval};
pub use error::CodecError;
pub use typed_data::signing_domain;
pub use vote::{recover_vote_signer, sign_vote, sign_vote_legacy, verify_vote, VerificationScheme};
