//! The relay's rejection taxonomy.
//!
//! Every rejection carries a stable machine code (for client branching)
//! plus the human-readable `Display` message. Internal error details from
//! upstream systems go to the logs, never into the message.

use alloy_primitives::U256;
use metavote_chain::ChainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("poll has ended")]
    PollEnded,

    #[error("maximum number of voters has been reached")]
    CapacityReached,

    #[error("this address has already voted in this poll")]
    AlreadyVoted,

    #[error("invalid vote signature")]
    InvalidSignature,

    #[error("invalid whitelist signature")]
    InvalidWhitelistSignature,

    #[error("whitelist approval has expired")]
    WhitelistExpired,

    #[error("address is not whitelisted for this poll")]
    NotWhitelisted,

    #[error("poll creator has insufficient funds for gas reimbursement (required {required} wei, available {available} wei)")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("relayer has insufficient funds (balance {balance} wei, floor {floor} wei)")]
    RelayerUnderfunded { balance: U256, floor: U256 },

    #[error("relayer is not authorized for this contract")]
    RelayerUnauthorized,

    #[error("failed to submit transaction after {attempts} attempt(s): {detail}")]
    SubmissionFailed { attempts: u32, detail: String },

    #[error("upstream node unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("request timed out: {0}")]
    Timeout(String),
}

impl RelayError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "VALIDATION_ERROR",
            RelayError::PollEnded => "POLL_ENDED",
            RelayError::CapacityReached => "CAPACITY_REACHED",
            RelayError::AlreadyVoted => "ALREADY_VOTED",
            RelayError::InvalidSignature => "INVALID_SIGNATURE",
            RelayError::InvalidWhitelistSignature => "INVALID_WHITELIST_SIGNATURE",
            RelayError::WhitelistExpired => "WHITELIST_EXPIRED",
            RelayError::NotWhitelisted => "NOT_WHITELISTED",
            RelayError::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            RelayError::RelayerUnderfunded { .. } => "RELAYER_UNDERFUNDED",
            RelayError::RelayerUnauthorized => "RELAYER_UNAUTHORIZED",
            RelayError::SubmissionFailed { .. } => "SUBMISSION_FAILED",
            RelayError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            RelayError::Timeout(_) => "TIMEOUT",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::UpstreamUnavailable(_)
                | RelayError::Timeout(_)
                | RelayError::SubmissionFailed { .. }
        )
    }
}

impl From<ChainError> for RelayError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Timeout(msg) => RelayError::Timeout(msg),
            ChainError::Reverted(reason) => RelayError::SubmissionFailed {
                attempts: 0,
                detail: format!("execution reverted: {reason}"),
            },
            other => RelayError::UpstreamUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RelayError::AlreadyVoted.code(), "ALREADY_VOTED");
        assert_eq!(
            RelayError::Validation(vec!["pollId missing".into()]).code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            RelayError::SubmissionFailed {
                attempts: 3,
                detail: "x".into()
            }
            .code(),
            "SUBMISSION_FAILED"
        );
    }

    #[test]
    fn validation_lists_every_fault() {
        let e = RelayError::Validation(vec!["pollId missing".into(), "voter malformed".into()]);
        let message = e.to_string();
        assert!(message.contains("pollId missing"));
        assert!(message.contains("voter malformed"));
    }

    #[test]
    fn retryability() {
        assert!(RelayError::Timeout("t".into()).is_retryable());
        assert!(RelayError::UpstreamUnavailable("down".into()).is_retryable());
        assert!(!RelayError::AlreadyVoted.is_retryable());
        assert!(!RelayError::PollEnded.is_retryable());
    }

    #[test]
    fn chain_timeouts_map_to_timeout() {
        let e: RelayError = ChainError::Timeout("deadline".into()).into();
        assert_eq!(e.code(), "TIMEOUT");
    }
}
