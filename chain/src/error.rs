use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("node rejected request ({code}): {message}")]
    Rpc {
        code: i64,
        message: String,
        /// Raw `data` field from the error object, if present. Carries the
        /// ABI-encoded revert payload for execution reverts.
        data: Option<String>,
    },

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("invalid node response: {0}")]
    InvalidResponse(String),

    #[error("node reported neither EIP-1559 fees nor a gas price")]
    MissingFeeData,

    #[error("transaction signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    /// Whether retrying the same request can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transport(_) | ChainError::Timeout(_))
    }

    /// Whether the node rejected a submission for bidding too low a fee.
    pub fn is_fee_too_low(&self) -> bool {
        self.rpc_message_contains(&[
            "underpriced",
            "fee too low",
            "max fee per gas less than block base fee",
        ])
    }

    /// Whether the node rejected a submission for a stale nonce.
    pub fn is_nonce_too_low(&self) -> bool {
        self.rpc_message_contains(&["nonce too low", "already known"])
    }

    /// Whether this error is a contract-level revert (not retryable without
    /// a changed input).
    pub fn is_revert(&self) -> bool {
        match self {
            ChainError::Reverted(_) => true,
            ChainError::Rpc { message, .. } => {
                message.to_lowercase().contains("execution reverted")
            }
            _ => false,
        }
    }

    fn rpc_message_contains(&self, needles: &[&str]) -> bool {
        match self {
            ChainError::Rpc { message, .. } => {
                let message = message.to_lowercase();
                needles.iter().any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }
}
