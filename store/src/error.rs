use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("vault request failed: {0}")]
    Request(String),

    #[error("vault rejected credentials: {0}")]
    Unauthorized(String),

    #[error("invalid vault response: {0}")]
    InvalidResponse(String),
}

impl StoreError {
    /// Authorization failures demote the remote backend for the rest of the
    /// process; everything else is treated as transient.
    pub fn is_authorization(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}
