//! HTTP mapping of relay rejections.
//!
//! Every error body is `{"error": <message>, "code": <machine code>}`.
//! Messages are user-facing; upstream details stay in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metavote_relay::RelayError;
use serde_json::json;

/// Wrapper giving [`RelayError`] an HTTP shape.
#[derive(Debug)]
pub struct ApiError(pub RelayError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RelayError::Validation(_)
            | RelayError::PollEnded
            | RelayError::CapacityReached
            | RelayError::AlreadyVoted
            | RelayError::InvalidSignature
            | RelayError::InvalidWhitelistSignature
            | RelayError::WhitelistExpired
            | RelayError::NotWhitelisted => StatusCode::BAD_REQUEST,
            RelayError::InsufficientAllowance { .. } => StatusCode::PAYMENT_REQUIRED,
            RelayError::RelayerUnderfunded { .. } | RelayError::RelayerUnauthorized => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Network-layer submission failures are retryable by the
            // caller; contract-level reverts are not.
            RelayError::SubmissionFailed { detail, .. } => {
                if detail.contains("reverted") {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }
            RelayError::UpstreamUnavailable(_) | RelayError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        Self(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn status_of(e: RelayError) -> StatusCode {
        ApiError(e).status()
    }

    #[test]
    fn local_rejections_are_400() {
        assert_eq!(status_of(RelayError::AlreadyVoted), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(RelayError::PollEnded), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(RelayError::WhitelistExpired),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RelayError::Validation(vec!["pollId is required".into()])),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn economic_failures() {
        assert_eq!(
            status_of(RelayError::InsufficientAllowance {
                required: U256::from(2),
                available: U256::from(1),
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(RelayError::RelayerUnderfunded {
                balance: U256::ZERO,
                floor: U256::from(1),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn submission_failures_distinguish_reverts() {
        assert_eq!(
            status_of(RelayError::SubmissionFailed {
                attempts: 3,
                detail: "connection refused".into(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(RelayError::SubmissionFailed {
                attempts: 1,
                detail: "execution reverted: already voted".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn body_carries_code_and_message() {
        let response = ApiError(RelayError::AlreadyVoted).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "ALREADY_VOTED");
        assert!(body["error"].as_str().unwrap().contains("already voted"));
    }
}
