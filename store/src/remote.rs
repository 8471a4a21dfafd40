//! HTTP client for the remote signature vault.
//!
//! The vault is a plain document store:
//! - `GET  {base}/polls/{pollId}/approvals/{voter}` → approval JSON or 404
//! - `PUT  {base}/polls/{pollId}/approvals/{voter}` ← approval JSON
//! - `GET  {base}/polls/{pollId}/approvals` → array of approvals
//!
//! Requests carry an optional bearer token. A 401/403 response maps to
//! [`StoreError::Unauthorized`], which the union store treats as a permanent
//! demotion signal.

use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use metavote_types::WhitelistApproval;
use reqwest::StatusCode;

use crate::{ApprovalBackend, StoreError};

/// Default timeout for vault requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the remote approval vault.
pub struct RemoteVaultStore {
    http_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RemoteVaultStore {
    /// Create a vault client with default timeout settings.
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into(),
            auth_token,
        }
    }

    fn approval_url(&self, poll_id: U256, voter: Option<Address>) -> String {
        let base = self.base_url.trim_end_matches('/');
        match voter {
            Some(voter) => format!("{base}/polls/{poll_id}/approvals/{voter:#x}"),
            None => format!("{base}/polls/{poll_id}/approvals"),
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn check_status(status: StatusCode) -> Result<(), StoreError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized(format!("HTTP status {status}")));
        }
        if !status.is_success() {
            return Err(StoreError::Request(format!("HTTP status {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ApprovalBackend for RemoteVaultStore {
    async fn get(
        &self,
        poll_id: U256,
        voter: Address,
        now: u64,
    ) -> Result<Option<WhitelistApproval>, StoreError> {
        let url = self.approval_url(poll_id, Some(voter));
        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check_status(response.status())?;

        let approval: WhitelistApproval = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(Some(approval).filter(|a| !a.is_expired(now)))
    }

    async fn put(&self, approval: &WhitelistApproval) -> Result<(), StoreError> {
        let url = self.approval_url(approval.poll_id, Some(approval.voter));
        let response = self
            .authorize(self.http_client.put(&url))
            .json(approval)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Self::check_status(response.status())
    }

    async fn list_addresses(&self, poll_id: U256) -> Result<Vec<Address>, StoreError> {
        let url = self.approval_url(poll_id, None);
        let response = self
            .authorize(self.http_client.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        Self::check_status(response.status())?;

        let approvals: Vec<WhitelistApproval> = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(approvals.into_iter().map(|a| a.voter).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_lowercase_hex() {
        let store = RemoteVaultStore::new("https://vault.example/api/", None);
        let voter = Address::repeat_byte(0xAB);
        let url = store.approval_url(U256::from(7), Some(voter));
        assert_eq!(
            url,
            "https://vault.example/api/polls/7/approvals/0xabababababababababababababababababababab"
        );
        assert_eq!(
            store.approval_url(U256::from(7), None),
            "https://vault.example/api/polls/7/approvals"
        );
    }

    #[test]
    fn auth_status_maps_to_unauthorized() {
        assert!(RemoteVaultStore::check_status(StatusCode::UNAUTHORIZED)
            .unwrap_err()
            .is_authorization());
        assert!(RemoteVaultStore::check_status(StatusCode::FORBIDDEN)
            .unwrap_err()
            .is_authorization());
        assert!(!RemoteVaultStore::check_status(StatusCode::INTERNAL_SERVER_ERROR)
            .unwrap_err()
            .is_authorization());
        assert!(RemoteVaultStore::check_status(StatusCode::OK).is_ok());
    }
}
