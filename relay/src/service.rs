//! The assembled relay service.
//!
//! Owns every long-lived component (chain client, contracts, approval
//! store, nonce actor, submitter, validators, metrics) and exposes the
//! operations the HTTP layer calls. All per-request work runs under the
//! configured deadline; a request that cannot finish in time fails with a
//! retryable timeout instead of hanging.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use serde::Serialize;
use tracing::{info, warn};

use metavote_chain::{EvmClient, RpcTransport, VotingContract};
use metavote_store::{
    ApprovalBackend, LocalApprovalStore, RemoteVaultStore, UnionApprovalStore,
};
use metavote_types::{now_unix, Candidate, PollKind, PollSnapshot};
use metavote_utils::ether;

use crate::config::{ConfigError, RelayConfig};
use crate::error::RelayError;
use crate::metrics::RelayMetrics;
use crate::nonce::spawn_nonce_manager;
use crate::submitter::{SubmitterConfig, TransactionSubmitter};
use crate::validator::{RawVoteRequest, RequestValidator};

/// Successful relay response body.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReceipt {
    pub status: &'static str,
    pub message: &'static str,
    pub tx_hash: String,
    /// Estimated gas cost in native-token units (margined).
    pub estimated_gas_cost: String,
    pub nonce: u64,
    pub chain_id: u64,
}

/// A funder's general-pool balance on one contract.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    /// Raw wei, decimal string.
    pub deposits: String,
    pub formatted_deposits: String,
}

/// One poll in a listing.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub id: u64,
    pub title: String,
    pub creator: Address,
    pub end_time: u64,
    pub candidate_count: u16,
    pub voter_count: u64,
    pub max_voters: u64,
    pub is_private: bool,
}

impl PollSummary {
    fn from_snapshot(id: u64, snapshot: &PollSnapshot, kind: PollKind) -> Self {
        Self {
            id,
            title: snapshot.title.clone(),
            creator: snapshot.creator,
            end_time: snapshot.end_time,
            candidate_count: snapshot.candidate_count,
            voter_count: snapshot.voter_count,
            max_voters: snapshot.max_voters,
            is_private: kind == PollKind::Private,
        }
    }
}

/// A poll with its candidate tallies.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDetails {
    pub poll: PollSummary,
    pub candidates: Vec<Candidate>,
}

/// Everything the HTTP layer needs, fully wired.
pub struct RelayService {
    config: RelayConfig,
    public_contract: VotingContract,
    private_contract: VotingContract,
    public_validator: RequestValidator,
    private_validator: RequestValidator,
    submitter: Arc<TransactionSubmitter>,
    store: Arc<UnionApprovalStore>,
    whitelist_signer: Option<PrivateKeySigner>,
    relayer: Address,
    metrics: Arc<RelayMetrics>,
}

fn parse_key(key: &str, name: &'static str) -> Result<PrivateKeySigner, ConfigError> {
    key.parse::<PrivateKeySigner>()
        .map_err(|e| ConfigError::InvalidKey {
            name,
            reason: e.to_string(),
        })
}

impl RelayService {
    /// Wire the service. Must run inside a tokio runtime (the nonce actor
    /// is spawned here).
    pub fn new(config: RelayConfig, transport: Arc<dyn RpcTransport>) -> Result<Self, ConfigError> {
        let signer = parse_key(
            config
                .relayer_key
                .as_deref()
                .ok_or(ConfigError::MissingRelayerKey)?,
            "relayer key",
        )?;
        let whitelist_signer = config
            .whitelist_signer_key
            .as_deref()
            .map(|key| parse_key(key, "whitelist signer key"))
            .transpose()?;

        let client = EvmClient::new(transport);
        let relayer = signer.address();

        let cache = Arc::new(
            LocalApprovalStore::open(&config.approval_cache_path)
                .map_err(|e| ConfigError::Cache(e.to_string()))?,
        );
        let vault = config.vault_url.as_ref().map(|url| {
            Arc::new(RemoteVaultStore::new(url.clone(), config.vault_token.clone()))
                as Arc<dyn ApprovalBackend>
        });
        let store = Arc::new(UnionApprovalStore::new(vault, cache));

        let metrics = Arc::new(RelayMetrics::new());
        let public_contract =
            VotingContract::new(PollKind::Public, config.public_contract, client.clone());
        let private_contract =
            VotingContract::new(PollKind::Private, config.private_contract, client.clone());

        let nonces = spawn_nonce_manager(client.clone(), relayer);
        let submitter = Arc::new(TransactionSubmitter::new(
            client.clone(),
            signer,
            config.chain_id,
            nonces,
            SubmitterConfig::from(&config),
            Arc::clone(&metrics),
        ));

        let balance_floor = U256::from(config.relayer_balance_floor_wei);
        let public_validator = RequestValidator::new(
            public_contract.clone(),
            client.clone(),
            Arc::clone(&store),
            relayer,
            config.chain_id,
            balance_floor,
            None,
        );
        let private_validator = RequestValidator::new(
            private_contract.clone(),
            client.clone(),
            Arc::clone(&store),
            relayer,
            config.chain_id,
            balance_floor,
            whitelist_signer.clone(),
        );

        info!(%relayer, chain_id = config.chain_id, "relay service wired");
        Ok(Self {
            config,
            public_contract,
            private_contract,
            public_validator,
            private_validator,
            submitter,
            store,
            whitelist_signer,
            relayer,
            metrics,
        })
    }

    pub fn relayer_address(&self) -> Address {
        self.relayer
    }

    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn approval_store(&self) -> &Arc<UnionApprovalStore> {
        &self.store
    }

    fn contract(&self, kind: PollKind) -> &VotingContract {
        match kind {
            PollKind::Public => &self.public_contract,
            PollKind::Private => &self.private_contract,
        }
    }

    /// Validate and broadcast one vote under the request deadline.
    pub async fn relay_vote(
        &self,
        kind: PollKind,
        raw: RawVoteRequest,
    ) -> Result<RelayReceipt, RelayError> {
        let deadline = Duration::from_secs(self.config.request_timeout_secs);
        let result = match tokio::time::timeout(deadline, self.relay_inner(kind, &raw)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout("request deadline exceeded".into())),
        };
        match &result {
            Ok(receipt) => {
                self.metrics.votes_relayed.inc();
                info!(kind = %kind, tx_hash = %receipt.tx_hash, "vote relayed");
            }
            Err(e) => {
                self.metrics.votes_rejected.inc();
                info!(kind = %kind, code = e.code(), error = %e, "vote rejected");
            }
        }
        result
    }

    async fn relay_inner(
        &self,
        kind: PollKind,
        raw: &RawVoteRequest,
    ) -> Result<RelayReceipt, RelayError> {
        let validator = match kind {
            PollKind::Public => &self.public_validator,
            PollKind::Private => &self.private_validator,
        };
        let validated = validator.validate(raw, now_unix()).await?;

        // The broadcast runs on its own task: a caller that disconnects
        // mid-request cancels validation, but once submission has started
        // the transaction keeps being driven to propagation and tracked.
        let submitter = Arc::clone(&self.submitter);
        let to = self.contract(kind).address();
        let calldata = validated.calldata.clone();
        let plan = validated.plan;
        let outcome = tokio::spawn(async move { submitter.submit(to, calldata, plan).await })
            .await
            .map_err(|e| RelayError::SubmissionFailed {
                attempts: 0,
                detail: format!("submission task failed: {e}"),
            })??;

        Ok(RelayReceipt {
            status: "pending",
            message: "Vote transaction submitted and verified on network",
            tx_hash: format!("{:#x}", outcome.tx_hash),
            estimated_gas_cost: ether(validated.estimated_cost),
            nonce: outcome.nonce,
            chain_id: outcome.chain_id,
        })
    }

    /// Issue and persist approvals for a batch of voters.
    ///
    /// Requires the whitelist-signer key; used by operators seeding a
    /// private poll's whitelist. Each approval expires `ttl_days` from now.
    pub async fn issue_approvals(
        &self,
        poll_id: U256,
        voters: &[Address],
        ttl_days: u64,
    ) -> Result<Vec<metavote_types::WhitelistApproval>, RelayError> {
        let signer = self.whitelist_signer.as_ref().ok_or_else(|| {
            RelayError::Validation(vec!["whitelist signer key is not configured".into()])
        })?;
        let domain = metavote_crypto::signing_domain(
            PollKind::Private,
            self.config.chain_id,
            self.config.private_contract,
        );
        let expiry = now_unix() + ttl_days * metavote_types::SECS_PER_DAY;

        let mut issued = Vec::with_capacity(voters.len());
        for &voter in voters {
            let approval = metavote_crypto::issue_approval(signer, poll_id, voter, expiry, &domain)
                .map_err(|e| {
                    RelayError::Validation(vec![format!("could not issue approval: {e}")])
                })?;
            self.store.put(&approval).await;
            issued.push(approval);
        }
        info!(%poll_id, count = issued.len(), expiry, "issued whitelist approvals");
        Ok(issued)
    }

    /// A funder's general-pool allowance on one contract.
    pub async fn deposits(
        &self,
        kind: PollKind,
        address: Address,
    ) -> Result<DepositInfo, RelayError> {
        let deposits = self.contract(kind).relayer_allowance(address).await?;
        Ok(DepositInfo {
            deposits: deposits.to_string(),
            formatted_deposits: ether(deposits),
        })
    }

    /// Every poll on one contract. Per-poll fetch failures skip that poll
    /// rather than failing the listing.
    pub async fn list_polls(&self, kind: PollKind) -> Result<Vec<PollSummary>, RelayError> {
        let contract = self.contract(kind);
        let count = contract.poll_count().await?;
        let count = u64::try_from(count).unwrap_or(u64::MAX);

        let mut polls = Vec::new();
        for id in 0..count {
            match contract.poll_snapshot(U256::from(id)).await {
                Ok(snapshot) => polls.push(PollSummary::from_snapshot(id, &snapshot, kind)),
                Err(e) => warn!(kind = %kind, poll_id = id, error = %e, "skipping unreadable poll"),
            }
        }
        Ok(polls)
    }

    /// One poll with its candidates.
    pub async fn poll_details(
        &self,
        kind: PollKind,
        poll_id: u64,
    ) -> Result<PollDetails, RelayError> {
        let contract = self.contract(kind);
        let snapshot = contract.poll_snapshot(U256::from(poll_id)).await?;

        let mut candidates = Vec::with_capacity(snapshot.candidate_count as usize);
        for candidate_id in 0..snapshot.candidate_count {
            candidates.push(contract.candidate(U256::from(poll_id), candidate_id).await?);
        }

        Ok(PollDetails {
            poll: PollSummary::from_snapshot(poll_id, &snapshot, kind),
            candidates,
        })
    }
}
