//! Vote request validation.
//!
//! Six ordered checks, terminal on the first failure, with every chain
//! write strictly after the last check: structural, poll state, double
//! vote, eligibility (private polls), vote signature, funding. Cheapest
//! checks run first, so a structurally invalid request never touches the
//! chain.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_signer_local::PrivateKeySigner;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use metavote_chain::{plan_gas, EvmClient, VotingContract};
use metavote_crypto::{
    issue_approval, recover_approval_signer, recover_vote_signer, signing_domain,
};
use metavote_store::UnionApprovalStore;
use metavote_types::{
    GasPlan, PollKind, PollSnapshot, SpeedTier, VoteIntent, WhitelistApproval,
    DEFAULT_APPROVAL_TTL_DAYS, SECS_PER_DAY,
};

use crate::error::RelayError;

/// Safety margin on the estimated cost when checking the creator's
/// allowance (+20%).
const COST_MARGIN_BPS: u64 = 12_000;

/// An inbound vote request before any validation.
///
/// Every field is optional so the structural check can report all missing
/// or malformed fields at once rather than only the first.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawVoteRequest {
    pub poll_id: Option<u64>,
    pub candidate_id: Option<u16>,
    pub voter: Option<String>,
    /// Public vote signature.
    pub signature: Option<String>,
    /// Private vote signature.
    pub vote_signature: Option<String>,
    /// Attached whitelist approval (private polls).
    pub expiry: Option<u64>,
    pub whitelist_signature: Option<String>,
    pub speed: Option<SpeedTier>,
}

/// Structurally valid request, parsed into chain types.
#[derive(Clone, Debug)]
struct ParsedVote {
    intent: VoteIntent,
    attached: Option<(u64, Bytes)>,
    speed: SpeedTier,
}

/// The product of a fully validated request, ready for submission.
#[derive(Clone, Debug)]
pub struct ValidatedVote {
    pub intent: VoteIntent,
    pub approval: Option<WhitelistApproval>,
    pub snapshot: PollSnapshot,
    pub calldata: Bytes,
    pub plan: GasPlan,
    pub estimated_cost: U256,
}

/// Validates vote requests against one voting contract.
pub struct RequestValidator {
    contract: VotingContract,
    client: EvmClient,
    store: Arc<UnionApprovalStore>,
    relayer: Address,
    chain_id: u64,
    balance_floor: U256,
    /// Key enabling the creator self-sign convenience, when the relay
    /// operator is a poll's designated whitelist signer.
    whitelist_signer: Option<PrivateKeySigner>,
}

impl RequestValidator {
    pub fn new(
        contract: VotingContract,
        client: EvmClient,
        store: Arc<UnionApprovalStore>,
        relayer: Address,
        chain_id: u64,
        balance_floor: U256,
        whitelist_signer: Option<PrivateKeySigner>,
    ) -> Self {
        Self {
            contract,
            client,
            store,
            relayer,
            chain_id,
            balance_floor,
            whitelist_signer,
        }
    }

    /// Run all six checks. No side effect other than a possible approval
    /// upsert (creator self-sign) happens before this returns.
    #[instrument(skip_all, fields(kind = %self.contract.kind()))]
    pub async fn validate(
        &self,
        raw: &RawVoteRequest,
        now: u64,
    ) -> Result<ValidatedVote, RelayError> {
        // 1. Structural
        let parsed = self.check_structure(raw)?;
        let intent = parsed.intent.clone();

        // 2. Poll state
        let snapshot = self.contract.poll_snapshot(intent.poll_id).await?;
        if snapshot.has_ended(now) {
            return Err(RelayError::PollEnded);
        }
        if snapshot.is_full() {
            return Err(RelayError::CapacityReached);
        }

        // 3. Double vote
        if self.contract.has_voted(intent.poll_id, intent.voter).await? {
            return Err(RelayError::AlreadyVoted);
        }

        // 4. Eligibility (private polls only)
        let approval = match self.contract.kind() {
            PollKind::Public => None,
            PollKind::Private => Some(self.check_eligibility(&parsed, &snapshot, now).await?),
        };

        // 5. Vote signature
        let vote_domain =
            signing_domain(self.contract.kind(), self.chain_id, self.contract.address());
        match recover_vote_signer(
            intent.poll_id,
            intent.candidate_id,
            intent.voter,
            &intent.signature,
            &vote_domain,
        ) {
            Ok((_, scheme)) => debug!(?scheme, voter = %intent.voter, "vote signature verified"),
            Err(e) => {
                info!(voter = %intent.voter, error = %e, "rejecting vote with bad signature");
                return Err(RelayError::InvalidSignature);
            }
        }

        // 6. Funding
        let (calldata, plan, estimated_cost) = self
            .check_funding(&intent, approval.as_ref(), &snapshot, parsed.speed)
            .await?;

        Ok(ValidatedVote {
            intent,
            approval,
            snapshot,
            calldata,
            plan,
            estimated_cost,
        })
    }

    /// Check field presence and shape, reporting every fault.
    fn check_structure(&self, raw: &RawVoteRequest) -> Result<ParsedVote, RelayError> {
        let mut faults = Vec::new();

        if raw.poll_id.is_none() {
            faults.push("pollId is required".to_string());
        }
        if raw.candidate_id.is_none() {
            faults.push("candidateId is required".to_string());
        }

        let voter = match &raw.voter {
            None => {
                faults.push("voter is required".to_string());
                None
            }
            Some(s) => match Address::from_str(s) {
                Ok(address) => Some(address),
                Err(_) => {
                    faults.push(format!("voter is not a valid address: {s}"));
                    None
                }
            },
        };

        let signature_field = match self.contract.kind() {
            PollKind::Public => ("signature", &raw.signature),
            PollKind::Private => ("voteSignature", &raw.vote_signature),
        };
        let signature = match signature_field.1 {
            None => {
                faults.push(format!("{} is required", signature_field.0));
                None
            }
            Some(s) => match parse_signature_hex(s) {
                Ok(bytes) => Some(bytes),
                Err(reason) => {
                    faults.push(format!("{} {reason}", signature_field.0));
                    None
                }
            },
        };

        let attached = if self.contract.kind() == PollKind::Private {
            match (&raw.expiry, &raw.whitelist_signature) {
                (None, None) => None,
                (Some(_), None) => {
                    faults.push("expiry provided without whitelistSignature".to_string());
                    None
                }
                (None, Some(_)) => {
                    faults.push("whitelistSignature provided without expiry".to_string());
                    None
                }
                (Some(expiry), Some(sig)) => match parse_signature_hex(sig) {
                    Ok(bytes) => Some((*expiry, bytes)),
                    Err(reason) => {
                        faults.push(format!("whitelistSignature {reason}"));
                        None
                    }
                },
            }
        } else {
            None
        };

        if !faults.is_empty() {
            return Err(RelayError::Validation(faults));
        }

        Ok(ParsedVote {
            intent: VoteIntent {
                poll_id: U256::from(raw.poll_id.expect("checked above")),
                candidate_id: raw.candidate_id.expect("checked above"),
                voter: voter.expect("checked above"),
                signature: signature.expect("checked above"),
            },
            attached,
            speed: raw.speed.unwrap_or_default(),
        })
    }

    /// Resolve and verify a whitelist approval for a private vote.
    async fn check_eligibility(
        &self,
        parsed: &ParsedVote,
        snapshot: &PollSnapshot,
        now: u64,
    ) -> Result<WhitelistApproval, RelayError> {
        let intent = &parsed.intent;
        let expected_signer = snapshot
            .whitelist_signer
            .ok_or(RelayError::InvalidWhitelistSignature)?;
        let domain = signing_domain(PollKind::Private, self.chain_id, self.contract.address());

        let (expiry, signature) = match &parsed.attached {
            Some((expiry, signature)) => (*expiry, signature.clone()),
            None => match self.store.get(intent.poll_id, intent.voter, now).await {
                Some(stored) => (stored.expiry, stored.signature),
                None => {
                    // The poll creator is implicitly eligible. When this
                    // relay holds the poll's whitelist-signer key it can
                    // mint the approval on demand; otherwise the creator
                    // must present one like everyone else; the contract
                    // enforces the whitelist either way.
                    let self_signable = intent.voter == snapshot.creator
                        && self
                            .whitelist_signer
                            .as_ref()
                            .is_some_and(|k| k.address() == expected_signer);
                    if !self_signable {
                        return Err(RelayError::NotWhitelisted);
                    }
                    let key = self.whitelist_signer.as_ref().expect("checked above");
                    let expiry = now + DEFAULT_APPROVAL_TTL_DAYS * SECS_PER_DAY;
                    let approval =
                        issue_approval(key, intent.poll_id, intent.voter, expiry, &domain)
                            .map_err(|_| RelayError::NotWhitelisted)?;
                    info!(voter = %intent.voter, expiry, "self-signed creator approval");
                    self.store.put(&approval).await;
                    (approval.expiry, approval.signature)
                }
            },
        };

        let recovered = recover_approval_signer(
            intent.poll_id,
            intent.voter,
            expiry,
            &signature,
            &domain,
        )
        .map_err(|_| RelayError::InvalidWhitelistSignature)?;
        if recovered != expected_signer {
            info!(
                %recovered,
                expected = %expected_signer,
                "whitelist approval signed by the wrong key"
            );
            return Err(RelayError::InvalidWhitelistSignature);
        }
        if expiry <= now {
            return Err(RelayError::WhitelistExpired);
        }

        Ok(WhitelistApproval {
            poll_id: intent.poll_id,
            voter: intent.voter,
            expiry,
            signature,
            signer: recovered,
        })
    }

    /// Check economics: relayer floor, relayer authorization, gas estimate,
    /// and the creator's allowance against the margined cost.
    async fn check_funding(
        &self,
        intent: &VoteIntent,
        approval: Option<&WhitelistApproval>,
        snapshot: &PollSnapshot,
        speed: SpeedTier,
    ) -> Result<(Bytes, GasPlan, U256), RelayError> {
        let balance = self.client.balance(self.relayer).await?;
        if balance < self.balance_floor {
            return Err(RelayError::RelayerUnderfunded {
                balance,
                floor: self.balance_floor,
            });
        }

        if !self.contract.is_authorized_relayer(self.relayer).await? {
            return Err(RelayError::RelayerUnauthorized);
        }

        let calldata = self.contract.meta_vote_calldata(intent, approval);
        let estimated_gas = self
            .contract
            .estimate_meta_vote(self.relayer, &calldata)
            .await?;
        let fees = self.client.fee_data().await?;
        let plan = plan_gas(estimated_gas, &fees, speed)?;

        let estimated_cost =
            plan.max_cost() * U256::from(COST_MARGIN_BPS) / U256::from(10_000u64);
        let allowance = self.contract.relayer_allowance(snapshot.creator).await?;
        if allowance < estimated_cost {
            return Err(RelayError::InsufficientAllowance {
                required: estimated_cost,
                available: allowance,
            });
        }

        debug!(
            gas_limit = plan.gas_limit,
            %estimated_cost,
            %allowance,
            "funding checks passed"
        );
        Ok((calldata, plan, estimated_cost))
    }
}

/// Signatures arrive as 0x-prefixed hex.
fn parse_signature_hex(s: &str) -> Result<Bytes, String> {
    if !s.starts_with("0x") {
        return Err("must be 0x-prefixed hex".to_string());
    }
    Bytes::from_str(s).map_err(|_| "is not valid hex".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;
    use metavote_chain::NullTransport;
    use metavote_store::LocalApprovalStore;
    use serde_json::json;

    // Validator construction for structural tests; the transport carries no
    // scripted responses, so any chain call would error loudly.
    fn bare_validator(kind: PollKind) -> (Arc<NullTransport>, RequestValidator, tempfile::TempDir) {
        let transport = Arc::new(NullTransport::new());
        let client = EvmClient::new(transport.clone());
        let contract = VotingContract::new(kind, Address::repeat_byte(0x42), client.clone());
        let dir = tempfile::tempdir().unwrap();
        let cache =
            Arc::new(LocalApprovalStore::open(dir.path().join("approvals.json")).unwrap());
        let store = Arc::new(UnionApprovalStore::local_only(cache));
        let validator = RequestValidator::new(
            contract,
            client,
            store,
            Address::repeat_byte(0x99),
            137,
            U256::from(100_000_000_000_000_000u128),
            None,
        );
        (transport, validator, dir)
    }

    #[tokio::test]
    async fn structural_faults_are_aggregated_and_local() {
        let (transport, validator, _dir) = bare_validator(PollKind::Public);
        let raw = RawVoteRequest {
            poll_id: None,
            candidate_id: Some(2),
            voter: Some("not-an-address".into()),
            signature: Some("ab".into()),
            ..Default::default()
        };

        let err = validator.validate(&raw, 1_000).await.unwrap_err();
        match err {
            RelayError::Validation(faults) => {
                assert_eq!(faults.len(), 3);
                assert!(faults.iter().any(|f| f.contains("pollId")));
                assert!(faults.iter().any(|f| f.contains("voter")));
                assert!(faults.iter().any(|f| f.contains("signature")));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        // Cheapest check first: no chain call was made.
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn private_requires_paired_whitelist_fields() {
        let (transport, validator, _dir) = bare_validator(PollKind::Private);
        let raw = RawVoteRequest {
            poll_id: Some(7),
            candidate_id: Some(1),
            voter: Some(format!("{:#x}", Address::repeat_byte(0x05))),
            vote_signature: Some(format!("0x{}", "ab".repeat(65))),
            expiry: Some(2_000),
            whitelist_signature: None,
            ..Default::default()
        };

        let err = validator.validate(&raw, 1_000).await.unwrap_err();
        match err {
            RelayError::Validation(faults) => {
                assert!(faults[0].contains("whitelistSignature"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn ended_poll_is_rejected_before_has_voted() {
        let (transport, validator, _dir) = bare_validator(PollKind::Public);
        let ret = (
            "old poll".to_string(),
            Address::repeat_byte(0x07),
            500u64, // ended long ago
            2u16,
            0u64,
            10u64,
        )
            .abi_encode_params();
        transport.enqueue("eth_call", json!(format!("0x{}", hex::encode(ret))));

        let raw = RawVoteRequest {
            poll_id: Some(5),
            candidate_id: Some(2),
            voter: Some(format!("{:#x}", Address::repeat_byte(0x05))),
            signature: Some(format!("0x{}", "ab".repeat(65))),
            ..Default::default()
        };
        let err = validator.validate(&raw, 1_000).await.unwrap_err();
        assert_eq!(err.code(), "POLL_ENDED");
        // Only the snapshot fetch happened.
        assert_eq!(transport.calls_for("eth_call"), 1);
    }

    #[tokio::test]
    async fn full_poll_is_rejected() {
        let (transport, validator, _dir) = bare_validator(PollKind::Public);
        let ret = (
            "popular poll".to_string(),
            Address::repeat_byte(0x07),
            2_000u64,
            2u16,
            10u64,
            10u64,
        )
            .abi_encode_params();
        transport.enqueue("eth_call", json!(format!("0x{}", hex::encode(ret))));

        let raw = RawVoteRequest {
            poll_id: Some(5),
            candidate_id: Some(2),
            voter: Some(format!("{:#x}", Address::repeat_byte(0x05))),
            signature: Some(format!("0x{}", "ab".repeat(65))),
            ..Default::default()
        };
        let err = validator.validate(&raw, 1_000).await.unwrap_err();
        assert_eq!(err.code(), "CAPACITY_REACHED");
    }

    #[test]
    fn signature_hex_rules() {
        assert!(parse_signature_hex("0xabcd").is_ok());
        assert!(parse_signature_hex("abcd").is_err());
        assert!(parse_signature_hex("0xzz").is_err());
    }
}
