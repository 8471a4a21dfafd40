//! ABI bindings and typed access to the two voting contracts.
//!
//! The public and private systems share most of their surface; the private
//! contract adds a whitelist signer per poll and a six-argument `metaVote`.
//! Only the calls the relay consumes are bound here.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, Revert, SolCall, SolError};
use tracing::instrument;

use metavote_types::{Candidate, PollKind, PollSnapshot, VoteIntent, WhitelistApproval};

use crate::client::EvmClient;
use crate::error::ChainError;

sol! {
    interface PublicVoting {
        function vote(uint256 pollId, uint16 candidateId) external;
        function metaVote(uint256 pollId, uint16 candidateId, address voter, bytes signature) external;
        function getPollDetails(uint256 pollId) external view returns (string title, address creator, uint64 endTime, uint16 candidateCount, uint64 voterCount, uint64 maxVoters);
        function getCandidate(uint256 pollId, uint16 candidateId) external view returns (string name, uint64 voteCount);
        function hasVoted(uint256 pollId, address voter) external view returns (bool voted);
        function getPollCount() external view returns (uint256 count);
        function relayerAllowance(address funder, address relayer) external view returns (uint256 allowance);
        function authorizedRelayers(address relayer) external view returns (bool authorized);
    }

    interface PrivateVoting {
        function vote(uint256 pollId, uint16 candidateId, uint256 expiry, bytes whitelistSignature) external;
        function metaVote(uint256 pollId, uint16 candidateId, address voter, uint256 expiry, bytes whitelistSignature, bytes voteSignature) external;
        function polls(uint256 pollId) external view returns (string title, address creator, uint64 endTime, uint16 candidateCount, uint64 voterCount, uint64 maxVoters, address whitelistSigner);
        function getPollDetails(uint256 pollId) external view returns (string title, address creator, uint64 endTime, uint16 candidateCount, uint64 voterCount, uint64 maxVoters);
        function getCandidate(uint256 pollId, uint16 candidateId) external view returns (string name, uint64 voteCount);
        function hasVoted(uint256 pollId, address voter) external view returns (bool voted);
        function getPollsCount() external view returns (uint256 count);
        function relayerAllowance(address funder, address relayer) external view returns (uint256 allowance);
        function authorizedRelayers(address relayer) external view returns (bool authorized);
    }
}

/// Decode the standard `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    Revert::abi_decode(data).ok().map(|r| r.reason)
}

/// Turn an execution error from `eth_call`/`eth_estimateGas` into a
/// [`ChainError::Reverted`] with the decoded reason where possible.
fn map_execution_error(error: ChainError) -> ChainError {
    if let ChainError::Rpc {
        ref message,
        ref data,
        ..
    } = error
    {
        if error.is_revert() {
            let reason = data
                .as_deref()
                .and_then(|hex_data| hex::decode(hex_data.trim_start_matches("0x")).ok())
                .and_then(|bytes| decode_revert_reason(&bytes))
                .unwrap_or_else(|| message.clone());
            return ChainError::Reverted(reason);
        }
    }
    error
}

/// Typed handle on one deployed voting contract.
#[derive(Clone)]
pub struct VotingContract {
    kind: PollKind,
    address: Address,
    client: EvmClient,
}

impl VotingContract {
    pub fn new(kind: PollKind, address: Address, client: EvmClient) -> Self {
        Self {
            kind,
            address,
            client,
        }
    }

    pub fn kind(&self) -> PollKind {
        self.kind
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read_call(&self, calldata: Vec<u8>) -> Result<Bytes, ChainError> {
        self.client
            .call(self.address, &Bytes::from(calldata))
            .await
            .map_err(map_execution_error)
    }

    /// Fetch the poll's current on-chain state.
    ///
    /// Private polls are read through `polls(...)` to obtain the whitelist
    /// signer, which `getPollDetails` does not expose.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn poll_snapshot(&self, poll_id: U256) -> Result<PollSnapshot, ChainError> {
        match self.kind {
            PollKind::Public => {
                let data = PublicVoting::getPollDetailsCall { pollId: poll_id }.abi_encode();
                let raw = self.read_call(data).await?;
                let ret = PublicVoting::getPollDetailsCall::abi_decode_returns(&raw)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
                Ok(PollSnapshot {
                    title: ret.title,
                    creator: ret.creator,
                    end_time: ret.endTime,
                    candidate_count: ret.candidateCount,
                    voter_count: ret.voterCount,
                    max_voters: ret.maxVoters,
                    whitelist_signer: None,
                })
            }
            PollKind::Private => {
                let data = PrivateVoting::pollsCall { pollId: poll_id }.abi_encode();
                let raw = self.read_call(data).await?;
                let ret = PrivateVoting::pollsCall::abi_decode_returns(&raw)
                    .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
                Ok(PollSnapshot {
                    title: ret.title,
                    creator: ret.creator,
                    end_time: ret.endTime,
                    candidate_count: ret.candidateCount,
                    voter_count: ret.voterCount,
                    max_voters: ret.maxVoters,
                    whitelist_signer: Some(ret.whitelistSigner),
                })
            }
        }
    }

    pub async fn candidate(
        &self,
        poll_id: U256,
        candidate_id: u16,
    ) -> Result<Candidate, ChainError> {
        let data = PublicVoting::getCandidateCall {
            pollId: poll_id,
            candidateId: candidate_id,
        }
        .abi_encode();
        let raw = self.read_call(data).await?;
        let ret = PublicVoting::getCandidateCall::abi_decode_returns(&raw)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;
        Ok(Candidate {
            name: ret.name,
            vote_count: ret.voteCount,
        })
    }

    pub async fn poll_count(&self) -> Result<U256, ChainError> {
        // The two contracts disagree on the getter name.
        let data = match self.kind {
            PollKind::Public => PublicVoting::getPollCountCall {}.abi_encode(),
            PollKind::Private => PrivateVoting::getPollsCountCall {}.abi_encode(),
        };
        let raw = self.read_call(data).await?;
        let count = match self.kind {
            PollKind::Public => PublicVoting::getPollCountCall::abi_decode_returns(&raw),
            PollKind::Private => PrivateVoting::getPollsCountCall::abi_decode_returns(&raw),
        };
        count.map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    pub async fn has_voted(&self, poll_id: U256, voter: Address) -> Result<bool, ChainError> {
        let data = PublicVoting::hasVotedCall {
            pollId: poll_id,
            voter,
        }
        .abi_encode();
        let raw = self.read_call(data).await?;
        PublicVoting::hasVotedCall::abi_decode_returns(&raw)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    /// The funder's general-pool allowance (`relayer == address(0)`).
    pub async fn relayer_allowance(&self, funder: Address) -> Result<U256, ChainError> {
        let data = PublicVoting::relayerAllowanceCall {
            funder,
            relayer: Address::ZERO,
        }
        .abi_encode();
        let raw = self.read_call(data).await?;
        PublicVoting::relayerAllowanceCall::abi_decode_returns(&raw)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    pub async fn is_authorized_relayer(&self, relayer: Address) -> Result<bool, ChainError> {
        let data = PublicVoting::authorizedRelayersCall { relayer }.abi_encode();
        let raw = self.read_call(data).await?;
        PublicVoting::authorizedRelayersCall::abi_decode_returns(&raw)
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))
    }

    /// Calldata for the meta-vote relaying `intent`.
    ///
    /// For private polls the whitelist approval rides along; the contract
    /// re-verifies both signatures on-chain.
    pub fn meta_vote_calldata(
        &self,
        intent: &VoteIntent,
        approval: Option<&WhitelistApproval>,
    ) -> Bytes {
        let data = match (self.kind, approval) {
            (PollKind::Public, _) => PublicVoting::metaVoteCall {
                pollId: intent.poll_id,
                candidateId: intent.candidate_id,
                voter: intent.voter,
                signature: intent.signature.clone(),
            }
            .abi_encode(),
            (PollKind::Private, Some(approval)) => PrivateVoting::metaVoteCall {
                pollId: intent.poll_id,
                candidateId: intent.candidate_id,
                voter: intent.voter,
                expiry: U256::from(approval.expiry),
                whitelistSignature: approval.signature.clone(),
                voteSignature: intent.signature.clone(),
            }
            .abi_encode(),
            // A private relay without an approval cannot pass the contract's
            // own whitelist check; the validator rejects long before this.
            (PollKind::Private, None) => PrivateVoting::metaVoteCall {
                pollId: intent.poll_id,
                candidateId: intent.candidate_id,
                voter: intent.voter,
                expiry: U256::ZERO,
                whitelistSignature: Bytes::new(),
                voteSignature: intent.signature.clone(),
            }
            .abi_encode(),
        };
        Bytes::from(data)
    }

    /// Gas estimate for a meta-vote, with reverts decoded.
    pub async fn estimate_meta_vote(
        &self,
        from: Address,
        calldata: &Bytes,
    ) -> Result<u64, ChainError> {
        self.client
            .estimate_gas(from, self.address, calldata)
            .await
            .map_err(map_execution_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_transport::NullTransport;
    use alloy_primitives::keccak256;
    use alloy_sol_types::SolValue;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn meta_vote_selectors_match_signatures() {
        let public = keccak256("metaVote(uint256,uint16,address,bytes)".as_bytes());
        assert_eq!(PublicVoting::metaVoteCall::SELECTOR, public[..4]);

        let private = keccak256("metaVote(uint256,uint16,address,uint256,bytes,bytes)".as_bytes());
        assert_eq!(PrivateVoting::metaVoteCall::SELECTOR, private[..4]);
    }

    #[test]
    fn read_selectors_match_signatures() {
        let details = keccak256("getPollDetails(uint256)".as_bytes());
        assert_eq!(PublicVoting::getPollDetailsCall::SELECTOR, details[..4]);

        let voted = keccak256("hasVoted(uint256,address)".as_bytes());
        assert_eq!(PublicVoting::hasVotedCall::SELECTOR, voted[..4]);

        let allowance = keccak256("relayerAllowance(address,address)".as_bytes());
        assert_eq!(PublicVoting::relayerAllowanceCall::SELECTOR, allowance[..4]);
    }

    #[test]
    fn revert_reason_round_trip() {
        let encoded = Revert { reason: "already voted".into() }.abi_encode();
        assert_eq!(decode_revert_reason(&encoded).unwrap(), "already voted");
        assert!(decode_revert_reason(&[0u8; 8]).is_none());
    }

    #[test]
    fn execution_error_mapping_decodes_reason() {
        let encoded = Revert { reason: "poll ended".into() }.abi_encode();
        let error = ChainError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some(format!("0x{}", hex::encode(encoded))),
        };
        match map_execution_error(error) {
            ChainError::Reverted(reason) => assert_eq!(reason, "poll ended"),
            other => panic!("expected revert, got {other:?}"),
        }
    }

    fn contract(kind: PollKind, transport: Arc<NullTransport>) -> VotingContract {
        VotingContract::new(
            kind,
            Address::repeat_byte(0x42),
            EvmClient::new(transport),
        )
    }

    #[tokio::test]
    async fn decodes_public_poll_snapshot() {
        let transport = Arc::new(NullTransport::new());
        let creator = Address::repeat_byte(0x07);
        let ret = (
            "budget 2026".to_string(),
            creator,
            1_800_000_000u64,
            3u16,
            5u64,
            100u64,
        )
            .abi_encode_params();
        transport.respond("eth_call", json!(format!("0x{}", hex::encode(ret))));

        let snapshot = contract(PollKind::Public, transport)
            .poll_snapshot(U256::from(1))
            .await
            .unwrap();
        assert_eq!(snapshot.title, "budget 2026");
        assert_eq!(snapshot.creator, creator);
        assert_eq!(snapshot.voter_count, 5);
        assert!(snapshot.whitelist_signer.is_none());
    }

    #[tokio::test]
    async fn decodes_private_poll_snapshot_with_signer() {
        let transport = Arc::new(NullTransport::new());
        let signer = Address::repeat_byte(0x09);
        let ret = (
            "board seat".to_string(),
            Address::repeat_byte(0x07),
            1_800_000_000u64,
            2u16,
            0u64,
            10u64,
            signer,
        )
            .abi_encode_params();
        transport.respond("eth_call", json!(format!("0x{}", hex::encode(ret))));

        let snapshot = contract(PollKind::Private, transport)
            .poll_snapshot(U256::from(7))
            .await
            .unwrap();
        assert_eq!(snapshot.whitelist_signer, Some(signer));
    }

    #[tokio::test]
    async fn decodes_has_voted() {
        let transport = Arc::new(NullTransport::new());
        transport.respond(
            "eth_call",
            json!(format!("0x{}", hex::encode(true.abi_encode()))),
        );
        assert!(contract(PollKind::Public, transport)
            .has_voted(U256::from(1), Address::ZERO)
            .await
            .unwrap());
    }
}
