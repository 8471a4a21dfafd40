//! Request handlers.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use metavote_relay::{RawVoteRequest, RelayError, RelayService};
use metavote_types::PollKind;

use crate::error::ApiError;

/// `public` / `private` path segments select the contract.
fn parse_contract_type(s: &str) -> Result<PollKind, ApiError> {
    match s {
        "public" => Ok(PollKind::Public),
        "private" => Ok(PollKind::Private),
        other => Err(ApiError(RelayError::Validation(vec![format!(
            "unknown contract type: {other}"
        )]))),
    }
}

fn parse_address(s: &str) -> Result<Address, ApiError> {
    Address::from_str(s).map_err(|_| {
        ApiError(RelayError::Validation(vec![format!(
            "not a valid address: {s}"
        )]))
    })
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn relayer_address(State(service): State<Arc<RelayService>>) -> impl IntoResponse {
    Json(json!({"address": format!("{:#x}", service.relayer_address())}))
}

pub async fn public_vote(
    State(service): State<Arc<RelayService>>,
    Json(raw): Json<RawVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = service.relay_vote(PollKind::Public, raw).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn private_vote(
    State(service): State<Arc<RelayService>>,
    Json(raw): Json<RawVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = service.relay_vote(PollKind::Private, raw).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn deposits(
    State(service): State<Arc<RelayService>>,
    Path((contract_type, address)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_contract_type(&contract_type)?;
    let address = parse_address(&address)?;
    let info = service.deposits(kind, address).await?;
    Ok(Json(info))
}

pub async fn list_polls(
    State(service): State<Arc<RelayService>>,
    Path(contract_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_contract_type(&contract_type)?;
    let polls = service.list_polls(kind).await?;
    Ok(Json(polls))
}

pub async fn poll_details(
    State(service): State<Arc<RelayService>>,
    Path((contract_type, poll_id)): Path<(String, u64)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_contract_type(&contract_type)?;
    let details = service.poll_details(kind, poll_id).await?;
    Ok(Json(details))
}

pub async fn metrics(State(service): State<Arc<RelayService>>) -> impl IntoResponse {
    service.metrics().encode()
}
