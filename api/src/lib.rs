//! HTTP API for the metavote relay.
//!
//! Endpoints:
//! - `POST /vote/public`, `POST /vote/private` — relay a signed vote
//! - `GET /deposits/:contractType/:address` — a funder's gas pool balance
//! - `GET /polls/:contractType`, `GET /polls/:contractType/:pollId`
//! - `GET /health`, `GET /relayer-address`
//! - `GET /metrics` — Prometheus exposition (when enabled)

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{router, ApiServer};
