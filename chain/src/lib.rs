//! Chain access for the relay.
//!
//! Everything the relay knows about the chain flows through the
//! [`RpcTransport`] trait: a reqwest-backed JSON-RPC client in production,
//! a scripted [`NullTransport`] in tests. On top of the transport sit the
//! typed eth_* calls ([`EvmClient`]), the voting-contract bindings
//! ([`VotingContract`]), fee planning, and EIP-1559 transaction assembly.

pub mod client;
pub mod contracts;
pub mod error;
pub mod fees;
pub mod null_transport;
pub mod transport;
pub mod tx;

pub use client::{EvmClient, TxReceipt};
pub use contracts::{decode_revert_reason, VotingContract};
pub use error::ChainError;
pub use fees::{plan_gas, FeeData};
pub use null_transport::NullTransport;
pub use transport::{HttpTransport, RpcTransport};
pub use tx::build_signed_tx;
