//! The metavote relay core.
//!
//! Accepts signed vote intents, validates them against live contract state
//! (six ordered checks, no chain write before the last one passes), and
//! broadcasts the corresponding meta-transaction from the relayer account
//! with serialized nonce allocation and bounded retries. Confirmation is
//! tracked off the request path and only logged.

pub mod config;
pub mod error;
pub mod metrics;
pub mod nonce;
pub mod service;
pub mod submitter;
pub mod validator;

pub use config::{ConfigError, RelayConfig};
pub use error::RelayError;
pub use metrics::RelayMetrics;
pub use nonce::{spawn_nonce_manager, NonceHandle};
pub use service::{DepositInfo, PollDetails, PollSummary, RelayReceipt, RelayService};
pub use submitter::{SubmitOutcome, SubmitterConfig, TransactionSubmitter};
pub use validator::{RawVoteRequest, RequestValidator, ValidatedVote};
