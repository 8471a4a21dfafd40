//! Fundamental types for the metavote relay.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: poll snapshots, vote intents, whitelist approvals, gas plans,
//! and timestamps.

pub mod approval;
pub mod gas;
pub mod poll;
pub mod time;
pub mod vote;

pub use approval::{WhitelistApproval, DEFAULT_APPROVAL_TTL_DAYS};
pub use gas::{scale_bps, GasPlan, SpeedTier, RETRY_ESCALATION_BPS};
pub use poll::{Candidate, PollKind, PollSnapshot};
pub use time::{now_unix, SECS_PER_DAY};
pub use vote::VoteIntent;
