//! Shared utilities for the metavote relay.

pub mod logging;
pub mod units;

pub use logging::{init_logging, LogFormat};
pub use units::{ether, gwei};
