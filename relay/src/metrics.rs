//! Prometheus metrics for the relay.
//!
//! The [`RelayMetrics`] struct owns a dedicated [`Registry`] that the HTTP
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{register_int_counter_with_registry, Encoder, IntCounter, Opts, Registry};

/// Central collection of relay-level Prometheus metrics.
pub struct RelayMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Total votes accepted and broadcast.
    pub votes_relayed: IntCounter,
    /// Total vote requests rejected before broadcast.
    pub votes_rejected: IntCounter,
    /// Total broadcast attempts beyond the first, across all requests.
    pub submission_retries: IntCounter,
    /// Total submissions that exhausted their retry budget.
    pub submissions_failed: IntCounter,
    /// Total transactions observed confirmed.
    pub confirmations_observed: IntCounter,
    /// Total transactions observed reverted after broadcast.
    pub reverts_observed: IntCounter,
}

impl RelayMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_relayed = register_int_counter_with_registry!(
            Opts::new("metavote_votes_relayed_total", "Votes accepted and broadcast"),
            registry
        )
        .expect("register votes_relayed");

        let votes_rejected = register_int_counter_with_registry!(
            Opts::new(
                "metavote_votes_rejected_total",
                "Vote requests rejected before broadcast"
            ),
            registry
        )
        .expect("register votes_rejected");

        let submission_retries = register_int_counter_with_registry!(
            Opts::new(
                "metavote_submission_retries_total",
                "Broadcast attempts beyond the first"
            ),
            registry
        )
        .expect("register submission_retries");

        let submissions_failed = register_int_counter_with_registry!(
            Opts::new(
                "metavote_submissions_failed_total",
                "Submissions that exhausted their retry budget"
            ),
            registry
        )
        .expect("register submissions_failed");

        let confirmations_observed = register_int_counter_with_registry!(
            Opts::new(
                "metavote_confirmations_observed_total",
                "Transactions observed confirmed"
            ),
            registry
        )
        .expect("register confirmations_observed");

        let reverts_observed = register_int_counter_with_registry!(
            Opts::new(
                "metavote_reverts_observed_total",
                "Transactions observed reverted after broadcast"
            ),
            registry
        )
        .expect("register reverts_observed");

        Self {
            registry,
            votes_relayed,
            votes_rejected,
            submission_retries,
            submissions_failed,
            confirmations_observed,
            reverts_observed,
        }
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_exposition() {
        let metrics = RelayMetrics::new();
        metrics.votes_relayed.inc();
        metrics.votes_rejected.inc_by(2);

        let text = metrics.encode();
        assert!(text.contains("metavote_votes_relayed_total 1"));
        assert!(text.contains("metavote_votes_rejected_total 2"));
    }
}
