//! Metric name constants and description registration.
//!
//! All metric names are defined centrally here. Modules invoke
//! `metrics::counter!()` / `metrics::gauge!()` with these constants.
//!
//! # Naming convention
//!
//! - Prefix: `custodian_`
//! - Module name: `reaper_`
//! - Suffix: `_total` (counter), none (gauge)
//!
//! # Usage
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(custodian_core::metrics::REAPER_NEGOTIATION_ATTEMPTS_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge};

// --- Label key constants ---

/// Result label key (success, failure)
pub const LABEL_RESULT: &str = "result";

// --- Reaper metrics ---

/// Reaper: negotiation attempts sent to the coordinator (counter)
pub const REAPER_NEGOTIATION_ATTEMPTS_TOTAL: &str = "custodian_reaper_negotiation_attempts_total";

/// Reaper: negotiations that exhausted every attempt without an ACK (counter)
pub const REAPER_NEGOTIATION_FAILURES_TOTAL: &str = "custodian_reaper_negotiation_failures_total";

/// Reaper: handshake sessions that reached the armed state (counter)
pub const REAPER_HANDSHAKES_ARMED_TOTAL: &str = "custodian_reaper_handshakes_armed_total";

/// Reaper: currently open control connections (gauge)
pub const REAPER_ACTIVE_HANDSHAKES: &str = "custodian_reaper_active_handshakes";

/// Registers descriptions for every Custodian metric.
///
/// Call once at startup, after the metrics recorder is installed.
pub fn describe_metrics() {
    describe_counter!(
        REAPER_NEGOTIATION_ATTEMPTS_TOTAL,
        "Negotiation attempts sent to the cleanup coordinator"
    );
    describe_counter!(
        REAPER_NEGOTIATION_FAILURES_TOTAL,
        "Negotiations that exhausted every attempt without an acknowledgement"
    );
    describe_counter!(
        REAPER_HANDSHAKES_ARMED_TOTAL,
        "Handshake sessions that reached the armed state"
    );
    describe_gauge!(
        REAPER_ACTIVE_HANDSHAKES,
        "Currently open cleanup coordinator control connections"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_follow_convention() {
        for name in [
            REAPER_NEGOTIATION_ATTEMPTS_TOTAL,
            REAPER_NEGOTIATION_FAILURES_TOTAL,
            REAPER_HANDSHAKES_ARMED_TOTAL,
            REAPER_ACTIVE_HANDSHAKES,
        ] {
            assert!(name.starts_with("custodian_reaper_"));
        }
    }

    #[test]
    fn describe_metrics_is_idempotent() {
        // No recorder installed: describe calls are no-ops and must not panic.
        describe_metrics();
        describe_metrics();
    }
}
