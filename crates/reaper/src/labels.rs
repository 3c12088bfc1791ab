//! Session labels and the negotiation filter expression.
//!
//! Every resource created during a session carries the session label set, so
//! orphans remain identifiable after a crash. The same labels, rendered as a
//! filter expression, are the wire payload of the coordinator handshake: the
//! watchdog destroys whatever matches the filter once the control connection
//! drops.

use std::collections::BTreeMap;

use custodian_core::types::SessionId;

// --- Label key constants ---

/// Membership flag, present (as `"true"`) on every managed resource.
pub const SESSION_LABEL: &str = "io.custodian.session";

/// Session identifier label.
pub const SESSION_ID_LABEL: &str = "io.custodian.session.id";

/// Self-identification flag carried only by the watchdog's own container,
/// so it is recognizable among the resources it watches.
pub const REAPER_LABEL: &str = "io.custodian.session.reaper";

/// Returns the label set identifying a session's resources.
///
/// Pure and deterministic: the same `session_id` always yields the same set,
/// and two sessions differ only in the [`SESSION_ID_LABEL`] entry.
pub fn session_labels(session_id: &SessionId) -> BTreeMap<String, String> {
    BTreeMap::from([
        (SESSION_LABEL.to_owned(), "true".to_owned()),
        (SESSION_ID_LABEL.to_owned(), session_id.to_string()),
    ])
}

/// Returns the label set for the watchdog container itself: the session
/// labels plus the self-identification flag.
pub fn reaper_labels(session_id: &SessionId) -> BTreeMap<String, String> {
    let mut labels = session_labels(session_id);
    labels.insert(REAPER_LABEL.to_owned(), "true".to_owned());
    labels
}

/// Renders a label set as the negotiation filter expression:
/// `label=<key>=<value>` clauses joined with `&`.
///
/// The `BTreeMap` iteration order makes the expression canonical (sorted by
/// key), so equal label sets always produce byte-identical payloads.
pub fn filter_expression(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("label={key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
