//! Event system -- the unit of communication between modules.
//!
//! Diagnostic and lifecycle information flows between modules as events.
//! [`EventMetadata`] is the tracing envelope every event carries, and the
//! [`Event`] trait is the interface all event types implement.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// --- Module name constants ---

/// Cleanup coordination module name
pub const MODULE_REAPER: &str = "reaper";

// --- Event type constants ---

/// Cleanup lifecycle event type
pub const EVENT_TYPE_CLEANUP: &str = "cleanup";

/// Event metadata -- tracing information common to every event.
///
/// Carries the creation time, originating module, and a trace id that links
/// events belonging to the same flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Event creation time
    pub timestamp: SystemTime,
    /// Module that produced the event (e.g. "reaper")
    pub source_module: String,
    /// Trace id linking events of the same flow
    pub trace_id: String,
}

impl EventMetadata {
    /// Creates metadata reusing an existing trace id.
    ///
    /// Use this to keep one trace id across a chain of related events.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// Creates metadata with a freshly generated UUID v4 trace id.
    ///
    /// Use this at the start of a new event chain.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// Base trait every event type implements.
///
/// The `Send + Sync + 'static` bound guarantees events can be moved safely
/// through `tokio::mpsc` channels.
pub trait Event: Send + Sync + 'static {
    /// Unique event id (UUID v4)
    fn event_id(&self) -> &str;

    /// Event metadata (timestamp, source_module, trace_id)
    fn metadata(&self) -> &EventMetadata;

    /// Event type name, used for logging and routing
    fn event_type(&self) -> &str;
}

fn unix_timestamp_str(timestamp: SystemTime) -> String {
    match timestamp.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs().to_string(),
        Err(_) => "0".to_owned(),
    }
}
