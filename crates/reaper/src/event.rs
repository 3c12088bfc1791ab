//! Cleanup lifecycle events.
//!
//! [`CleanupEvent`] is the structured diagnostic surface of the handshake:
//! negotiation outcomes are never returned to the caller, so they are made
//! observable here instead. Events are delivered over an optional
//! best-effort channel configured through
//! [`ReaperOptions::diagnostics_sender`](crate::request::ReaperOptions::diagnostics_sender).

use std::fmt;

use serde::{Deserialize, Serialize};

use custodian_core::event::{EVENT_TYPE_CLEANUP, Event, EventMetadata, MODULE_REAPER};
use custodian_core::types::SessionId;

/// Cleanup lifecycle event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupEventKind {
    /// Coordinator acknowledged the session filter
    NegotiationAcknowledged {
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// Every negotiation attempt failed; teardown armed without an
    /// acknowledgement, so cleanup is not guaranteed
    NegotiationExhausted {
        /// Attempts used
        attempts: u32,
    },
    /// Control connection closed, the coordinator-side teardown trigger
    ConnectionClosed,
}

impl fmt::Display for CleanupEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegotiationAcknowledged { attempts } => {
                write!(f, "negotiation_acknowledged({attempts})")
            }
            Self::NegotiationExhausted { attempts } => {
                write!(f, "negotiation_exhausted({attempts})")
            }
            Self::ConnectionClosed => write!(f, "connection_closed"),
        }
    }
}

/// Cleanup lifecycle event.
#[derive(Debug, Clone)]
pub struct CleanupEvent {
    /// Unique event id
    pub id: String,
    /// Event metadata
    pub metadata: EventMetadata,
    /// Session the event belongs to
    pub session_id: SessionId,
    /// Event kind
    pub kind: CleanupEventKind,
}

impl CleanupEvent {
    /// Creates a cleanup event with a new trace id.
    pub fn new(session_id: SessionId, kind: CleanupEventKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_REAPER),
            session_id,
            kind,
        }
    }

    /// Creates a cleanup event linked to an existing trace.
    pub fn with_trace(
        session_id: SessionId,
        kind: CleanupEventKind,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_REAPER, trace_id),
            session_id,
            kind,
        }
    }
}

impl Event for CleanupEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_CLEANUP
    }
}

impl fmt::Display for CleanupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CleanupEvent[{}] session={} kind={}",
            &self.id[..8.min(self.id.len())],
            self.session_id,
            self.kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_display() {
        assert_eq!(
            CleanupEventKind::NegotiationAcknowledged { attempts: 1 }.to_string(),
            "negotiation_acknowledged(1)"
        );
        assert_eq!(
            CleanupEventKind::NegotiationExhausted { attempts: 3 }.to_string(),
            "negotiation_exhausted(3)"
        );
        assert_eq!(
            CleanupEventKind::ConnectionClosed.to_string(),
            "connection_closed"
        );
    }

    #[test]
    fn event_implements_event_trait() {
        let event = CleanupEvent::new(
            SessionId::new("run-1"),
            CleanupEventKind::ConnectionClosed,
        );
        assert_eq!(event.event_type(), "cleanup");
        assert!(!event.event_id().is_empty());
        assert_eq!(event.metadata().source_module, "reaper");
    }

    #[test]
    fn event_with_trace_preserves_trace_id() {
        let event = CleanupEvent::with_trace(
            SessionId::new("run-1"),
            CleanupEventKind::NegotiationAcknowledged { attempts: 2 },
            "trace-7",
        );
        assert_eq!(event.metadata().trace_id, "trace-7");
    }

    #[test]
    fn event_display() {
        let event = CleanupEvent::new(
            SessionId::new("run-1"),
            CleanupEventKind::NegotiationExhausted { attempts: 3 },
        );
        let display = event.to_string();
        assert!(display.contains("session=run-1"));
        assert!(display.contains("negotiation_exhausted(3)"));
    }

    #[test]
    fn event_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CleanupEvent>();
    }
}
