#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ReaperError`)
//! - [`labels`]: Session label sets and the negotiation filter expression
//! - [`host`]: Engine control-socket resolution
//! - [`request`]: Watchdog container request (`ContainerRequest`, `ReaperOptions`)
//! - [`provider`]: Provisioning capability (`ReaperProvider`, `ProvisionedContainer`)
//! - [`reaper`]: Coordinator handle and registry (`Reaper`, `ReaperRegistry`)
//! - [`handshake`]: Control connection and teardown arming (`HandshakeHandle`)
//! - [`event`]: Cleanup diagnostics (`CleanupEvent`, `CleanupEventKind`)
//!
//! # Architecture
//!
//! ```text
//! ReaperRegistry::get_or_create()
//!        |
//!   resolve socket ── build request ── provider.run_container()
//!        |
//!   Reaper (endpoint) ── connect() ──> handshake task
//!                                        |  filter ─> "ACK\n"
//!                                        |  armed until HandshakeHandle
//!                                        v  signals termination
//!                                   connection closed = teardown
//! ```

pub mod error;
pub mod event;
pub mod handshake;
pub mod host;
pub mod labels;
pub mod provider;
pub mod reaper;
pub mod request;

// --- Public API Re-exports ---

// Coordinator handle and registry
pub use reaper::{Reaper, ReaperRegistry};

// Handshake
pub use handshake::HandshakeHandle;

// Provisioning capability
pub use provider::{ProviderConfig, ProvisionedContainer, ReaperProvider};

// Request
pub use request::{BindMount, ContainerRequest, NetworkMode, ReaperOptions, WaitStrategy};

// Errors
pub use error::ReaperError;

// Events
pub use event::{CleanupEvent, CleanupEventKind};

// Labels
pub use labels::{filter_expression, reaper_labels, session_labels};
