#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod types;

// --- Main type re-exports ---
// The core types of each module are usable straight from the crate root.

// Errors
pub use error::{ConfigError, CoordinatorError, CustodianError};

// Configuration
pub use config::CustodianConfig;

// Events
pub use event::{Event, EventMetadata};

// Domain types
pub use types::{Endpoint, SessionId};
