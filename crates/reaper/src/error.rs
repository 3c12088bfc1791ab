//! Reaper error types.
//!
//! [`ReaperError`] covers every failure inside the cleanup coordination
//! subsystem. `From<ReaperError> for CustodianError` is implemented so upper
//! layers can propagate naturally with the `?` operator.

use custodian_core::error::{ConfigError, CoordinatorError, CustodianError};

/// Cleanup coordination domain error.
///
/// Provisioning the watchdog container, discovering its published control
/// endpoint, and dialing that endpoint can each fail; configuration errors
/// round out the set.
#[derive(Debug, thiserror::Error)]
pub enum ReaperError {
    /// Watchdog container provisioning failed
    #[error("provision failed: {0}")]
    Provision(String),

    /// Published endpoint for the control port could not be discovered
    #[error("endpoint discovery failed: {0}")]
    EndpointDiscovery(String),

    /// Dialing the coordinator's control endpoint failed
    ///
    /// Terminal for the connect call that produced it; dial errors are
    /// never retried.
    #[error("connecting to cleanup coordinator on {endpoint} failed: {reason}")]
    Dial {
        /// Target endpoint
        endpoint: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration error
    #[error("config error: {field}: {reason}")]
    Config {
        /// Offending field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl From<ReaperError> for CustodianError {
    fn from(err: ReaperError) -> Self {
        match err {
            ReaperError::Provision(reason) => {
                CustodianError::Coordinator(CoordinatorError::Provision(reason))
            }
            ReaperError::EndpointDiscovery(reason) => {
                CustodianError::Coordinator(CoordinatorError::EndpointDiscovery(reason))
            }
            ReaperError::Dial { endpoint, reason } => {
                CustodianError::Coordinator(CoordinatorError::Dial { endpoint, reason })
            }
            ReaperError::Config { field, reason } => {
                CustodianError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
