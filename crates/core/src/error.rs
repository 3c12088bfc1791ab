//! Error types -- domain error definitions shared across the workspace.

/// Top-level Custodian error type.
#[derive(Debug, thiserror::Error)]
pub enum CustodianError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Cleanup coordinator error
    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be found
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Configuration parsing failed
    #[error("failed to parse config: {reason}")]
    ParseFailed {
        /// Parser failure description
        reason: String,
    },

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

/// Cleanup coordinator error.
///
/// Covers the lifecycle of the watchdog container and its control connection:
/// provisioning, endpoint discovery, and dialing.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Watchdog container could not be provisioned
    #[error("provision failed: {0}")]
    Provision(String),

    /// Published control-port endpoint could not be discovered
    #[error("endpoint discovery failed: {0}")]
    EndpointDiscovery(String),

    /// Control connection could not be established
    #[error("connecting to cleanup coordinator on {endpoint} failed: {reason}")]
    Dial {
        /// Target endpoint
        endpoint: String,
        /// Underlying failure
        reason: String,
    },
}
