//! Configuration management -- `custodian.toml` parsing and runtime settings.
//!
//! [`CustodianConfig`] is the top-level structure holding every module's
//! settings.
//!
//! # Loading precedence
//! 1. Environment variables (`CUSTODIAN_REAPER_IMAGE=...` form)
//! 2. Configuration file (`custodian.toml`)
//! 3. Defaults (`Default` implementations)
//!
//! The engine-socket override (`CUSTODIAN_DOCKER_SOCKET_OVERRIDE`) is not
//! part of this file; it is read directly by the host resolver so that it
//! always wins over any other source.
//!
//! # Usage
//! ```no_run
//! # async fn example() -> Result<(), custodian_core::error::CustodianError> {
//! use custodian_core::config::CustodianConfig;
//!
//! // Load from file and apply env overrides
//! let config = CustodianConfig::load("custodian.toml").await?;
//!
//! // Parse a TOML string directly
//! let config = CustodianConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CustodianError};

/// Default watchdog container image.
pub const DEFAULT_REAPER_IMAGE: &str = "docker.io/custodian/reaper:0.4.0";

/// Default watchdog control port.
pub const DEFAULT_REAPER_CONTROL_PORT: u16 = 8080;

/// Custodian configuration.
///
/// Represents the top-level structure of a `custodian.toml` file. Each
/// module reads only its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustodianConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Cleanup coordinator settings
    #[serde(default)]
    pub reaper: ReaperConfig,
}

impl CustodianConfig {
    /// Loads configuration from a TOML file and applies env overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CustodianError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file (no env overrides).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CustodianError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CustodianError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CustodianError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CustodianError> {
        toml::from_str(toml_str).map_err(|e| {
            CustodianError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies environment variable overrides.
    ///
    /// Naming rule: `CUSTODIAN_{SECTION}_{FIELD}`, e.g.
    /// `CUSTODIAN_REAPER_IMAGE=docker.io/custodian/reaper:edge`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CUSTODIAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CUSTODIAN_GENERAL_LOG_FORMAT");

        // Reaper
        override_string(&mut self.reaper.image, "CUSTODIAN_REAPER_IMAGE");
        override_u16(
            &mut self.reaper.control_port,
            "CUSTODIAN_REAPER_CONTROL_PORT",
        );
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<(), CustodianError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.reaper.validate()
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Cleanup coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    /// Watchdog container image reference
    pub image: String,
    /// Control port the watchdog listens on inside its container
    pub control_port: u16,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_REAPER_IMAGE.to_owned(),
            control_port: DEFAULT_REAPER_CONTROL_PORT,
        }
    }
}

impl ReaperConfig {
    /// Validates the reaper section.
    pub fn validate(&self) -> Result<(), CustodianError> {
        if self.image.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "reaper.image".to_owned(),
                reason: "image must not be empty".to_owned(),
            }
            .into());
        }
        if self.control_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reaper.control_port".to_owned(),
                reason: "must be non-zero".to_owned(),
            }
            .into());
        }
        Ok(())
    }
}

// --- Environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}
