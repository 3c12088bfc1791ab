//! Domain types -- common types shared by the whole workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one logical test run.
///
/// Every resource created during a session is tagged with this id so that
/// orphans remain identifiable after a crash. The id carries no structure;
/// equality is the only meaningful operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an externally supplied session id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random session id (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resolved `host:port` network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint(String);

impl Endpoint {
    /// Wraps an already formatted `host:port` address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Builds an endpoint from separate host and port parts.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self(format!("{host}:{port}"))
    }

    /// Returns the address as a string slice, suitable for dialing.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_generate_is_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn session_id_display_roundtrip() {
        let id = SessionId::new("run-42");
        assert_eq!(id.to_string(), "run-42");
        assert_eq!(SessionId::from("run-42"), id);
    }

    #[test]
    fn endpoint_from_host_port() {
        let endpoint = Endpoint::from_host_port("127.0.0.1", 8080);
        assert_eq!(endpoint.as_str(), "127.0.0.1:8080");
        assert_eq!(endpoint.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<SessionId>();
        assert_send_sync::<Endpoint>();
    }
}
