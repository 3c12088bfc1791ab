//! Provisioning capability abstraction.
//!
//! The [`ReaperProvider`] trait is the narrow interface through which the
//! watchdog container is materialized. Everything engine-specific (creating
//! the container, pulling its image, attaching networks, probing readiness)
//! lives behind it, so production code can plug in a real engine adapter
//! while tests use an in-process double.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ ReaperRegistry │
//! └───────┬────────┘
//!         │ run_container(request)
//!         ▼
//!  ┌───────────────┐
//!  │ ReaperProvider│ (trait)
//!  └───────┬───────┘
//!          │ port_endpoint(port)
//!          ▼
//!  ┌─────────────────────┐
//!  │ ProvisionedContainer│ (trait)
//!  └─────────────────────┘
//! ```

use std::future::Future;

use serde::{Deserialize, Serialize};

use custodian_core::types::Endpoint;

use crate::error::ReaperError;
use crate::request::ContainerRequest;

/// Global provider settings consumed by the request builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Run the watchdog container in privileged mode.
    pub privileged_reaper: bool,
}

/// A container materialized by a provider.
///
/// The only thing this subsystem needs from a running container is the
/// host-published endpoint of a named internal port.
pub trait ProvisionedContainer: Send + Sync + 'static {
    /// Resolves the published `host:port` endpoint for an internal
    /// container port.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::EndpointDiscovery`] when the port is not
    /// published or the mapping cannot be read.
    fn port_endpoint(
        &self,
        port: u16,
    ) -> impl Future<Output = Result<Endpoint, ReaperError>> + Send;
}

/// The provisioning capability the registry runs the watchdog with.
///
/// A full container provider usually satisfies this as well, so it is
/// pluggable.
pub trait ReaperProvider: Send + Sync + 'static {
    /// Concrete container handle type returned by [`run_container`](Self::run_container).
    type Container: ProvisionedContainer;

    /// Materializes a container from `request` and returns once the
    /// request's readiness strategy is satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::Provision`] when the container cannot be
    /// created, started, or does not become ready.
    fn run_container(
        &self,
        request: ContainerRequest,
    ) -> impl Future<Output = Result<Self::Container, ReaperError>> + Send;

    /// Returns the provider's global settings.
    fn config(&self) -> ProviderConfig;

    /// Optional capability: a provider-managed default network the watchdog
    /// should additionally join.
    ///
    /// Providers without the capability keep the default `None`; the
    /// registry queries this polymorphically instead of inspecting concrete
    /// provider types.
    fn default_network(&self) -> Option<String> {
        None
    }
}
