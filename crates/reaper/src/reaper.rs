//! The cleanup coordinator handle and its registry.
//!
//! [`Reaper`] represents the running watchdog container from the caller's
//! side: the owning session, the resolved control endpoint, and the provider
//! that materialized it. [`ReaperRegistry`] guarantees at most one
//! coordinator per registry; a test harness that owns a single registry for
//! the whole process gets process-wide singleton semantics without hidden
//! globals.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use custodian_core::config::ReaperConfig;
use custodian_core::types::{Endpoint, SessionId};

use crate::error::ReaperError;
use crate::event::CleanupEvent;
use crate::handshake::{self, HandshakeHandle};
use crate::host;
use crate::labels;
use crate::provider::{ProvisionedContainer, ReaperProvider};
use crate::request::{self, ReaperOptions};

/// Client-side handle to the running cleanup coordinator.
///
/// Immutable after construction and safe for unsynchronized concurrent
/// reads. The coordinator outlives individual test sessions; nothing in
/// this subsystem ever tears it down.
pub struct Reaper<P: ReaperProvider> {
    provider: Arc<P>,
    session_id: SessionId,
    endpoint: Endpoint,
    diagnostics: Option<mpsc::Sender<CleanupEvent>>,
}

impl<P: ReaperProvider> Reaper<P> {
    /// Session the coordinator was created for.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Published control endpoint of the watchdog container.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Provider the coordinator was materialized with.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Labels to apply to every resource this coordinator should clean up.
    pub fn labels(&self) -> BTreeMap<String, String> {
        labels::session_labels(&self.session_id)
    }

    /// Opens the control connection and arms teardown.
    ///
    /// Returns as soon as the connection is established; the label-filter
    /// negotiation runs on a background task. Signaling the returned
    /// [`HandshakeHandle`] closes the connection and thereby triggers
    /// coordinator-side teardown.
    ///
    /// # Errors
    ///
    /// Returns [`ReaperError::Dial`] when the endpoint cannot be reached
    /// within the dial timeout. Dial errors are never retried.
    pub async fn connect(&self) -> Result<HandshakeHandle, ReaperError> {
        handshake::connect(
            &self.endpoint,
            self.labels(),
            &self.session_id,
            self.diagnostics.clone(),
        )
        .await
    }
}

impl<P: ReaperProvider> fmt::Debug for Reaper<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaper")
            .field("session_id", &self.session_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Registry guaranteeing at most one cleanup coordinator.
///
/// The first successful [`get_or_create`](Self::get_or_create) call creates
/// and caches the coordinator; every later call returns the cached instance
/// unchanged, even when invoked with a different session id, provider, or
/// options. That reuse-without-validation is part of the contract: the
/// coordinator belongs to whichever session created it first.
pub struct ReaperRegistry<P: ReaperProvider> {
    config: ReaperConfig,
    slot: Mutex<Option<Arc<Reaper<P>>>>,
}

impl<P: ReaperProvider> ReaperRegistry<P> {
    /// Creates an empty registry with default reaper settings.
    pub fn new() -> Self {
        Self::with_config(ReaperConfig::default())
    }

    /// Creates an empty registry with explicit reaper settings.
    pub fn with_config(config: ReaperConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached coordinator, creating it on first call.
    ///
    /// Creation resolves the engine socket, assembles the watchdog request,
    /// runs the container through `provider` (which awaits the readiness
    /// strategy), and looks up the published control endpoint. Any failure
    /// aborts with nothing cached, so the next caller retries from scratch.
    ///
    /// # Errors
    ///
    /// - [`ReaperError::Provision`]: the watchdog container could not be
    ///   started or did not become ready
    /// - [`ReaperError::EndpointDiscovery`]: the control port has no
    ///   published endpoint
    pub async fn get_or_create(
        &self,
        session_id: SessionId,
        provider: Arc<P>,
        options: ReaperOptions,
    ) -> Result<Arc<Reaper<P>>, ReaperError> {
        let mut slot = self.slot.lock().await;
        if let Some(reaper) = slot.as_ref() {
            debug!(
                session_id = %reaper.session_id,
                "reusing existing cleanup coordinator"
            );
            return Ok(Arc::clone(reaper));
        }

        let host_socket = host::resolve_host_socket(options.docker_host.as_deref());
        let request = request::reaper_request(
            &session_id,
            &host_socket,
            provider.config(),
            provider.default_network(),
            &self.config,
            &options,
        );
        info!(
            image = %request.image,
            session_id = %session_id,
            "starting cleanup coordinator container"
        );

        let container = provider.run_container(request).await?;
        let endpoint = container.port_endpoint(self.config.control_port).await?;
        info!(endpoint = %endpoint, "cleanup coordinator ready");

        let reaper = Arc::new(Reaper {
            provider,
            session_id,
            endpoint,
            diagnostics: options.diagnostics,
        });
        *slot = Some(Arc::clone(&reaper));
        Ok(reaper)
    }
}

impl<P: ReaperProvider> Default for ReaperRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
