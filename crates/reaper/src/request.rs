//! Watchdog container request construction.
//!
//! [`reaper_request`] assembles the full launch specification for the
//! watchdog: image, exposed control port, network placement, the engine
//! socket bind mount, labels, and the readiness strategy. [`ReaperOptions`]
//! carries the per-session knobs (image override, registry credentials,
//! engine URL, diagnostics channel).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use custodian_core::config::{DEFAULT_REAPER_CONTROL_PORT, DEFAULT_REAPER_IMAGE, ReaperConfig};
use custodian_core::types::SessionId;

use crate::event::CleanupEvent;
use crate::labels;
use crate::provider::ProviderConfig;

/// Where the engine control socket is exposed inside the watchdog container.
pub const REAPER_SOCKET_TARGET: &str = "/var/run/docker.sock";

/// Container network placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMode {
    /// Engine-managed bridge network
    #[default]
    Bridge,
    /// Host networking
    Host,
    /// No networking
    None,
}

/// A host path mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Host path
    pub source: String,
    /// Path inside the container
    pub target: String,
    /// Mount read-only
    pub read_only: bool,
}

impl BindMount {
    /// A read-write bind mount.
    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// A read-only bind mount.
    pub fn read_only(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }
}

/// Readiness strategy attached to a request.
///
/// Opaque to this subsystem: the provider interprets and executes it before
/// `run_container` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    /// Block until the container port accepts TCP connections.
    ListeningPort(u16),
}

/// Specification for launching a container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerRequest {
    /// Image reference
    pub image: String,
    /// Deprecated duplicate of `image`; older configuration readers still
    /// consume this field.
    pub reaper_image: String,
    /// Ports exposed by the container, `"<port>/tcp"` form
    pub exposed_ports: Vec<String>,
    /// Network placement
    pub network_mode: NetworkMode,
    /// Additional named networks to join
    pub networks: Vec<String>,
    /// Labels applied to the container
    pub labels: BTreeMap<String, String>,
    /// Bind mounts
    pub mounts: Vec<BindMount>,
    /// Run privileged
    pub privileged: bool,
    /// Remove the container when it exits
    pub auto_remove: bool,
    /// The watchdog must not track this container itself
    pub skip_cleanup: bool,
    /// Credentials for pulling from a private registry
    pub registry_credentials: Option<String>,
    /// Readiness strategy executed by the provider
    pub wait: WaitStrategy,
}

impl Default for ContainerRequest {
    fn default() -> Self {
        Self {
            image: DEFAULT_REAPER_IMAGE.to_owned(),
            reaper_image: DEFAULT_REAPER_IMAGE.to_owned(),
            exposed_ports: vec![format!("{DEFAULT_REAPER_CONTROL_PORT}/tcp")],
            network_mode: NetworkMode::Bridge,
            networks: Vec::new(),
            labels: BTreeMap::new(),
            mounts: Vec::new(),
            privileged: false,
            auto_remove: false,
            skip_cleanup: false,
            registry_credentials: None,
            wait: WaitStrategy::ListeningPort(DEFAULT_REAPER_CONTROL_PORT),
        }
    }
}

/// Per-session options for coordinator creation.
#[derive(Debug, Clone, Default)]
pub struct ReaperOptions {
    pub(crate) image_name: Option<String>,
    pub(crate) registry_credentials: Option<String>,
    pub(crate) docker_host: Option<String>,
    pub(crate) diagnostics: Option<mpsc::Sender<CleanupEvent>>,
}

impl ReaperOptions {
    /// Creates empty options; every knob keeps its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the watchdog image. An empty name is treated as unset.
    pub fn image_name(mut self, image: impl Into<String>) -> Self {
        let image = image.into();
        self.image_name = if image.is_empty() { None } else { Some(image) };
        self
    }

    /// Passes credentials for pulling the watchdog image from a private
    /// registry.
    pub fn registry_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.registry_credentials = Some(credentials.into());
        self
    }

    /// Supplies the engine URL used for socket resolution (e.g.
    /// `unix:///var/run/docker.sock`). The
    /// [`DOCKER_SOCKET_OVERRIDE_ENV`](crate::host::DOCKER_SOCKET_OVERRIDE_ENV)
    /// environment variable still takes precedence.
    pub fn docker_host(mut self, host: impl Into<String>) -> Self {
        self.docker_host = Some(host.into());
        self
    }

    /// Attaches a best-effort diagnostics channel receiving
    /// [`CleanupEvent`]s from the handshake task.
    pub fn diagnostics_sender(mut self, sender: mpsc::Sender<CleanupEvent>) -> Self {
        self.diagnostics = Some(sender);
        self
    }
}

/// Assembles the watchdog launch request for a session.
pub fn reaper_request(
    session_id: &SessionId,
    host_socket: &str,
    provider_config: ProviderConfig,
    default_network: Option<String>,
    config: &ReaperConfig,
    options: &ReaperOptions,
) -> ContainerRequest {
    let image = match &options.image_name {
        Some(name) if !name.is_empty() => name.clone(),
        _ if config.image.is_empty() => DEFAULT_REAPER_IMAGE.to_owned(),
        _ => config.image.clone(),
    };
    let port = config.control_port;

    let mut networks = Vec::new();
    if let Some(network) = default_network {
        networks.push(network);
    }

    ContainerRequest {
        reaper_image: image.clone(),
        image,
        exposed_ports: vec![format!("{port}/tcp")],
        network_mode: NetworkMode::Bridge,
        networks,
        labels: labels::reaper_labels(session_id),
        mounts: vec![BindMount::read_write(host_socket, REAPER_SOCKET_TARGET)],
        privileged: provider_config.privileged_reaper,
        auto_remove: true,
        skip_cleanup: true,
        registry_credentials: options.registry_credentials.clone(),
        wait: WaitStrategy::ListeningPort(port),
    }
}
