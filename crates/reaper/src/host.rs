//! Engine control-socket resolution.
//!
//! The watchdog container needs the local engine's control socket bind
//! mounted into it so it can destroy resources on the caller's behalf. The
//! socket path is resolved from, in order: an environment override, an
//! explicit engine URL supplied by the caller, and a fixed default.
//!
//! Resolution never fails; an unusable input falls through to the default.

use tracing::debug;
use url::Url;

/// Default engine control-socket path.
pub const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Environment override for the engine socket path. Wins over every other
/// source when set and non-empty; its value is used verbatim.
pub const DOCKER_SOCKET_OVERRIDE_ENV: &str = "CUSTODIAN_DOCKER_SOCKET_OVERRIDE";

/// Resolves the local engine control-socket path.
///
/// `docker_host`, when present, is an engine URL such as
/// `unix:///var/run/docker.sock`; only the `unix` scheme contributes a path.
/// Anything else (TCP hosts, malformed URLs) resolves to
/// [`DEFAULT_DOCKER_SOCKET`].
pub fn resolve_host_socket(docker_host: Option<&str>) -> String {
    let override_value = std::env::var(DOCKER_SOCKET_OVERRIDE_ENV).ok();
    resolve(override_value.as_deref(), docker_host)
}

fn resolve(override_value: Option<&str>, docker_host: Option<&str>) -> String {
    if let Some(path) = override_value {
        if !path.is_empty() {
            return path.to_owned();
        }
    }

    let Some(raw) = docker_host else {
        return DEFAULT_DOCKER_SOCKET.to_owned();
    };
    if raw.is_empty() {
        return DEFAULT_DOCKER_SOCKET.to_owned();
    }

    match Url::parse(raw) {
        Ok(parsed) if parsed.scheme() == "unix" => parsed.path().to_owned(),
        Ok(parsed) => {
            debug!(
                scheme = parsed.scheme(),
                "docker host is not a unix socket, using default"
            );
            DEFAULT_DOCKER_SOCKET.to_owned()
        }
        Err(_) => {
            debug!(raw, "docker host is not a parsable URL, using default");
            DEFAULT_DOCKER_SOCKET.to_owned()
        }
    }
}
