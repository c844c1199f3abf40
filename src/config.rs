//! Connection-time configuration and the version/capability strings sent
//! in the join request.

use std::path::PathBuf;

/// Protocol major version this client speaks, carried in `SERVER_JOIN_REQ`.
pub const MAJOR_VERSION: u32 = 3;
/// Protocol minor version.
pub const MINOR_VERSION: u32 = 3;
/// Protocol patch version.
pub const PATCH_VERSION: u32 = 90;
/// Version label suffix, appended to the numeric version in logs and the
/// join request.
pub const VERSION_LABEL: &str = "-dev";
/// Capability string advertised to the server during the join handshake.
pub const CAPABILITY: &str = "+Freeciv.Devel-3.4-2025.Nov.29";

/// Options governing a single connection attempt.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Hostname or address of the server.
    pub server_host: String,
    /// TCP port to connect to.
    pub server_port: u16,
    /// Username sent in the join request.
    pub username: String,
    /// How long to wait for `SERVER_JOIN_REPLY` before giving up.
    pub join_timeout_ms: u64,
    /// Capability string advertised in the join request. Defaults to the
    /// compiled-in [`CAPABILITY`] constant; override only to test against
    /// a server expecting a different capability set.
    pub capability_string: String,
    /// When set, every raw frame is written under this directory for
    /// offline inspection (see `connection::PacketCapture`).
    pub packet_capture_dir: Option<PathBuf>,
    /// Whether an unrecognized packet type should tear down the
    /// connection. When `false`, unknown packets are logged and skipped.
    pub shutdown_on_unknown_packet: bool,
}

impl ClientConfig {
    /// Build a config for connecting to `server_host` as `username`,
    /// leaving every other option at its default.
    pub fn new(server_host: impl Into<String>, username: impl Into<String>) -> Self {
        ClientConfig { server_host: server_host.into(), username: username.into(), ..Default::default() }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_host: "localhost".to_string(),
            server_port: 6556,
            username: "client".to_string(),
            join_timeout_ms: 10_000,
            capability_string: CAPABILITY.to_string(),
            packet_capture_dir: None,
            shutdown_on_unknown_packet: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.server_port, 6556);
        assert_eq!(config.join_timeout_ms, 10_000);
        assert_eq!(config.capability_string, CAPABILITY);
        assert!(config.shutdown_on_unknown_packet);
        assert!(config.packet_capture_dir.is_none());
    }

    #[test]
    fn new_overrides_host_and_username() {
        let config = ClientConfig::new("example.org", "alice");
        assert_eq!(config.server_host, "example.org");
        assert_eq!(config.username, "alice");
        assert_eq!(config.server_port, 6556);
    }
}
