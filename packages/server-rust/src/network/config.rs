//! Network configuration types for the Aviary server.

use std::time::Duration;

/// Top-level network configuration: the HTTP listener plus the relay.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for both listeners.
    pub host: String,
    /// HTTP port. 0 means OS-assigned.
    pub port: u16,
    /// Host (and port) used in introspection URLs when a request carries no
    /// `Host` header. Defaults to `<host>:<bound port>`.
    pub public_host: Option<String>,
    /// Allowed CORS origins. `"*"` allows any origin.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for an HTTP request to complete.
    pub request_timeout: Duration,
    /// Relay listener settings.
    pub relay: RelayConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            public_host: None,
            cors_origins: vec!["http://localhost:5173".to_string()],
            request_timeout: Duration::from_secs(30),
            relay: RelayConfig::default(),
        }
    }
}

/// Relay listener configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay port, distinct from the HTTP port. 0 means OS-assigned.
    pub port: u16,
    /// Deliver a producer's frames back to the producer as well.
    pub echo_to_sender: bool,
    /// Per-connection settings.
    pub connection: ConnectionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 0,
            echo_to_sender: false,
            connection: ConnectionConfig::default(),
        }
    }
}

/// Per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bounded mpsc channel capacity for outbound frames per connection.
    /// Frames broadcast while the channel is full are dropped for that peer.
    pub outbound_channel_capacity: usize,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            outbound_channel_capacity: 256,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}
