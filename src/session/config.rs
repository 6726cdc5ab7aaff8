// ABOUTME: Session configuration
// ABOUTME: Node address, transport security, heartbeat and reconnect timing

use std::time::Duration;

/// Configuration for a node session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Node host name or address
    pub host: String,
    /// Node port
    pub port: u16,
    /// Use `wss`/`https` instead of `ws`/`http`
    pub secure: bool,
    /// Interval between WebSocket pings
    pub heartbeat: Duration,
    /// Delay before reconnecting after a failure
    pub reconnect_delay: Duration,
    /// Value of the `Client-Name` header
    pub client_name: String,
    /// Versioned REST path prefix
    pub api_version: String,
}

impl SessionConfig {
    /// Create a configuration for the given node address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Enable or disable TLS
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the heartbeat interval; `Duration::ZERO` disables pings
    pub fn heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    /// Set the reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the client name sent to the node
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the REST API version prefix
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// WebSocket endpoint of the node
    pub fn websocket_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}/{}/websocket", scheme, self.host, self.port, self.api_version)
    }

    /// Base URL for REST requests, without a trailing slash
    pub fn rest_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2333,
            secure: false,
            heartbeat: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            client_name: format!("novalink/{}", env!("CARGO_PKG_VERSION")),
            api_version: "v3".to_string(),
        }
    }
}
