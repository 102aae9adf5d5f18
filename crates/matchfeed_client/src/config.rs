//! Configuration for the client.

use matchfeed_protocol::PROTOCOL_VERSION;
use std::time::Duration;

/// Default `host` header sent in `CONNECT` frames.
pub const DEFAULT_HOST_HEADER: &str = "stomp.cs.bgu.ac.il";

/// Configuration for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Protocol version advertised in `accept-version`.
    pub accept_version: String,
    /// Virtual host advertised in the `host` header.
    pub host_header: String,
    /// How long logout waits for its receipt before tearing down anyway.
    pub receipt_timeout: Duration,
    /// Largest frame accepted from the server, in bytes.
    pub max_frame_len: usize,
}

impl ClientConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            accept_version: PROTOCOL_VERSION.to_string(),
            host_header: DEFAULT_HOST_HEADER.to_string(),
            receipt_timeout: Duration::from_secs(5),
            max_frame_len: 1024 * 1024,
        }
    }

    /// Sets the `host` header.
    pub fn with_host_header(mut self, host: impl Into<String>) -> Self {
        self.host_header = host.into();
        self
    }

    /// Sets the logout receipt timeout.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Sets the maximum inbound frame length.
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
