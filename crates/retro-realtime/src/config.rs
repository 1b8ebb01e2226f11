//! Realtime client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the realtime session client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Host the web app is served from (default `"localhost"`).
    pub broker_host: String,
    /// Explicit broker URL override; wins over host-based selection when set.
    /// Used by tests pointing at an in-process broker.
    pub broker_url: Option<String>,
    /// Delay between reconnect attempts in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Outgoing heart-beat interval offered in CONNECT, in milliseconds.
    pub heartbeat_send_ms: u64,
    /// Incoming heart-beat interval requested in CONNECT, in milliseconds.
    pub heartbeat_recv_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".into(),
            broker_url: None,
            reconnect_delay_ms: 3000,
            heartbeat_send_ms: 4000,
            heartbeat_recv_ms: 4000,
        }
    }
}

impl RealtimeConfig {
    /// The websocket URL to dial.
    ///
    /// Local development talks plain `ws://` to the backend on port 8080;
    /// every other host goes through TLS on the standard port.
    pub fn broker_url(&self) -> String {
        if let Some(url) = &self.broker_url {
            return url.clone();
        }
        if self.broker_host == "localhost" {
            "ws://localhost:8080/websocket/websocket".into()
        } else {
            format!("wss://{}/websocket/websocket", self.broker_host)
        }
    }
}
