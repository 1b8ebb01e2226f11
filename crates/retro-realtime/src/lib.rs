//! # retro-realtime
//!
//! STOMP-over-WebSocket realtime session client for RetroQuest boards.
//!
//! One [`RealtimeSession`] owns one broker connection for its lifetime.
//! Callers never build topic paths, attach credentials, or manage
//! heart-beats themselves — they call `connect`, subscribe to the board
//! topics they care about from inside the connect callback, and receive
//! deserialized JSON payloads on their handlers.
//!
//! The socket is strictly additive: board state stays correct through the
//! REST API, so every failure on this channel is logged and retried rather
//! than surfaced to the rendering layer. Reconnection uses a fixed delay
//! with unbounded retries by design.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `session` | Public API + spawned connection task (the state machine) |
//! | `transport` | `Transport` seam, tokio-tungstenite implementation |
//! | `dispatch` | Subscription registry and message fan-out to handlers |
//! | `topic` | `/topic/{teamId}/{category}` path construction |
//! | `config` | Broker host/URL selection, reconnect + heart-beat figures |
//! | `error` | `RealtimeError` |

#![deny(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod topic;
pub mod transport;

pub use config::RealtimeConfig;
pub use error::RealtimeError;
pub use session::{ConnectCallback, MessageHandler, RealtimeSession};
pub use topic::{Category, Topic};
pub use transport::{BrokerLink, Outbound, Transport, WebSocketTransport};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
