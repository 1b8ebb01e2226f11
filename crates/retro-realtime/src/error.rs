//! Realtime client error types.
//!
//! These circulate inside the connection task and its transport; they are
//! never escalated to the rendering layer. A failed connect feeds the retry
//! loop, a failed subscribe is logged, and the UI stays eventually
//! consistent through REST refetches.

use retro_stomp::StompError;
use thiserror::Error;

/// Errors from the realtime channel.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Opening the websocket to the broker failed.
    #[error("failed to connect to broker: {context}")]
    ConnectFailed {
        /// What went wrong during connect.
        context: String,
    },

    /// The broker answered the CONNECT frame with an ERROR frame.
    #[error("broker rejected handshake: {reason}")]
    HandshakeRejected {
        /// The broker's `message` header, or the frame body.
        reason: String,
    },

    /// The underlying link closed while the session still wanted it.
    #[error("broker link closed")]
    TransportClosed,

    /// A frame failed to parse.
    #[error("codec error: {0}")]
    Codec(#[from] StompError),
}
