//! # retro-stomp
//!
//! STOMP 1.2 frame model, wire codec, and heart-beat negotiation.
//!
//! This crate is pure: no sockets, no async. It models the subset of STOMP
//! the realtime client speaks — `CONNECT`/`CONNECTED` handshake,
//! `SUBSCRIBE`/`UNSUBSCRIBE`, broker-pushed `MESSAGE` frames,
//! `DISCONNECT`/`RECEIPT`, and lone-EOL heart-beats — and converts between
//! [`Frame`] values and the byte payloads carried in websocket messages.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `frame` | `Command` + `Frame` types and client-frame constructors |
//! | `codec` | `encode`/`decode` with header escaping and `content-length` |
//! | `heartbeat` | `heart-beat` header parsing and interval negotiation |

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod frame;
pub mod heartbeat;

pub use codec::{Inbound, decode, encode};
pub use errors::StompError;
pub use frame::{Command, Frame};
pub use heartbeat::{HeartBeat, Negotiated};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
