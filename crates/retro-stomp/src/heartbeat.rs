//! `heart-beat` header parsing and interval negotiation.

use std::time::Duration;

use crate::errors::StompError;

/// A `heart-beat` header value: what a party can send, what it wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartBeat {
    /// Smallest interval (ms) this party can emit heart-beats at. 0 = none.
    pub send_ms: u64,
    /// Desired interval (ms) for receiving heart-beats. 0 = don't care.
    pub recv_ms: u64,
}

/// Effective intervals after combining both sides' offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    /// How often the client must emit a heart-beat, if at all.
    pub send_interval: Option<Duration>,
    /// How often the client should expect broker activity, if at all.
    pub recv_interval: Option<Duration>,
}

impl HeartBeat {
    /// Heart-beating disabled in both directions.
    pub const DISABLED: HeartBeat = HeartBeat {
        send_ms: 0,
        recv_ms: 0,
    };

    /// Build from millisecond intervals.
    pub fn new(send_ms: u64, recv_ms: u64) -> Self {
        Self { send_ms, recv_ms }
    }

    /// Parse a `sx,sy` header value.
    pub fn parse(value: &str) -> Result<Self, StompError> {
        let malformed = || StompError::MalformedHeartBeat {
            value: value.to_string(),
        };
        let (sx, sy) = value.split_once(',').ok_or_else(malformed)?;
        Ok(Self {
            send_ms: sx.trim().parse().map_err(|_| malformed())?,
            recv_ms: sy.trim().parse().map_err(|_| malformed())?,
        })
    }

    /// Header value for a CONNECT frame.
    pub fn header_value(&self) -> String {
        format!("{},{}", self.send_ms, self.recv_ms)
    }

    /// Combine the client's offer with the server's CONNECTED reply.
    ///
    /// Per STOMP 1.2: each direction runs at the larger of the two figures,
    /// and a 0 on either side disables that direction.
    pub fn negotiate(&self, server: &HeartBeat) -> Negotiated {
        let send_interval = if self.send_ms == 0 || server.recv_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.send_ms.max(server.recv_ms)))
        };
        let recv_interval = if self.recv_ms == 0 || server.send_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.recv_ms.max(server.send_ms)))
        };
        Negotiated {
            send_interval,
            recv_interval,
        }
    }
}
