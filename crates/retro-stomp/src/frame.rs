//! STOMP command and frame types.

use crate::errors::StompError;
use crate::heartbeat::HeartBeat;

/// The STOMP commands the realtime client sends or receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Server handshake acknowledgement.
    Connected,
    /// Register interest in a destination.
    Subscribe,
    /// Drop a registered subscription.
    Unsubscribe,
    /// Publish a message to a destination.
    Send,
    /// Broker-pushed message for a subscription.
    Message,
    /// Server acknowledgement of a receipt-tagged frame.
    Receipt,
    /// Server-reported error.
    Error,
    /// Client-initiated teardown.
    Disconnect,
}

impl Command {
    /// Wire representation of the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Disconnect => "DISCONNECT",
        }
    }

    /// Parse a command line.
    pub fn parse(line: &str) -> Result<Self, StompError> {
        match line {
            "CONNECT" => Ok(Command::Connect),
            "CONNECTED" => Ok(Command::Connected),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "SEND" => Ok(Command::Send),
            "MESSAGE" => Ok(Command::Message),
            "RECEIPT" => Ok(Command::Receipt),
            "ERROR" => Ok(Command::Error),
            other => Err(StompError::UnknownCommand {
                command: other.to_string(),
            }),
        }
    }

    /// Whether header values of this frame are exempt from escaping.
    ///
    /// STOMP 1.2 exempts `CONNECT` and `CONNECTED` for 1.0 compatibility.
    pub fn escaping_exempt(self) -> bool {
        matches!(self, Command::Connect | Command::Connected)
    }
}

impl Command {
    /// Parse, accepting `DISCONNECT` too (clients never receive it, but the
    /// codec round-trips every frame it can build).
    pub(crate) fn parse_any(line: &str) -> Result<Self, StompError> {
        if line == "DISCONNECT" {
            return Ok(Command::Disconnect);
        }
        Self::parse(line)
    }
}

/// One STOMP frame: command, ordered headers, raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Repeats are legal; the first occurrence wins.
    pub headers: Vec<(String, String)>,
    /// Body bytes. Empty for every frame the client sends except `SEND`.
    pub body: Vec<u8>,
}

impl Frame {
    /// Create an empty frame for the given command.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header (builder style).
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value for a header name, per the STOMP repeated-header rule.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Body interpreted as UTF-8, lossily.
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    // ─── Client frame constructors ───────────────────────────────────────

    /// `CONNECT` handshake frame.
    ///
    /// Carries `accept-version:1.2`, the virtual host, the client's
    /// heart-beat offer, and the bearer header when a credential exists.
    pub fn connect(host: &str, heart_beat: &HeartBeat, authorization: Option<&str>) -> Self {
        let mut frame = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", heart_beat.header_value());
        if let Some(auth) = authorization {
            frame = frame.header("Authorization", auth);
        }
        frame
    }

    /// `SUBSCRIBE` frame for a destination.
    pub fn subscribe(id: &str, destination: &str, authorization: Option<&str>) -> Self {
        let mut frame = Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto");
        if let Some(auth) = authorization {
            frame = frame.header("Authorization", auth);
        }
        frame
    }

    /// `UNSUBSCRIBE` frame for a subscription id.
    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    /// `DISCONNECT` frame tagged with a receipt id so the server's
    /// `RECEIPT` confirms the teardown.
    pub fn disconnect(receipt_id: &str) -> Self {
        Frame::new(Command::Disconnect).header("receipt", receipt_id)
    }
}
