//! Frame encode/decode for websocket-carried STOMP payloads.
//!
//! One websocket message carries one frame (or a lone EOL heart-beat), which
//! is how the Spring-style brokers this client talks to behave. The decoder
//! therefore parses a complete payload at a time instead of maintaining a
//! streaming buffer.

use crate::errors::StompError;
use crate::frame::{Command, Frame};

/// One parsed inbound websocket payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A full STOMP frame.
    Frame(Frame),
    /// A lone EOL keep-alive.
    Heartbeat,
}

/// Serialize a frame to its wire bytes.
///
/// Appends `content-length` when a body is present so brokers never
/// misparse bodies containing NUL, and terminates with NUL per STOMP 1.2.
pub fn encode(frame: &Frame) -> Vec<u8> {
    let exempt = frame.command.escaping_exempt();
    let mut out = Vec::with_capacity(64 + frame.body.len());

    out.extend_from_slice(frame.command.as_str().as_bytes());
    out.push(b'\n');

    for (name, value) in &frame.headers {
        if exempt {
            out.extend_from_slice(name.as_bytes());
            out.push(b':');
            out.extend_from_slice(value.as_bytes());
        } else {
            out.extend_from_slice(escape(name).as_bytes());
            out.push(b':');
            out.extend_from_slice(escape(value).as_bytes());
        }
        out.push(b'\n');
    }

    if !frame.body.is_empty() {
        out.extend_from_slice(format!("content-length:{}\n", frame.body.len()).as_bytes());
    }

    out.push(b'\n');
    out.extend_from_slice(&frame.body);
    out.push(b'\0');
    out
}

/// Wire bytes of a client heart-beat (a lone EOL).
pub fn heartbeat_bytes() -> Vec<u8> {
    vec![b'\n']
}

/// Parse one websocket payload into a frame or heart-beat.
pub fn decode(input: &[u8]) -> Result<Inbound, StompError> {
    // Leading EOLs are either padding after a previous frame or a heart-beat.
    let mut pos = 0;
    while pos < input.len() && (input[pos] == b'\n' || input[pos] == b'\r') {
        pos += 1;
    }
    if pos >= input.len() {
        return Ok(Inbound::Heartbeat);
    }

    let command_line = read_line(input, &mut pos)?;
    let command = Command::parse_any(&command_line)?;
    let exempt = command.escaping_exempt();

    let mut headers = Vec::new();
    loop {
        let line = read_line(input, &mut pos)?;
        if line.is_empty() {
            break;
        }
        let Some(sep) = line.find(':') else {
            return Err(StompError::MalformedHeader { line });
        };
        let (raw_name, raw_value) = (&line[..sep], &line[sep + 1..]);
        if exempt {
            headers.push((raw_name.to_string(), raw_value.to_string()));
        } else {
            headers.push((unescape(raw_name)?, unescape(raw_value)?));
        }
    }

    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .map(|(_, v)| {
            v.parse::<usize>().map_err(|_| StompError::MalformedHeader {
                line: format!("content-length:{v}"),
            })
        })
        .transpose()?;

    let body = match content_length {
        Some(len) => {
            let available = input.len().saturating_sub(pos);
            // The terminator still follows a length-delimited body.
            if available < len + 1 {
                return Err(StompError::BodyTruncated {
                    expected: len,
                    actual: available.saturating_sub(1),
                });
            }
            if input[pos + len] != b'\0' {
                return Err(StompError::MissingTerminator);
            }
            input[pos..pos + len].to_vec()
        }
        None => {
            let Some(end) = input[pos..].iter().position(|&b| b == b'\0') else {
                return Err(StompError::MissingTerminator);
            };
            input[pos..pos + end].to_vec()
        }
    };

    Ok(Inbound::Frame(Frame {
        command,
        headers,
        body,
    }))
}

/// Read one `\n`-terminated line (tolerating `\r\n`) as UTF-8.
fn read_line(input: &[u8], pos: &mut usize) -> Result<String, StompError> {
    let rest = &input[*pos..];
    let Some(end) = rest.iter().position(|&b| b == b'\n') else {
        return Err(StompError::MissingTerminator);
    };
    let mut line = &rest[..end];
    if line.ends_with(b"\r") {
        line = &line[..line.len() - 1];
    }
    *pos += end + 1;
    std::str::from_utf8(line)
        .map(ToString::to_string)
        .map_err(|_| StompError::InvalidUtf8)
}

/// Escape a header token per STOMP 1.2.
fn escape(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for ch in token.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]; unknown sequences are fatal per STOMP 1.2.
fn unescape(token: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => return Err(StompError::InvalidEscape { found: other }),
            None => {
                return Err(StompError::MalformedHeader {
                    line: token.to_string(),
                });
            }
        }
    }
    Ok(out)
}
