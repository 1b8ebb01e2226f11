//! Codec error types.

use thiserror::Error;

/// Errors from parsing or building STOMP frames.
#[derive(Debug, Error)]
pub enum StompError {
    /// The command line named a command this client does not know.
    #[error("unknown STOMP command: {command}")]
    UnknownCommand {
        /// The command line as received.
        command: String,
    },

    /// A header line had no `:` separator.
    #[error("malformed header line: {line}")]
    MalformedHeader {
        /// The offending line.
        line: String,
    },

    /// A header value used an escape sequence outside the STOMP 1.2 set.
    #[error("invalid header escape sequence: \\{found}")]
    InvalidEscape {
        /// The character following the backslash.
        found: char,
    },

    /// The frame body never reached its NUL terminator.
    #[error("frame missing NUL terminator")]
    MissingTerminator,

    /// `content-length` disagreed with the bytes actually present.
    #[error("body truncated: content-length {expected}, {actual} bytes available")]
    BodyTruncated {
        /// Length the header promised.
        expected: usize,
        /// Bytes present before the end of input.
        actual: usize,
    },

    /// The command or a header was not valid UTF-8.
    #[error("frame head is not valid UTF-8")]
    InvalidUtf8,

    /// A `heart-beat` header value was not two comma-separated integers.
    #[error("malformed heart-beat header: {value}")]
    MalformedHeartBeat {
        /// The header value as received.
        value: String,
    },
}
