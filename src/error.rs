// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

use std::error;
use std::fmt;
use std::io::{Error as IOError, ErrorKind};

/// Errors produced while talking to a Texecom Connect panel.
///
/// Variants follow the grouping in the error-handling policy: framing,
/// sequence, protocol, transport and authentication.
#[derive(Debug)]
pub enum Error {
    /// Bad start byte, short header, short body or CRC mismatch on a single frame.
    Framing(String),
    /// A response frame's sequence number didn't match the command awaiting it.
    Sequence { expected: u8, actual: u8 },
    /// Unexpected command id, wrong payload length, or a `C` frame received
    /// where a response or message was expected.
    Protocol(String),
    /// Socket timeout, EOF, or peer hangup (`+++` / `+++A`).
    Transport(TransportError),
    /// LOGIN NAK, or a NAK response to LOGIN signalling the session timed out.
    Authentication(AuthError),
}

#[derive(Debug)]
pub enum TransportError {
    /// The command was resent `CMD_RETRIES` times without a matching response.
    Timeout,
    Eof,
    /// The panel closed the connection in-band with `+++` or `+++A`.
    Hangup,
    Io(ErrorKind),
}

#[derive(Debug)]
pub enum AuthError {
    Nak,
    SessionTimedOut,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Framing(reason) => write!(f, "framing error: {}", reason),
            Error::Sequence { expected, actual } => write!(
                f,
                "sequence mismatch: expected {}, got {}",
                expected, actual
            ),
            Error::Protocol(reason) => write!(f, "protocol error: {}", reason),
            Error::Transport(t) => write!(f, "transport error: {}", t),
            Error::Authentication(a) => write!(f, "authentication error: {}", a),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "timed out waiting for a response"),
            TransportError::Eof => write!(f, "connection closed by panel"),
            TransportError::Hangup => write!(f, "panel hung up the connection"),
            TransportError::Io(kind) => write!(f, "io error: {:?}", kind),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::Nak => write!(f, "panel rejected the UDL password"),
            AuthError::SessionTimedOut => write!(f, "session timed out, must reconnect"),
        }
    }
}

impl From<IOError> for Error {
    fn from(e: IOError) -> Self {
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                Error::Transport(TransportError::Timeout)
            }
            ErrorKind::UnexpectedEof => Error::Transport(TransportError::Eof),
            kind => Error::Transport(TransportError::Io(kind)),
        }
    }
}

// This is important for other errors to wrap this one.
impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

impl Error {
    /// True for errors that the Lifecycle Controller should treat as
    /// connection-lost, driving it back to `Disconnected`.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Authentication(_))
    }
}
