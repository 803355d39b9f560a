//! Error types for the websock crate.

use std::io;

use thiserror::Error;

/// Errors produced while reading or writing a single WebSocket frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The opcode in the WebSocket frame is not recognized.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    /// An underlying I/O error occurred while reading or writing a frame.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The frame declares a payload length the protocol does not allow.
    #[error("invalid frame length: {0} bytes")]
    Length(u64),
    /// The WebSocket protocol was violated in some way.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

/// Errors produced by the client, the connection and the handshake logic.
#[derive(Debug, Error)]
pub enum WebsocketError {
    /// The URI is not parseable or does not use the `ws` or `wss` scheme.
    #[error("bad uri: {0}")]
    BadUri(String),
    /// The caller supplied an opcode that cannot start a message, or the
    /// wire carried an unknown opcode value.
    #[error("bad opcode: {0}")]
    BadOpcode(String),
    /// Failed to open the underlying byte stream.
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    /// A transport operation failed after the connection was established.
    #[error("connection error: {0}")]
    Connection(#[source] io::Error),
    /// A transport operation exceeded its deadline.
    #[error("connection timed out: {0}")]
    Timeout(#[source] io::Error),
    /// The peer closed the underlying stream unexpectedly.
    #[error("connection closed by peer: {0}")]
    Eof(#[source] io::Error),
    /// The connection has completed its close handshake or was disconnected.
    #[error("websocket connection closed")]
    Closed,
    /// The server's upgrade response was malformed or missing a requirement.
    #[error("handshake failed: {0}")]
    Handshake(&'static str),
    /// The server's `Sec-WebSocket-Accept` value did not match the key.
    #[error("handshake failed: invalid Sec-WebSocket-Accept value")]
    HandshakeAccept,
    /// The TLS session could not be established.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
    /// The host name is not usable for TLS server name verification.
    #[error("invalid dns name for tls")]
    InvalidDnsName,
    /// The WebSocket protocol was violated by the peer.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

impl WebsocketError {
    /// Classify a transport-level I/O error. Timeouts and unexpected EOF are
    /// surfaced as their own kinds so callers can tell them apart.
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => WebsocketError::Timeout(err),
            io::ErrorKind::UnexpectedEof => WebsocketError::Eof(err),
            _ => WebsocketError::Connection(err),
        }
    }
}

impl From<CodecError> for WebsocketError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnknownOpcode(value) => {
                WebsocketError::BadOpcode(format!("unknown opcode {value:#04x} on the wire"))
            }
            CodecError::Io(io) => WebsocketError::from_io(io),
            CodecError::Length(_) => WebsocketError::Protocol("invalid frame length"),
            CodecError::Protocol(msg) => WebsocketError::Protocol(msg),
        }
    }
}
