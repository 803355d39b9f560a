//! WebSocket connection: message push/pull over the frame codec, control
//! frame auto-response and the close handshake.

use std::net::SocketAddr;
use std::time::Duration;

use crate::codec::{Frame, FrameCodec, Opcode};
use crate::errors::{CodecError, WebsocketError};
use crate::message::Message;
use crate::transport::Transport;

/// Reassembly state for a fragmented message in progress.
///
/// `opcode` is the data opcode of the first frame; continuations append to
/// `payload` until a final frame arrives.
#[derive(Debug)]
struct ReadBuffer {
    opcode: Opcode,
    payload: Vec<u8>,
    frames: usize,
}

/// A live WebSocket connection over an exclusively owned transport.
///
/// The connection splits outgoing messages into frames, reassembles
/// fragmented incoming messages, answers ping and close frames
/// transparently, and tracks the close handshake.
pub struct Connection {
    transport: Box<dyn Transport>,
    codec: FrameCodec,
    fragment_size: usize,
    read_buffer: Option<ReadBuffer>,
    is_closing: bool,
    close_status: Option<u16>,
    connected: bool,
}

impl Connection {
    /// Wrap an established transport. The handshake must already have
    /// happened on it.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, fragment_size: usize) -> Self {
        Self {
            transport,
            codec: FrameCodec::new(),
            fragment_size,
            read_buffer: None,
            is_closing: false,
            close_status: None,
            connected: true,
        }
    }

    /// Split a message into frames and write them contiguously.
    ///
    /// # Errors
    /// Returns `Closed` when the connection has been torn down, and a
    /// transport error kind when a write fails; a failed write disconnects
    /// the transport.
    pub fn push_message(
        &mut self,
        message: &Message,
        masked: bool,
    ) -> Result<(), WebsocketError> {
        if !self.connected {
            return Err(WebsocketError::Closed);
        }
        let frames = message.to_frames(masked, self.fragment_size);
        let frame_count = frames.len();
        for frame in &frames {
            if let Err(err) = self.codec.write_frame(&mut *self.transport, frame) {
                return Err(self.fail(err));
            }
        }
        tracing::debug!(
            opcode = %message.opcode(),
            len = message.len(),
            frames = frame_count,
            "pushed message"
        );
        Ok(())
    }

    /// Block until a whole message is available and return it.
    ///
    /// Control frames are passed through auto-response on the way: pings are
    /// answered with pongs, a close frame is acknowledged and tears the
    /// connection down. A control frame arriving between the fragments of a
    /// message is handled without disturbing reassembly. Control frames
    /// outside a fragmented message are returned like any other message;
    /// filtering is the caller's concern.
    ///
    /// # Errors
    /// Transport failures reset the reassembly state, disconnect the
    /// transport and surface as connection, timeout or EOF errors. Frames
    /// that violate the protocol surface as protocol or bad-opcode errors.
    pub fn pull_message(&mut self) -> Result<Message, WebsocketError> {
        if !self.connected {
            return Err(WebsocketError::Closed);
        }
        loop {
            let frame = match self.codec.read_frame(&mut *self.transport) {
                Ok(frame) => frame,
                Err(err) => return Err(self.fail(err)),
            };
            tracing::trace!(
                opcode = %frame.opcode,
                fin = frame.fin,
                len = frame.payload.len(),
                "read frame"
            );
            self.auto_respond(&frame)?;

            match frame.opcode {
                Opcode::Close => {
                    return Ok(Message::from_frame(Opcode::Close, frame.payload));
                }
                Opcode::Ping | Opcode::Pong => {
                    // Transparent while a fragmented message is in progress.
                    if self.read_buffer.is_some() {
                        continue;
                    }
                    return Ok(Message::from_frame(frame.opcode, frame.payload));
                }
                Opcode::Continuation => {
                    let Some(buffer) = self.read_buffer.as_mut() else {
                        return Err(WebsocketError::Protocol(
                            "continuation frame without initial data frame",
                        ));
                    };
                    buffer.payload.extend_from_slice(&frame.payload);
                    buffer.frames += 1;
                    if frame.fin
                        && let Some(buffer) = self.read_buffer.take()
                    {
                        tracing::debug!(
                            opcode = %buffer.opcode,
                            len = buffer.payload.len(),
                            frames = buffer.frames,
                            "pulled message"
                        );
                        return Ok(Message::from_frame(buffer.opcode, buffer.payload));
                    }
                }
                Opcode::Text | Opcode::Binary => {
                    if self.read_buffer.is_some() {
                        return Err(WebsocketError::Protocol(
                            "data frame while a fragmented message is in progress",
                        ));
                    }
                    if frame.fin {
                        tracing::debug!(
                            opcode = %frame.opcode,
                            len = frame.payload.len(),
                            frames = 1usize,
                            "pulled message"
                        );
                        return Ok(Message::from_frame(frame.opcode, frame.payload));
                    }
                    self.read_buffer = Some(ReadBuffer {
                        opcode: frame.opcode,
                        payload: frame.payload,
                        frames: 1,
                    });
                }
            }
        }
    }

    /// Send a close frame and block until the peer's close frame arrives,
    /// returning it. Messages received in between are discarded.
    ///
    /// # Errors
    /// Returns a transport error kind when sending or the remaining reads
    /// fail.
    pub fn close(&mut self, status: u16, reason: &[u8]) -> Result<Message, WebsocketError> {
        self.push_message(&Message::close(status, reason), true)?;
        self.is_closing = true;
        tracing::debug!(status, "close sent, awaiting peer close");
        loop {
            let message = self.pull_message()?;
            if message.opcode() == Opcode::Close {
                return Ok(message);
            }
            tracing::debug!(opcode = %message.opcode(), "discarded message during close handshake");
        }
    }

    /// Answer control frames. The frame itself is never swallowed; the pull
    /// loop still sees it.
    ///
    /// A ping is answered with a pong carrying the same payload and mask
    /// flag. A close frame records the peer status; when the close was not
    /// initiated locally it is echoed back, and either way the transport is
    /// disconnected. `close` is never re-entered from here, so a peer
    /// sending close twice cannot loop the connection.
    fn auto_respond(&mut self, frame: &Frame) -> Result<(), WebsocketError> {
        match frame.opcode {
            Opcode::Ping => {
                let pong = Frame {
                    fin: true,
                    opcode: Opcode::Pong,
                    masked: frame.masked,
                    payload: frame.payload.clone(),
                };
                if let Err(err) = self.codec.write_frame(&mut *self.transport, &pong) {
                    return Err(self.fail(err));
                }
                tracing::debug!(len = frame.payload.len(), "answered ping with pong");
            }
            Opcode::Close => {
                let status = (frame.payload.len() >= 2)
                    .then(|| u16::from_be_bytes([frame.payload[0], frame.payload[1]]));
                self.close_status = status;
                if self.is_closing {
                    self.is_closing = false;
                    tracing::debug!(?status, "peer acknowledged close");
                } else {
                    let mut payload = Vec::new();
                    if let Some(status) = status {
                        payload.extend_from_slice(&frame.payload[..2]);
                        payload.extend_from_slice(format!("Close acknowledged: {status}").as_bytes());
                    }
                    let echo = Frame {
                        fin: true,
                        opcode: Opcode::Close,
                        masked: true,
                        payload,
                    };
                    // The peer may already be gone; the teardown below is
                    // what matters.
                    let _ = self.codec.write_frame(&mut *self.transport, &echo);
                    tracing::debug!(?status, "echoed peer close");
                }
                self.disconnect();
            }
            _ => {}
        }
        Ok(())
    }

    /// Reset protocol state, release the transport and classify the error.
    fn fail(&mut self, err: CodecError) -> WebsocketError {
        self.read_buffer = None;
        self.is_closing = false;
        self.disconnect();
        err.into()
    }

    /// Shut the transport down. Safe to call more than once.
    pub fn disconnect(&mut self) {
        if self.connected {
            tracing::debug!("disconnecting transport");
            self.transport.shutdown();
            self.connected = false;
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Status code from the peer's close frame, once one has been received.
    #[must_use]
    pub fn close_status(&self) -> Option<u16> {
        self.close_status
    }

    #[must_use]
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    pub fn set_fragment_size(&mut self, fragment_size: usize) {
        self.fragment_size = fragment_size;
    }

    /// Apply a new per-operation deadline to the transport.
    ///
    /// # Errors
    /// Returns a connection error when the transport rejects the deadline.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), WebsocketError> {
        self.transport
            .set_timeout(Some(timeout))
            .map_err(WebsocketError::Connection)
    }

    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.transport.peer_addr()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// WebSocket close status codes as defined in RFC 6455 section 7.4.1.
///
/// The connection assigns [`CloseCode::Normal`] by default and echoes peer
/// codes without interpreting them; codes outside this table travel as raw
/// `u16` values.
#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000: Normal closure
    Normal = 1000,
    /// 1001: Endpoint is going away
    GoingAway = 1001,
    /// 1002: Protocol error
    ProtocolError = 1002,
    /// 1003: Unsupported data
    UnsupportedData = 1003,
    /// 1007: Invalid payload data
    InvalidPayloadData = 1007,
    /// 1008: Policy violation
    PolicyViolation = 1008,
    /// 1009: Message too big
    MessageTooBig = 1009,
    /// 1010: Mandatory extension
    MandatoryExtension = 1010,
    /// 1011: Internal server error
    InternalServerError = 1011,
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseCode::Normal => write!(f, "Normal closure"),
            CloseCode::GoingAway => write!(f, "Endpoint is going away"),
            CloseCode::ProtocolError => write!(f, "Protocol error"),
            CloseCode::UnsupportedData => write!(f, "Unsupported data"),
            CloseCode::InvalidPayloadData => write!(f, "Invalid payload data"),
            CloseCode::PolicyViolation => write!(f, "Policy violation"),
            CloseCode::MessageTooBig => write!(f, "Message too big"),
            CloseCode::MandatoryExtension => write!(f, "Mandatory extension"),
            CloseCode::InternalServerError => write!(f, "Internal server error"),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(value: CloseCode) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1000 => Ok(CloseCode::Normal),
            1001 => Ok(CloseCode::GoingAway),
            1002 => Ok(CloseCode::ProtocolError),
            1003 => Ok(CloseCode::UnsupportedData),
            1007 => Ok(CloseCode::InvalidPayloadData),
            1008 => Ok(CloseCode::PolicyViolation),
            1009 => Ok(CloseCode::MessageTooBig),
            1010 => Ok(CloseCode::MandatoryExtension),
            1011 => Ok(CloseCode::InternalServerError),
            _ => Err(()),
        }
    }
}
