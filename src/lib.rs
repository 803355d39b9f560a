//! Blocking client-side WebSocket library.
//!
//! This crate implements the client half of the WebSocket protocol as
//! defined in RFC 6455: framing, masking, message fragmentation and
//! reassembly, the HTTP/1.1 upgrade handshake, and the ping/pong/close
//! control-frame semantics. I/O is blocking and single-threaded; every
//! read and write is bounded by a configurable per-operation timeout.
//!
//! This crate does not handle any extension negotiation. It focuses solely
//! on the WebSocket protocol as defined in RFC 6455.
//!
//! ```no_run
//! use websock::Client;
//!
//! let mut client = Client::new("wss://echo.example.com/chat")?;
//! client.text("Hello")?;
//! if let Some(received) = client.receive()? {
//!     println!("{:?}", received.into_payload());
//! }
//! client.close_default()?;
//! # Ok::<(), websock::WebsocketError>(())
//! ```

pub(crate) mod codec;
pub(crate) mod connection;
pub(crate) mod errors;
pub(crate) mod message;
pub(crate) mod transport;

mod client;

pub use client::{Client, Options, ReceivedData};
pub use codec::Opcode;
pub use connection::{CloseCode, Connection};
pub use errors::{CodecError, WebsocketError};
pub use message::Message;
pub use transport::{TcpTransport, TlsTransport, Transport};

pub use rustls;
