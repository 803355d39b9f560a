//! Blocking byte-stream transports.
//!
//! The connection owns exactly one [`Transport`]: a plain TCP stream for
//! `ws` or a rustls session for `wss`. All suspension in this crate happens
//! inside transport reads and writes, bounded by the per-operation timeout.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::errors::WebsocketError;

/// A blocking byte stream the connection reads frames from and writes
/// frames to.
///
/// `position` counts bytes moved in either direction since the stream was
/// opened; a non-zero position on a persistent stream means the upgrade
/// handshake already happened and can be skipped.
pub trait Transport: Read + Write + Send {
    /// Set the per-operation deadline for subsequent reads and writes.
    /// `None` blocks indefinitely.
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Total bytes read plus written on this stream.
    fn position(&self) -> u64;

    /// Local socket address, when the stream has one.
    fn local_addr(&self) -> Option<SocketAddr>;

    /// Peer socket address, when the stream has one.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Tear the stream down. Must be safe to call more than once; any
    /// in-flight blocking read on another handle fails afterwards.
    fn shutdown(&mut self);
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let addrs = (host, port).to_socket_addrs()?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address resolved")
    }))
}

/// Plain TCP transport for the `ws` scheme.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    position: u64,
}

impl TcpTransport {
    /// Open a TCP stream to `host:port`, with `timeout` bounding the connect
    /// and every later read and write.
    ///
    /// # Errors
    /// Returns the last connect error when no resolved address accepts.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> io::Result<Self> {
        let stream = connect_tcp(host, port, timeout)?;
        Ok(Self {
            stream,
            position: 0,
        })
    }

    /// Wrap an already-connected stream, e.g. one kept alive across clients.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            position: 0,
        }
    }
}

impl Read for TcpTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stream.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for TcpTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpTransport {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.local_addr().ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// TLS transport for the `wss` scheme, a rustls session over TCP.
pub struct TlsTransport {
    stream: StreamOwned<ClientConnection, TcpStream>,
    position: u64,
}

impl TlsTransport {
    /// Open a TCP stream to `host:port` and start a TLS session over it.
    ///
    /// `config` is used when given; otherwise a configuration trusting the
    /// webpki root certificates is built.
    ///
    /// # Errors
    /// Returns a connect error when no resolved address accepts, an invalid
    /// DNS name error when `host` is not usable for server-name
    /// verification, and a TLS error when the session cannot be created.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        config: Option<Arc<ClientConfig>>,
    ) -> Result<Self, WebsocketError> {
        let stream = connect_tcp(host, port, timeout).map_err(WebsocketError::Connect)?;
        let config = config.unwrap_or_else(|| {
            let root_store = webpki_roots::TLS_SERVER_ROOTS
                .iter()
                .cloned()
                .collect::<RootCertStore>();
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(root_store)
                    .with_no_client_auth(),
            )
        });
        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|_| WebsocketError::InvalidDnsName)?;
        let conn = ClientConnection::new(config, server_name)?;
        Ok(Self {
            stream: StreamOwned::new(conn, stream),
            position: 0,
        })
    }
}

impl Read for TlsTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stream.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for TlsTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TlsTransport {
    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.sock.set_read_timeout(timeout)?;
        self.stream.sock.set_write_timeout(timeout)
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.stream.sock.local_addr().ok()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.sock.peer_addr().ok()
    }

    fn shutdown(&mut self) {
        self.stream.conn.send_close_notify();
        let _ = self.stream.sock.shutdown(Shutdown::Both);
    }
}
