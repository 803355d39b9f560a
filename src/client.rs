//! WebSocket client: lazy connection, HTTP/1.1 upgrade handshake and the
//! user-facing operations.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::Uri;
use rand::{Rng, SeedableRng};
use sha1::{Digest, Sha1};

use crate::codec::Opcode;
use crate::connection::{CloseCode, Connection};
use crate::errors::WebsocketError;
use crate::message::Message;
use crate::transport::{TcpTransport, TlsTransport, Transport};

const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const USER_AGENT: &str = concat!("websock/", env!("CARGO_PKG_VERSION"));
const MAX_HANDSHAKE_RESPONSE: usize = 8192;

/// Connection options.
///
/// The defaults are a 5 second per-operation timeout, 4096-byte outgoing
/// frames and a receive filter surfacing text and binary messages only.
#[derive(Clone)]
pub struct Options {
    pub(crate) timeout: Duration,
    pub(crate) fragment_size: usize,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) context: Option<Arc<rustls::ClientConfig>>,
    pub(crate) persistent: bool,
    pub(crate) filter: Vec<Opcode>,
    pub(crate) return_obj: bool,
    pub(crate) origin: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            fragment_size: 4096,
            headers: Vec::new(),
            context: None,
            persistent: false,
            filter: vec![Opcode::Text, Opcode::Binary],
            return_obj: false,
            origin: None,
        }
    }
}

impl Options {
    /// Per-read and per-write deadline on the transport.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum payload bytes per outgoing frame.
    #[must_use]
    pub fn fragment_size(mut self, fragment_size: usize) -> Self {
        self.fragment_size = fragment_size;
        self
    }

    /// Extra request headers for the handshake. A header whose name exactly
    /// matches a base header replaces it; others are appended.
    #[must_use]
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Preconfigured TLS client configuration for `wss` connections.
    #[must_use]
    pub fn context(mut self, context: Arc<rustls::ClientConfig>) -> Self {
        self.context = Some(context);
        self
    }

    /// Reuse an already-open transport without repeating the handshake,
    /// detected via the transport's byte position.
    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Opcodes [`Client::receive`] surfaces to the caller. Messages with
    /// other opcodes are handled and skipped.
    #[must_use]
    pub fn filter<I: IntoIterator<Item = Opcode>>(mut self, filter: I) -> Self {
        self.filter = filter.into_iter().collect();
        self
    }

    /// When set, [`Client::receive`] yields whole [`Message`] values instead
    /// of raw payload bytes.
    #[must_use]
    pub fn return_obj(mut self, return_obj: bool) -> Self {
        self.return_obj = return_obj;
        self
    }

    /// Set the `origin` request header.
    #[deprecated(note = "pass an `origin` entry via `headers` instead")]
    #[must_use]
    pub fn origin<S: Into<String>>(mut self, origin: S) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// What [`Client::receive`] hands back, shaped by the `return_obj` option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceivedData {
    /// The whole message, opcode and timestamp included.
    Message(Message),
    /// The raw payload bytes.
    Payload(Vec<u8>),
}

impl ReceivedData {
    /// The payload bytes, whichever shape was returned.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            ReceivedData::Message(message) => message.into_payload(),
            ReceivedData::Payload(payload) => payload,
        }
    }
}

/// A WebSocket client for a single `ws` or `wss` URI.
///
/// The connection is opened lazily on the first send or receive and torn
/// down by [`Client::disconnect`], by close handshake completion, or by a
/// fatal transport or protocol error.
pub struct Client {
    uri: Uri,
    options: Options,
    connection: Option<Connection>,
    last_opcode: Option<Opcode>,
    close_status: Option<u16>,
}

impl Client {
    /// Create a client for the given URI with default options. No I/O
    /// happens until the first operation.
    ///
    /// # Errors
    /// Returns a bad-uri error when the URI does not parse, lacks a host or
    /// does not use the `ws` or `wss` scheme.
    pub fn new(uri: &str) -> Result<Self, WebsocketError> {
        Self::with_options(uri, Options::default())
    }

    /// Create a client with explicit options.
    ///
    /// # Errors
    /// Returns a bad-uri error when the URI does not parse, lacks a host or
    /// does not use the `ws` or `wss` scheme.
    pub fn with_options(uri: &str, options: Options) -> Result<Self, WebsocketError> {
        let uri: Uri = uri
            .parse()
            .map_err(|_| WebsocketError::BadUri(format!("unparseable uri: {uri}")))?;
        match uri.scheme_str() {
            Some("ws" | "wss") => {}
            Some(other) => {
                return Err(WebsocketError::BadUri(format!(
                    "scheme must be ws or wss, got {other}"
                )));
            }
            None => {
                return Err(WebsocketError::BadUri("missing uri scheme".to_string()));
            }
        }
        if uri.host().is_none() {
            return Err(WebsocketError::BadUri("missing host".to_string()));
        }
        Ok(Self {
            uri,
            options,
            connection: None,
            last_opcode: None,
            close_status: None,
        })
    }

    /// Open the transport and perform the upgrade handshake, unless a live
    /// connection already exists.
    ///
    /// # Errors
    /// Returns connect, TLS or handshake error kinds; the client is left
    /// disconnected on failure.
    pub fn connect(&mut self) -> Result<(), WebsocketError> {
        if self.connection.as_ref().is_some_and(Connection::is_connected) {
            return Ok(());
        }
        let secure = self.uri.scheme_str() == Some("wss");
        let host = self
            .uri
            .host()
            .ok_or_else(|| WebsocketError::BadUri("missing host".to_string()))?
            .to_owned();
        let port = self.uri.port_u16().unwrap_or(if secure { 443 } else { 80 });
        tracing::debug!(%host, port, secure, "opening transport");
        let transport: Box<dyn Transport> = if secure {
            Box::new(TlsTransport::connect(
                &host,
                port,
                self.options.timeout,
                self.options.context.clone(),
            )?)
        } else {
            Box::new(
                TcpTransport::connect(&host, port, self.options.timeout)
                    .map_err(WebsocketError::Connect)?,
            )
        };
        self.install(transport)
    }

    /// Install a caller-supplied transport, performing the handshake over it
    /// first. With the `persistent` option set and a transport that has
    /// already moved bytes, the handshake is skipped.
    ///
    /// # Errors
    /// Returns handshake error kinds; the client is left disconnected on
    /// failure.
    pub fn connect_with_transport(
        &mut self,
        transport: Box<dyn Transport>,
    ) -> Result<(), WebsocketError> {
        self.install(transport)
    }

    fn install(&mut self, mut transport: Box<dyn Transport>) -> Result<(), WebsocketError> {
        if self.options.persistent && transport.position() != 0 {
            tracing::debug!("reusing persistent stream, skipping handshake");
        } else {
            self.handshake(&mut *transport)?;
        }
        let mut connection = Connection::new(transport, self.options.fragment_size);
        connection.set_timeout(self.options.timeout)?;
        self.connection = Some(connection);
        Ok(())
    }

    fn handshake(&self, transport: &mut dyn Transport) -> Result<(), WebsocketError> {
        let key = generate_key();
        let request = build_request(&self.uri, &key, &self.options);
        tracing::debug!(uri = %self.uri, "sending upgrade request");
        transport
            .write_all(request.as_bytes())
            .map_err(WebsocketError::from_io)?;
        transport.flush().map_err(WebsocketError::from_io)?;
        let response = read_handshake_response(transport)?;
        validate_handshake_response(&response, &key)?;
        tracing::debug!("handshake complete");
        Ok(())
    }

    /// Send a text message.
    ///
    /// # Errors
    /// Returns connect or transport error kinds.
    pub fn text<S: Into<String>>(&mut self, text: S) -> Result<(), WebsocketError> {
        self.send_message(Message::text(text), true)
    }

    /// Send a binary message.
    ///
    /// # Errors
    /// Returns connect or transport error kinds.
    pub fn binary<B: Into<Vec<u8>>>(&mut self, data: B) -> Result<(), WebsocketError> {
        self.send_message(Message::binary(data), true)
    }

    /// Send a ping control message. The payload must not exceed 125 bytes.
    ///
    /// # Errors
    /// Returns connect or transport error kinds.
    pub fn ping<B: Into<Vec<u8>>>(&mut self, payload: B) -> Result<(), WebsocketError> {
        self.send_message(Message::ping(payload), true)
    }

    /// Send a pong control message. The payload must not exceed 125 bytes.
    ///
    /// # Errors
    /// Returns connect or transport error kinds.
    pub fn pong<B: Into<Vec<u8>>>(&mut self, payload: B) -> Result<(), WebsocketError> {
        self.send_message(Message::pong(payload), true)
    }

    /// Send a message with the given opcode, connecting lazily.
    ///
    /// # Errors
    /// Returns a bad-opcode error for [`Opcode::Continuation`] before any
    /// bytes are written, and connect or transport error kinds otherwise.
    pub fn send<B: Into<Vec<u8>>>(
        &mut self,
        payload: B,
        opcode: Opcode,
        masked: bool,
    ) -> Result<(), WebsocketError> {
        let message = Message::new(opcode, payload.into())?;
        self.send_message(message, masked)
    }

    fn send_message(&mut self, message: Message, masked: bool) -> Result<(), WebsocketError> {
        self.connect()?;
        let Some(connection) = self.connection.as_mut() else {
            return Err(WebsocketError::Closed);
        };
        let result = connection.push_message(&message, masked);
        if result.is_err() {
            self.teardown();
        }
        result
    }

    /// Block until a message passing the receive filter arrives.
    ///
    /// Messages whose opcode is outside the `filter` option (by default
    /// everything but text and binary) are handled and skipped. A close from
    /// the peer clears the last opcode, tears the connection down, and is
    /// surfaced as a message only with `return_obj` set.
    ///
    /// # Errors
    /// Returns connect or transport error kinds; a fatal error tears the
    /// connection down.
    pub fn receive(&mut self) -> Result<Option<ReceivedData>, WebsocketError> {
        self.connect()?;
        loop {
            let Some(connection) = self.connection.as_mut() else {
                return Err(WebsocketError::Closed);
            };
            let message = match connection.pull_message() {
                Ok(message) => message,
                Err(err) => {
                    self.teardown();
                    return Err(err);
                }
            };
            if message.opcode() == Opcode::Close {
                self.last_opcode = None;
                self.teardown();
                return Ok(self
                    .options
                    .return_obj
                    .then_some(ReceivedData::Message(message)));
            }
            if self.options.filter.contains(&message.opcode()) {
                self.last_opcode = Some(message.opcode());
                return Ok(Some(if self.options.return_obj {
                    ReceivedData::Message(message)
                } else {
                    ReceivedData::Payload(message.into_payload())
                }));
            }
            tracing::trace!(opcode = %message.opcode(), "filtered message, pulling again");
        }
    }

    /// Initiate the close handshake and block until the peer's close frame
    /// arrives, returning it. The connection is torn down afterwards.
    ///
    /// Use [`CloseCode::Normal`] and a short farewell for an ordinary close.
    ///
    /// # Errors
    /// Returns `Closed` when no connection is open, and transport error
    /// kinds when the handshake cannot complete.
    pub fn close(&mut self, status: u16, reason: &str) -> Result<Message, WebsocketError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(WebsocketError::Closed);
        };
        let result = connection.close(status, reason.as_bytes());
        self.last_opcode = None;
        self.teardown();
        result
    }

    /// Close with status 1000 and the default farewell.
    ///
    /// # Errors
    /// Same as [`Client::close`].
    pub fn close_default(&mut self) -> Result<Message, WebsocketError> {
        self.close(CloseCode::Normal.into(), "ttfn")
    }

    /// Tear the connection down without a close handshake.
    pub fn disconnect(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            self.close_status = connection.close_status().or(self.close_status);
            connection.disconnect();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_connected)
    }

    /// Local socket address of the live connection.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().and_then(Connection::local_addr)
    }

    /// Peer socket address of the live connection.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.connection.as_ref().and_then(Connection::peer_addr)
    }

    /// Status code from the peer's close frame, once one has been received.
    #[must_use]
    pub fn close_status(&self) -> Option<u16> {
        self.connection
            .as_ref()
            .and_then(Connection::close_status)
            .or(self.close_status)
    }

    /// Opcode of the last message surfaced by [`Client::receive`]. Cleared
    /// when a close arrives.
    #[must_use]
    pub fn last_opcode(&self) -> Option<Opcode> {
        self.last_opcode
    }

    #[must_use]
    pub fn fragment_size(&self) -> usize {
        self.options.fragment_size
    }

    /// Change the outgoing fragment size, applying it to a live connection.
    pub fn set_fragment_size(&mut self, fragment_size: usize) {
        self.options.fragment_size = fragment_size;
        if let Some(connection) = self.connection.as_mut() {
            connection.set_fragment_size(fragment_size);
        }
    }

    /// Change the per-operation timeout, applying it to a live connection.
    ///
    /// # Errors
    /// Returns a connection error when the live transport rejects the
    /// deadline.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), WebsocketError> {
        self.options.timeout = timeout;
        if let Some(connection) = self.connection.as_mut() {
            connection.set_timeout(timeout)?;
        }
        Ok(())
    }
}

/// 16 bytes drawn uniformly from the printable ASCII range 33-126,
/// base64-encoded, from an OS-seeded RNG.
fn generate_key() -> String {
    let mut rng = rand::rngs::StdRng::from_os_rng();
    let mut key_bytes = [0u8; 16];
    for byte in &mut key_bytes {
        *byte = rng.random_range(33..=126);
    }
    BASE64.encode(key_bytes)
}

/// The expected `Sec-WebSocket-Accept` value for a request key.
fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID.as_bytes());
    BASE64.encode(sha1.finalize())
}

/// Request-target: the URI path, `/`-prefixed when empty or relative, with
/// the original query preserved.
fn request_target(uri: &Uri) -> String {
    let path = uri.path();
    let mut target = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if let Some(query) = uri.query() {
        let _ = write!(target, "?{query}");
    }
    target
}

/// The authority with any userinfo stripped.
fn host_header(uri: &Uri) -> String {
    let authority = uri.authority().map_or("", http::uri::Authority::as_str);
    authority
        .rsplit('@')
        .next()
        .unwrap_or(authority)
        .to_string()
}

/// Userinfo from the authority, when present.
fn userinfo(uri: &Uri) -> Option<&str> {
    uri.authority()
        .and_then(|authority| authority.as_str().rsplit_once('@'))
        .map(|(userinfo, _)| userinfo)
}

/// Assemble the HTTP/1.1 upgrade request. User-supplied headers override
/// base headers on an exact name match and are appended otherwise.
fn build_request(uri: &Uri, key: &str, options: &Options) -> String {
    let mut headers: Vec<(String, String)> = vec![
        ("Host".to_string(), host_header(uri)),
        ("User-Agent".to_string(), USER_AGENT.to_string()),
        ("Connection".to_string(), "Upgrade".to_string()),
        ("Upgrade".to_string(), "websocket".to_string()),
        ("Sec-WebSocket-Key".to_string(), key.to_string()),
        ("Sec-WebSocket-Version".to_string(), "13".to_string()),
    ];
    if let Some(userinfo) = userinfo(uri) {
        headers.push((
            "authorization".to_string(),
            format!("Basic {}", BASE64.encode(userinfo)),
        ));
    }
    if let Some(origin) = &options.origin {
        headers.push(("origin".to_string(), origin.clone()));
    }
    for (name, value) in &options.headers {
        if let Some(existing) = headers.iter_mut().find(|(n, _)| n == name) {
            existing.1 = value.clone();
        } else {
            headers.push((name.clone(), value.clone()));
        }
    }

    let mut request = format!("GET {} HTTP/1.1\r\n", request_target(uri));
    for (name, value) in &headers {
        let _ = write!(request, "{name}: {value}\r\n");
    }
    request.push_str("\r\n");
    request
}

/// Read the upgrade response in chunks of at most 1024 bytes until the
/// header terminator appears, guarding against oversized responses.
fn read_handshake_response(transport: &mut dyn Transport) -> Result<Vec<u8>, WebsocketError> {
    let mut response = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = transport.read(&mut buf).map_err(WebsocketError::from_io)?;
        if n == 0 {
            return Err(WebsocketError::Handshake(
                "connection closed during handshake",
            ));
        }
        response.extend_from_slice(&buf[..n]);
        if response.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if response.len() > MAX_HANDSHAKE_RESPONSE {
            return Err(WebsocketError::Handshake("handshake response too large"));
        }
    }
    Ok(response)
}

/// Check the upgrade response: status 101, the upgrade headers, and a
/// byte-exact `Sec-WebSocket-Accept` match for our key.
fn validate_handshake_response(response: &[u8], key: &str) -> Result<(), WebsocketError> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut parsed = httparse::Response::new(&mut headers);
    let status = parsed
        .parse(response)
        .map_err(|_| WebsocketError::Handshake("malformed handshake response"))?;
    if !status.is_complete() {
        return Err(WebsocketError::Handshake("incomplete handshake response"));
    }
    if parsed.code != Some(101) {
        return Err(WebsocketError::Handshake(
            "expected status 101 Switching Protocols",
        ));
    }

    let header = |name: &str| {
        parsed
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .and_then(|h| std::str::from_utf8(h.value).ok())
    };
    if !header("Upgrade").is_some_and(|v| v.eq_ignore_ascii_case("websocket")) {
        return Err(WebsocketError::Handshake("missing Upgrade: websocket"));
    }
    if !header("Connection").is_some_and(|v| v.eq_ignore_ascii_case("upgrade")) {
        return Err(WebsocketError::Handshake("missing Connection: Upgrade"));
    }
    let accept = header("Sec-WebSocket-Accept")
        .ok_or(WebsocketError::Handshake("missing Sec-WebSocket-Accept"))?;
    if accept.trim() != accept_key(key) {
        return Err(WebsocketError::HandshakeAccept);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn accepts_ws_and_wss() {
            assert!(Client::new("ws://example.com/chat").is_ok());
            assert!(Client::new("wss://example.com").is_ok());
        }

        #[test]
        fn rejects_other_schemes_and_garbage() {
            assert!(matches!(
                Client::new("http://example.com"),
                Err(WebsocketError::BadUri(_))
            ));
            assert!(matches!(
                Client::new("not a uri"),
                Err(WebsocketError::BadUri(_))
            ));
            assert!(matches!(
                Client::new("ws://"),
                Err(WebsocketError::BadUri(_))
            ));
        }

        #[test]
        fn starts_disconnected() {
            let client = Client::new("ws://example.com").unwrap();
            assert!(!client.is_connected());
            assert!(client.last_opcode().is_none());
            assert!(client.close_status().is_none());
        }
    }

    mod key {
        use super::*;

        #[test]
        fn decodes_to_sixteen_printable_bytes() {
            let key = generate_key();
            let decoded = BASE64.decode(key).unwrap();
            assert_eq!(decoded.len(), 16);
            assert!(decoded.iter().all(|&b| (33..=126).contains(&b)));
        }

        #[test]
        fn keys_differ() {
            assert_ne!(generate_key(), generate_key());
        }

        #[test]
        fn accept_matches_rfc_example() {
            // RFC 6455 section 1.3 sample handshake.
            assert_eq!(
                accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
                "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
            );
        }
    }

    mod request {
        use super::*;

        #[test]
        fn target_defaults_to_slash_and_keeps_query() {
            assert_eq!(request_target(&uri("ws://h")), "/");
            assert_eq!(request_target(&uri("ws://h/chat")), "/chat");
            assert_eq!(request_target(&uri("ws://h/chat?x=1&y=2")), "/chat?x=1&y=2");
        }

        #[test]
        fn base_headers_present() {
            let request = build_request(&uri("ws://example.com:8000/chat"), "KEY", &Options::default());
            assert!(request.starts_with("GET /chat HTTP/1.1\r\n"));
            assert!(request.contains("Host: example.com:8000\r\n"));
            assert!(request.contains(&format!("User-Agent: {USER_AGENT}\r\n")));
            assert!(request.contains("Connection: Upgrade\r\n"));
            assert!(request.contains("Upgrade: websocket\r\n"));
            assert!(request.contains("Sec-WebSocket-Key: KEY\r\n"));
            assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
            assert!(request.ends_with("\r\n\r\n"));
        }

        #[test]
        fn userinfo_becomes_basic_authorization() {
            let request = build_request(&uri("ws://user:pass@example.com/"), "KEY", &Options::default());
            let expected = format!("authorization: Basic {}\r\n", BASE64.encode("user:pass"));
            assert!(request.contains(&expected));
            assert!(request.contains("Host: example.com\r\n"));
        }

        #[test]
        fn user_headers_override_case_sensitively() {
            let options = Options::default().headers([
                ("User-Agent", "custom/1.0"),
                ("x-extra", "yes"),
                ("user-agent", "lowercase-is-a-new-header"),
            ]);
            let request = build_request(&uri("ws://h/"), "KEY", &options);
            assert!(request.contains("User-Agent: custom/1.0\r\n"));
            assert!(!request.contains(&format!("User-Agent: {USER_AGENT}\r\n")));
            assert!(request.contains("x-extra: yes\r\n"));
            assert!(request.contains("user-agent: lowercase-is-a-new-header\r\n"));
        }

        #[test]
        #[allow(deprecated, reason = "exercising the deprecated origin option")]
        fn origin_option_adds_header() {
            let options = Options::default().origin("http://example.com");
            let request = build_request(&uri("ws://h/"), "KEY", &options);
            assert!(request.contains("origin: http://example.com\r\n"));
        }
    }

    mod response {
        use super::*;

        fn response_for(key: &str) -> String {
            format!(
                "HTTP/1.1 101 Switching Protocols\r\n\
                 Upgrade: websocket\r\n\
                 Connection: Upgrade\r\n\
                 Sec-WebSocket-Accept: {}\r\n\r\n",
                accept_key(key)
            )
        }

        #[test]
        fn valid_response_accepted() {
            let response = response_for("KEY");
            assert!(validate_handshake_response(response.as_bytes(), "KEY").is_ok());
        }

        #[test]
        fn accept_header_is_case_insensitive_by_name() {
            let response = format!(
                "HTTP/1.1 101 Switching Protocols\r\n\
                 upgrade: WebSocket\r\n\
                 connection: upgrade\r\n\
                 sec-websocket-accept: {}\r\n\r\n",
                accept_key("KEY")
            );
            assert!(validate_handshake_response(response.as_bytes(), "KEY").is_ok());
        }

        #[test]
        fn mismatched_accept_rejected() {
            let response = response_for("OTHER-KEY");
            assert!(matches!(
                validate_handshake_response(response.as_bytes(), "KEY"),
                Err(WebsocketError::HandshakeAccept)
            ));
        }

        #[test]
        fn wrong_status_rejected() {
            let response = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
            assert!(matches!(
                validate_handshake_response(response.as_bytes(), "KEY"),
                Err(WebsocketError::Handshake(_))
            ));
        }

        #[test]
        fn missing_upgrade_header_rejected() {
            let response = format!(
                "HTTP/1.1 101 Switching Protocols\r\n\
                 Connection: Upgrade\r\n\
                 Sec-WebSocket-Accept: {}\r\n\r\n",
                accept_key("KEY")
            );
            assert!(matches!(
                validate_handshake_response(response.as_bytes(), "KEY"),
                Err(WebsocketError::Handshake(_))
            ));
        }
    }
}
