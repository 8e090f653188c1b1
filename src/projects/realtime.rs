//! Real-time channel used to fetch a project's document tree
//!
//! The service speaks the legacy socket.io 0.9 framing
//! (`type:id:endpoint:data`). Only two frames matter here: the
//! connection acknowledgment (`1::`) and the acknowledgment of our
//! `joinProject` request (`6:::1+[...]`). Every other frame is an error.

use crate::error::{OlError, OlResult};
use serde_json::Value;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::{COOKIE, USER_AGENT};
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// Acknowledgment id attached to the `joinProject` request
pub const JOIN_ACK_ID: &str = "1";

/// A decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The server accepted the connection
    Connected,
    /// Reply to `joinProject`
    JoinReply(JoinReply),
}

/// Arguments of the `joinProject` acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct JoinReply {
    /// Error argument; `None` when the join succeeded
    pub error: Option<Value>,
    /// Project document, including its folder tree
    pub project: Value,
    /// Privilege level granted to the user, when reported
    pub permission: Option<String>,
}

/// Decode a single text frame, failing on anything but the two expected shapes
pub fn decode_frame(raw: &str) -> OlResult<Frame> {
    let mut parts = raw.splitn(4, ':');
    let kind = parts.next().unwrap_or_default();
    let _message_id = parts.next();
    let endpoint = parts.next();
    let data = parts.next();

    match kind {
        "1" if endpoint.is_some_and(str::is_empty) => Ok(Frame::Connected),
        "6" => decode_ack(data.unwrap_or_default()),
        "7" => Err(OlError::Protocol(format!(
            "service reported an error: {}",
            data.unwrap_or("unknown")
        ))),
        "0" => Err(OlError::Protocol("service closed the connection".into())),
        _ => Err(OlError::Protocol(format!(
            "unexpected frame '{}'",
            abbreviate(raw)
        ))),
    }
}

fn decode_ack(data: &str) -> OlResult<Frame> {
    let (id, args) = data
        .split_once('+')
        .ok_or_else(|| OlError::Protocol(format!("malformed acknowledgment '{}'", abbreviate(data))))?;
    if id != JOIN_ACK_ID {
        return Err(OlError::Protocol(format!(
            "acknowledgment for unknown request {}",
            id
        )));
    }

    let args: Vec<Value> = serde_json::from_str(args)
        .map_err(|e| OlError::Protocol(format!("malformed joinProject reply: {}", e)))?;
    let mut args = args.into_iter();

    let error = args.next().filter(|v| !v.is_null());
    let project = args.next().unwrap_or(Value::Null);
    let permission = args.next().and_then(|v| v.as_str().map(str::to_string));

    if error.is_none() && !project.is_object() {
        return Err(OlError::Protocol("joinProject reply has no project".into()));
    }

    Ok(Frame::JoinReply(JoinReply {
        error,
        project,
        permission,
    }))
}

/// The `joinProject` event packet, requesting acknowledgment [`JOIN_ACK_ID`]
pub fn join_project_packet(project_id: &str) -> String {
    let event = serde_json::json!({
        "name": "joinProject",
        "args": [{ "project_id": project_id }],
    });
    format!("5:{}+::{}", JOIN_ACK_ID, event)
}

/// Extract the session id from the handshake reply
/// (`sid:heartbeat:close:transports`)
pub fn parse_handshake(body: &str) -> OlResult<String> {
    let mut fields = body.trim().split(':');
    let sid = fields.next().unwrap_or_default();
    if sid.is_empty() || sid.contains(char::is_whitespace) || sid.contains('<') {
        return Err(OlError::Protocol(format!(
            "malformed handshake reply '{}'",
            abbreviate(body)
        )));
    }

    if let Some(transports) = fields.nth(2) {
        if !transports.split(',').any(|t| t == "websocket") {
            return Err(OlError::Protocol(format!(
                "service does not offer websocket transport ({})",
                transports
            )));
        }
    }

    Ok(sid.to_string())
}

/// WebSocket URL for a handshake session id
pub fn websocket_url(base_url: &str, sid: &str) -> OlResult<String> {
    let rest = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        return Err(OlError::Protocol(format!(
            "cannot derive socket URL from {}",
            base_url
        )));
    };
    Ok(format!(
        "{}/socket.io/1/websocket/{}",
        rest.trim_end_matches('/'),
        sid
    ))
}

fn abbreviate(s: &str) -> String {
    const MAX: usize = 60;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// An open bidirectional text channel
pub trait RealtimeChannel {
    fn send_text(&mut self, text: &str) -> OlResult<()>;

    /// Next protocol-level text frame
    fn recv_text(&mut self) -> OlResult<String>;

    fn close(&mut self);
}

/// Opens real-time channels
pub trait RealtimeConnector {
    fn connect(
        &self,
        url: &str,
        cookie_header: Option<&str>,
        user_agent: &str,
        timeout: Duration,
    ) -> OlResult<Box<dyn RealtimeChannel>>;
}

/// Connect, join a project, and return the reply.
///
/// Exactly one request/reply round trip; no further frames are read.
pub fn join_project(channel: &mut dyn RealtimeChannel, project_id: &str) -> OlResult<JoinReply> {
    match decode_frame(&channel.recv_text()?)? {
        Frame::Connected => debug!("Real-time connection accepted"),
        Frame::JoinReply(_) => {
            return Err(OlError::Protocol(
                "expected connection acknowledgment, got joinProject reply".into(),
            ))
        }
    }

    channel.send_text(&join_project_packet(project_id))?;

    match decode_frame(&channel.recv_text()?)? {
        Frame::JoinReply(reply) => Ok(reply),
        Frame::Connected => Err(OlError::Protocol(
            "expected joinProject reply, got a second connection acknowledgment".into(),
        )),
    }
}

/// Blocking WebSocket connector built on tungstenite
pub struct TungsteniteConnector;

struct TungsteniteChannel {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl RealtimeConnector for TungsteniteConnector {
    fn connect(
        &self,
        url: &str,
        cookie_header: Option<&str>,
        user_agent: &str,
        timeout: Duration,
    ) -> OlResult<Box<dyn RealtimeChannel>> {
        let mut request = url
            .into_client_request()
            .map_err(|e| OlError::Protocol(format!("invalid socket URL {}: {}", url, e)))?;

        let headers = request.headers_mut();
        if let Some(cookies) = cookie_header {
            let value = HeaderValue::from_str(cookies)
                .map_err(|e| OlError::Protocol(format!("invalid cookie header: {}", e)))?;
            headers.insert(COOKIE, value);
        }
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let uri = request.uri();
        let host = uri
            .host()
            .ok_or_else(|| OlError::Protocol(format!("socket URL {} has no host", url)))?
            .to_string();
        let port = uri
            .port_u16()
            .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| OlError::Protocol(format!("resolving {}: {}", host, e)))?
            .next()
            .ok_or_else(|| OlError::Protocol(format!("no address for {}", host)))?;

        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| OlError::Protocol(format!("connecting to {}: {}", host, e)))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)))
            .map_err(|e| OlError::Protocol(format!("configuring socket: {}", e)))?;

        let (socket, _response) = tungstenite::client_tls(request, stream)
            .map_err(|e| OlError::Protocol(format!("websocket handshake failed: {}", e)))?;

        debug!("Connected real-time channel to {}", host);
        Ok(Box::new(TungsteniteChannel { socket }))
    }
}

impl RealtimeChannel for TungsteniteChannel {
    fn send_text(&mut self, text: &str) -> OlResult<()> {
        self.socket
            .send(Message::Text(text.to_string()))
            .map_err(socket_error)
    }

    fn recv_text(&mut self) -> OlResult<String> {
        loop {
            if let Some(text) = message_text(self.socket.read().map_err(socket_error)?)? {
                return Ok(text);
            }
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

/// Payload of a text message; `None` for control frames to skip
fn message_text(message: Message) -> OlResult<Option<String>> {
    match message {
        Message::Text(text) => Ok(Some(text)),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(None),
        Message::Close(_) => Err(OlError::Protocol("connection closed by service".into())),
        Message::Binary(_) => Err(OlError::Protocol("unexpected binary frame".into())),
    }
}

fn socket_error(e: tungstenite::Error) -> OlError {
    match e {
        tungstenite::Error::Io(ref io)
            if matches!(io.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
        {
            OlError::Protocol("timed out waiting for the service".into())
        }
        other => OlError::Protocol(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted channel for unit tests

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Frames sent by the client, plus whether the channel was closed
    #[derive(Debug, Default)]
    pub struct ChannelLog {
        pub url: Option<String>,
        pub cookie_header: Option<String>,
        pub sent: Vec<String>,
        pub closed: bool,
    }

    pub struct ScriptedConnector {
        frames: RefCell<Option<VecDeque<OlResult<String>>>>,
        pub log: Rc<RefCell<ChannelLog>>,
    }

    impl ScriptedConnector {
        pub fn new(frames: Vec<OlResult<String>>) -> Self {
            Self {
                frames: RefCell::new(Some(frames.into())),
                log: Rc::default(),
            }
        }
    }

    struct ScriptedChannel {
        frames: VecDeque<OlResult<String>>,
        log: Rc<RefCell<ChannelLog>>,
    }

    impl RealtimeConnector for ScriptedConnector {
        fn connect(
            &self,
            url: &str,
            cookie_header: Option<&str>,
            _user_agent: &str,
            _timeout: Duration,
        ) -> OlResult<Box<dyn RealtimeChannel>> {
            {
                let mut log = self.log.borrow_mut();
                log.url = Some(url.to_string());
                log.cookie_header = cookie_header.map(str::to_string);
            }
            let frames = self.frames.borrow_mut().take().unwrap_or_default();
            Ok(Box::new(ScriptedChannel {
                frames,
                log: Rc::clone(&self.log),
            }))
        }
    }

    impl RealtimeChannel for ScriptedChannel {
        fn send_text(&mut self, text: &str) -> OlResult<()> {
            self.log.borrow_mut().sent.push(text.to_string());
            Ok(())
        }

        fn recv_text(&mut self) -> OlResult<String> {
            self.frames
                .pop_front()
                .unwrap_or_else(|| Err(OlError::Protocol("connection closed by service".into())))
        }

        fn close(&mut self) {
            self.log.borrow_mut().closed = true;
        }
    }
}
