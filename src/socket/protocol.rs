/// Engine.IO (v3/v4) / Socket.IO text frame codec
///
/// Every WebSocket text message is one Engine.IO packet: a single digit type
/// followed by its payload. Type `4` (message) wraps a Socket.IO packet, whose
/// own type digit is followed by an optional `/namespace,`, an optional ack
/// id and a JSON body. Only the default namespace is used by the bridge.
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const CONNECT: &str = "40";
pub const DISCONNECT: &str = "41";
pub const PING: &str = "2";
pub const PONG: &str = "3";
pub const DEFAULT_NAMESPACE: &str = "/";

const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;

/// Engine.IO protocol revision spoken by the bridge.
///
/// v3 (Socket.IO 1.x/2.x servers) expects the client to send the heartbeat
/// and joins the default namespace on its own. v4 servers ping the client and
/// wait for an explicit namespace CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineIo {
    #[default]
    V3,
    V4,
}

impl EngineIo {
    /// Value of the `EIO` query parameter
    pub fn query_value(self) -> &'static str {
        match self {
            EngineIo::V3 => "3",
            EngineIo::V4 => "4",
        }
    }

    pub fn client_sends_pings(self) -> bool {
        self == EngineIo::V3
    }

    pub fn client_joins_namespace(self) -> bool {
        self == EngineIo::V4
    }
}

impl FromStr for EngineIo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "3" => Ok(EngineIo::V3),
            "4" => Ok(EngineIo::V4),
            other => Err(other.to_string()),
        }
    }
}

/// Heartbeat period announced in the open handshake
pub fn ping_interval(handshake: &Value) -> Duration {
    let millis = handshake
        .get("pingInterval")
        .and_then(Value::as_u64)
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_PING_INTERVAL_MS);
    Duration::from_millis(millis)
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type '{0}'")]
    UnknownPacket(char),
    #[error("unknown socket.io packet type '{0}'")]
    UnknownMessage(char),
    #[error("event frame is not an array headed by a name")]
    MalformedEvent,
    #[error("invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Engine.IO handshake carrying sid, pingInterval and pingTimeout
    Open(Value),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace join acknowledged
    Connected,
    /// Server dropped us from the namespace
    Disconnected,
    Event {
        namespace: String,
        name: String,
        args: Vec<Value>,
    },
    Ack,
    ConnectError(String),
    /// Upgrade probes and binary packets, which a websocket-only text client
    /// never needs
    Unsupported(char),
}

pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_message(rest),
        '5' => Ok(Frame::Unsupported(kind)),
        '6' => Ok(Frame::Noop),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn decode_message(text: &str) -> Result<Frame, ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let (namespace, body) = split_namespace(chars.as_str());
    let body = strip_ack_id(body);

    match kind {
        '0' => Ok(Frame::Connected),
        '1' => Ok(Frame::Disconnected),
        '2' => decode_event(namespace, body),
        '3' => Ok(Frame::Ack),
        '4' => Ok(Frame::ConnectError(connect_error_message(body))),
        '5' | '6' => Ok(Frame::Unsupported(kind)),
        other => Err(ProtocolError::UnknownMessage(other)),
    }
}

fn decode_event(namespace: &str, body: &str) -> Result<Frame, ProtocolError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::MalformedEvent);
    };
    if items.is_empty() {
        return Err(ProtocolError::MalformedEvent);
    }
    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::MalformedEvent);
    };
    Ok(Frame::Event {
        namespace: namespace.to_string(),
        name,
        args: items,
    })
}

fn connect_error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("connection refused")
            .to_string(),
        Ok(Value::String(message)) => message,
        _ => body.to_string(),
    }
}

fn split_namespace(text: &str) -> (&str, &str) {
    if !text.starts_with('/') {
        return (DEFAULT_NAMESPACE, text);
    }
    match text.find(',') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    }
}

fn strip_ack_id(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// `42["name",arg,...]`, the frame a bridge sends for each event
pub fn encode_event(name: &str, args: &[Value]) -> String {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(Value::String(name.to_string()));
    items.extend(args.iter().cloned());
    format!("42{}", Value::Array(items))
}
