// Engine.IO v4 / Socket.IO v5 text-frame codec.
//
// Only the text encoding is supported; binary attachments are rejected.
// Frame layout (one websocket text message per engine packet):
//
//   <engine type>[<socket type>[<attachments>-][/<nsp>,][<ack id>]<json>]
//
// e.g. `42["newPost",{...}]` is an engine MESSAGE carrying a socket EVENT
// on the default namespace.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

pub const DEFAULT_NAMESPACE: &str = "/";

/// Server handshake carried by the engine OPEN packet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    #[serde(default)]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// An event on the default namespace without an ack.
    pub fn event(name: &str, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            name: name.to_string(),
            args,
        }
    }

    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

pub fn decode(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars.next().context("Empty engine frame")?;
    let rest = chars.as_str();

    let packet = match kind {
        '0' => EnginePacket::Open(
            serde_json::from_str(rest).context("Invalid engine handshake")?,
        ),
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping(rest.to_string()),
        '3' => EnginePacket::Pong(rest.to_string()),
        '4' => EnginePacket::Message(decode_socket(rest)?),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => anyhow::bail!("Unknown engine packet type '{other}'"),
    };
    Ok(packet)
}

pub fn encode(packet: &EnginePacket) -> String {
    match packet {
        // Clients never send OPEN; encode it as a bare type for completeness.
        EnginePacket::Open(_) => "0".to_string(),
        EnginePacket::Close => "1".to_string(),
        EnginePacket::Ping(data) => format!("2{data}"),
        EnginePacket::Pong(data) => format!("3{data}"),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_string(),
        EnginePacket::Noop => "6".to_string(),
    }
}

fn decode_socket(input: &str) -> Result<SocketPacket> {
    let mut chars = input.chars();
    let kind = chars.next().context("Empty socket packet")?;
    let mut rest = chars.as_str();

    if kind == '5' || kind == '6' {
        anyhow::bail!("Binary socket packets are not supported");
    }

    let mut namespace = DEFAULT_NAMESPACE;
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => {
                namespace = &rest[..comma];
                rest = &rest[comma + 1..];
            }
            None => {
                namespace = rest;
                rest = "";
            }
        }
    }
    let namespace = namespace.to_string();

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let ack_id = if digits > 0 {
        Some(rest[..digits].parse::<u64>().context("Invalid ack id")?)
    } else {
        None
    };
    rest = &rest[digits..];

    let payload: Option<Value> = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest).context("Invalid socket packet payload")?)
    };

    let packet = match kind {
        '0' => SocketPacket::Connect {
            namespace,
            data: payload,
        },
        '1' => SocketPacket::Disconnect { namespace },
        '2' => {
            let mut args = match payload {
                Some(Value::Array(items)) => items,
                _ => anyhow::bail!("Socket event payload must be an array"),
            };
            if args.is_empty() {
                anyhow::bail!("Socket event has no name");
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => anyhow::bail!("Socket event name must be a string, got {other}"),
            };
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            }
        }
        '3' => SocketPacket::Ack {
            namespace,
            ack_id: ack_id.context("Ack packet without id")?,
            args: match payload {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            },
        },
        '4' => SocketPacket::ConnectError {
            namespace,
            data: payload,
        },
        other => anyhow::bail!("Unknown socket packet type '{other}'"),
    };
    Ok(packet)
}

fn encode_socket(packet: &SocketPacket) -> String {
    fn prefix(kind: char, namespace: &str) -> String {
        if namespace == DEFAULT_NAMESPACE {
            kind.to_string()
        } else {
            format!("{kind}{namespace},")
        }
    }

    match packet {
        SocketPacket::Connect { namespace, data } => {
            let mut out = prefix('0', namespace);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
        SocketPacket::Disconnect { namespace } => prefix('1', namespace),
        SocketPacket::Event {
            namespace,
            ack_id,
            name,
            args,
        } => {
            let mut out = prefix('2', namespace);
            if let Some(id) = ack_id {
                out.push_str(&id.to_string());
            }
            let mut payload = Vec::with_capacity(args.len() + 1);
            payload.push(Value::String(name.clone()));
            payload.extend(args.iter().cloned());
            out.push_str(&Value::Array(payload).to_string());
            out
        }
        SocketPacket::Ack {
            namespace,
            ack_id,
            args,
        } => {
            let mut out = prefix('3', namespace);
            out.push_str(&ack_id.to_string());
            out.push_str(&Value::Array(args.clone()).to_string());
            out
        }
        SocketPacket::ConnectError { namespace, data } => {
            let mut out = prefix('4', namespace);
            if let Some(data) = data {
                out.push_str(&data.to_string());
            }
            out
        }
    }
}

/// Text frame for emitting `name(args...)` on the default namespace.
pub fn emit_frame(name: &str, args: Vec<Value>) -> String {
    encode(&EnginePacket::Message(SocketPacket::event(name, args)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connect_frame_is_forty() {
        assert_eq!(encode(&EnginePacket::Message(SocketPacket::connect())), "40");
    }

    #[test]
    fn namespaced_event_keeps_namespace_and_ack() {
        let frame = r#"42/feed,7["newPost",{"a":1}]"#;
        match decode(frame).unwrap() {
            EnginePacket::Message(SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            }) => {
                assert_eq!(namespace, "/feed");
                assert_eq!(ack_id, Some(7));
                assert_eq!(name, "newPost");
                assert_eq!(args, vec![json!({"a": 1})]);
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }
}
