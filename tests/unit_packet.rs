// Unit tests for the Socket.IO text-frame codec used by the live channel.

use serde_json::json;

use castfeed::realtime::packet::{decode, emit_frame, encode, EnginePacket, SocketPacket};
use castfeed::realtime::{JOIN_ROOM, LEAVE_ROOM};

// ============================================================
// Engine layer
// ============================================================

#[test]
fn open_packet_carries_handshake() {
    let frame = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    match decode(frame).unwrap() {
        EnginePacket::Open(handshake) => {
            assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
            assert_eq!(handshake.ping_interval, 25_000);
            assert_eq!(handshake.ping_timeout, 20_000);
            assert_eq!(handshake.max_payload, Some(1_000_000));
        }
        other => panic!("expected open packet, got {other:?}"),
    }
}

#[test]
fn ping_is_answered_with_matching_pong() {
    let ping = decode("2").unwrap();
    assert_eq!(ping, EnginePacket::Ping(String::new()));

    if let EnginePacket::Ping(data) = ping {
        assert_eq!(encode(&EnginePacket::Pong(data)), "3");
    }
    assert_eq!(encode(&EnginePacket::Pong("probe".to_string())), "3probe");
}

#[test]
fn close_and_noop_decode() {
    assert_eq!(decode("1").unwrap(), EnginePacket::Close);
    assert_eq!(decode("6").unwrap(), EnginePacket::Noop);
}

#[test]
fn empty_or_unknown_frames_are_rejected() {
    assert!(decode("").is_err());
    assert!(decode("9").is_err());
    assert!(decode("0not-json").is_err());
}

// ============================================================
// Socket layer
// ============================================================

#[test]
fn room_emits_use_default_namespace() {
    assert_eq!(
        emit_frame(JOIN_ROOM, vec![json!("level-county-Nairobi")]),
        r#"42["joinRoom","level-county-Nairobi"]"#
    );
    assert_eq!(
        emit_frame(LEAVE_ROOM, vec![json!("level-ward-Kilimani")]),
        r#"42["leaveRoom","level-ward-Kilimani"]"#
    );
}

#[test]
fn pushed_event_decodes_name_and_payload() {
    let frame = r#"42["deletePost","665f0c"]"#;

    assert_eq!(
        decode(frame).unwrap(),
        EnginePacket::Message(SocketPacket::event("deletePost", vec![json!("665f0c")]))
    );
}

#[test]
fn namespace_connect_ack_carries_sid() {
    match decode(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap() {
        EnginePacket::Message(SocketPacket::Connect { namespace, data }) => {
            assert_eq!(namespace, "/");
            assert_eq!(data, Some(json!({ "sid": "wZX3oN0bSVIhsaknAAAI" })));
        }
        other => panic!("expected connect, got {other:?}"),
    }
}

#[test]
fn connect_error_is_surfaced() {
    assert_eq!(
        decode(r#"44{"message":"Not authorized"}"#).unwrap(),
        EnginePacket::Message(SocketPacket::ConnectError {
            namespace: "/".to_string(),
            data: Some(json!({ "message": "Not authorized" })),
        })
    );
}

#[test]
fn ack_packet_keeps_id() {
    assert_eq!(
        decode(r#"4312["ok"]"#).unwrap(),
        EnginePacket::Message(SocketPacket::Ack {
            namespace: "/".to_string(),
            ack_id: 12,
            args: vec![json!("ok")],
        })
    );
}

#[test]
fn disconnect_encodes_for_namespaces() {
    assert_eq!(encode(&EnginePacket::Message(SocketPacket::disconnect())), "41");
    assert_eq!(
        encode(&EnginePacket::Message(SocketPacket::Disconnect {
            namespace: "/admin".to_string()
        })),
        "41/admin,"
    );
}

#[test]
fn binary_and_malformed_events_are_rejected() {
    assert!(decode(r#"451-["upload",{"_placeholder":true,"num":0}]"#).is_err());
    assert!(decode("42[]").is_err());
    assert!(decode(r#"42[7,"x"]"#).is_err());
    assert!(decode(r#"42{"not":"an array"}"#).is_err());
}
