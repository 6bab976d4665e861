//! Integration tests for packwire.
//!
//! These tests drive the public API the way a transport would: acquire a
//! packet, encode its header and body regions, carry the bytes, decode
//! them into a reader-side packet, release both.

use std::any::Any;
use std::sync::Arc;

use packwire::error::Result;
use packwire::{
    acquire, release, Body, Codec, CodecRegistry, Header, Packet, PacketSetting, PackwireError,
};
use serde_json::{json, Value};

fn fill_ping(header: &mut Header) {
    header.seq = 7;
    header.message_type = 1;
    header.uri = "/ping".to_string();
    header.gzip_level = 0;
    header.status_code = 200;
    header.status = "OK".to_string();
}

fn ping_header_bytes() -> Vec<u8> {
    let mut packet = Packet::new();
    fill_ping(packet.header_mut());
    packet.encode_header().to_vec()
}

/// Test a full write/read cycle with a JSON body.
#[test]
fn test_full_packet_exchange() {
    // Writer side
    let mut writer = acquire(
        None,
        [
            PacketSetting::BodyCodec("json".into()),
            PacketSetting::BodyGzip(0),
        ],
    )
    .unwrap();
    writer.header_mut().seq = 1;
    writer.header_mut().message_type = 2;
    writer.header_mut().uri = "/api/echo".to_string();
    writer.set_body(Box::new(json!({"echo": "hello", "n": 3})));

    let header_bytes = writer.encode_header();
    let body_bytes = writer.encode_body().unwrap();
    assert_eq!(
        writer.length(),
        (header_bytes.len() + body_bytes.len()) as u64
    );
    release(writer);

    // Reader side
    let mut reader = acquire(None, [PacketSetting::BodyCodec("json".into())]).unwrap();
    reader.decode_header(&header_bytes).unwrap();
    reader.decode_body(&body_bytes).unwrap();

    assert_eq!(reader.header().seq, 1);
    assert_eq!(reader.header().message_type, 2);
    assert_eq!(reader.header().uri, "/api/echo");
    let body = reader.body().unwrap();
    assert_eq!(
        body.downcast_ref::<Value>(),
        Some(&json!({"echo": "hello", "n": 3}))
    );
    release(reader);
}

/// Test the exact header byte image for a ping response.
#[test]
fn test_ping_header_byte_image() {
    let encoded = ping_header_bytes();

    // seq=7, type=1, uri="/ping", gzip absent, status_code=200, status="OK"
    let mut expected = vec![0x08, 0x07, 0x10, 0x01, 0x1a, 0x05];
    expected.extend_from_slice(b"/ping");
    expected.extend_from_slice(&[0x28, 0xc8, 0x01, 0x32, 0x02]);
    expected.extend_from_slice(b"OK");
    assert_eq!(encoded, expected);

    let mut reader = Packet::new();
    reader.decode_header(&encoded).unwrap();
    assert_eq!(reader.header().seq, 7);
    assert_eq!(reader.header().message_type, 1);
    assert_eq!(reader.header().uri, "/ping");
    assert_eq!(reader.header().gzip_level, 0);
    assert_eq!(reader.header().status_code, 200);
    assert_eq!(reader.header().status, "OK");
    assert_eq!(reader.header_length(), encoded.len() as u64);
}

/// Test that unknown header fields are skipped without error.
#[test]
fn test_unknown_fields_are_ignored() {
    let mut encoded = ping_header_bytes();
    // field 7, varint 42
    encoded.extend_from_slice(&[0x38, 0x2a]);
    // field 9, 3-byte blob
    encoded.extend_from_slice(&[0x4a, 0x03, 0xde, 0xad, 0xbe]);

    let mut reader = Packet::new();
    reader.decode_header(&encoded).unwrap();
    assert_eq!(reader.header().seq, 7);
    assert_eq!(reader.header().message_type, 1);
    assert_eq!(reader.header().uri, "/ping");
    assert_eq!(reader.header().status_code, 200);
    assert_eq!(reader.header().status, "OK");
}

/// Test that truncation at any byte boundary errors or yields a clean
/// prefix of the fields, never a misread value.
#[test]
fn test_truncation_never_misreads() {
    let encoded = ping_header_bytes();

    for cut in 0..encoded.len() {
        let mut reader = Packet::new();
        match reader.decode_header(&encoded[..cut]) {
            Ok(()) => {
                let header = reader.header();
                assert!(header.seq == 0 || header.seq == 7, "cut {}", cut);
                assert!(
                    header.message_type == 0 || header.message_type == 1,
                    "cut {}",
                    cut
                );
                assert!(header.uri.is_empty() || header.uri == "/ping", "cut {}", cut);
                assert!(
                    header.status_code == 0 || header.status_code == 200,
                    "cut {}",
                    cut
                );
                assert!(header.status.is_empty() || header.status == "OK", "cut {}", cut);
            }
            Err(PackwireError::UnexpectedEndOfInput { .. })
            | Err(PackwireError::TruncatedInput { .. }) => {}
            Err(other) => panic!("unexpected error at cut {}: {:?}", cut, other),
        }
    }
}

/// Test that the gzip level set through a packet setting travels in the
/// header region.
#[test]
fn test_gzip_setting_travels_in_header() {
    let mut writer = acquire(None, [PacketSetting::BodyGzip(6)]).unwrap();
    writer.header_mut().seq = 3;
    let encoded = writer.encode_header();
    release(writer);

    let mut reader = Packet::new();
    reader.decode_header(&encoded).unwrap();
    assert_eq!(reader.header().seq, 3);
    assert_eq!(reader.header().gzip_level, 6);
}

/// Test a MessagePack body roundtrip between two pooled packets.
#[test]
fn test_msgpack_body_roundtrip() {
    let mut writer = acquire(None, [PacketSetting::BodyCodec("msgpack".into())]).unwrap();
    writer.set_body(Box::new(json!({"id": 42, "tags": ["a", "b"]})));
    let encoded = writer.encode_body().unwrap();
    release(writer);

    let mut reader = acquire(None, [PacketSetting::BodyCodec("msgpack".into())]).unwrap();
    reader.decode_body(&encoded).unwrap();
    assert_eq!(
        reader.body().unwrap().downcast_ref::<Value>(),
        Some(&json!({"id": 42, "tags": ["a", "b"]}))
    );
    release(reader);
}

/// Test that the read-path resolver runs against the decoded header.
#[test]
fn test_resolver_on_read_path() {
    let mut writer = acquire(None, []).unwrap();
    writer.header_mut().seq = 11;
    writer.header_mut().uri = "/events".to_string();
    let header_bytes = writer.encode_header();
    release(writer);

    let resolver = Box::new(|header: &Header| -> Body {
        Box::new(format!("handler for {}", header.uri))
    });
    let mut reader = acquire(Some(resolver), []).unwrap();
    reader.decode_header(&header_bytes).unwrap();
    // Header-only message: the body region is empty.
    reader.decode_body(&[]).unwrap();

    let body = reader.resolve_body().unwrap();
    assert_eq!(
        body.downcast_ref::<String>().map(String::as_str),
        Some("handler for /events")
    );
    release(reader);
}

struct ReverseCodec;

impl Codec for ReverseCodec {
    fn encode(&self, body: &(dyn Any + Send)) -> Result<Vec<u8>> {
        let bytes = body
            .downcast_ref::<Vec<u8>>()
            .ok_or(PackwireError::UnsupportedBody { codec: "reverse" })?;
        Ok(bytes.iter().rev().copied().collect())
    }

    fn decode(&self, buf: &[u8]) -> Result<Body> {
        let bytes: Vec<u8> = buf.iter().rev().copied().collect();
        Ok(Box::new(bytes))
    }
}

/// Test that a custom codec registered at runtime is usable by name.
#[test]
fn test_custom_codec_registration() {
    CodecRegistry::global()
        .register("reverse", 42, Arc::new(ReverseCodec))
        .unwrap();

    let mut packet = acquire(None, [PacketSetting::BodyCodec("reverse".into())]).unwrap();
    assert_eq!(packet.body_codec(), 42);
    assert_eq!(packet.body_codec_name(), "reverse");

    packet.set_body(Box::new(vec![1u8, 2, 3]));
    let encoded = packet.encode_body().unwrap();
    assert_eq!(&encoded[..], &[3, 2, 1]);

    packet.decode_body(&encoded).unwrap();
    assert_eq!(
        packet.body().unwrap().downcast_ref::<Vec<u8>>(),
        Some(&vec![1u8, 2, 3])
    );
    release(packet);
}

/// Test that an unknown codec name fails recoverably and works after
/// registration.
#[test]
fn test_codec_not_found_is_recoverable() {
    let err = acquire(None, [PacketSetting::BodyCodec("custom-late".into())]).unwrap_err();
    assert!(matches!(err, PackwireError::CodecNotFound(_)));

    CodecRegistry::global()
        .register("custom-late", 0x63, Arc::new(ReverseCodec))
        .unwrap();

    let packet = acquire(None, [PacketSetting::BodyCodec("custom-late".into())]).unwrap();
    assert_eq!(packet.body_codec(), 0x63);
    release(packet);
}

/// Test that a released packet always comes back in the unset state.
#[test]
fn test_released_packet_comes_back_clean() {
    let mut packet = acquire(
        None,
        [
            PacketSetting::BodyCodec("json".into()),
            PacketSetting::BodyGzip(9),
        ],
    )
    .unwrap();
    packet.header_mut().seq = 77;
    packet.header_mut().status = "INTERNAL".to_string();
    packet.set_body(Box::new(json!({"big": "payload"})));
    packet.encode_header();
    packet.encode_body().unwrap();
    release(packet);

    let packet = acquire(None, []).unwrap();
    assert!(packet.header().is_empty());
    assert_eq!(packet.header_codec(), 0);
    assert_eq!(packet.body_codec(), 0);
    assert!(packet.body().is_none());
    assert_eq!(packet.length(), 0);
    release(packet);
}
