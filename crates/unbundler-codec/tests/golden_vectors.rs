use std::time::{Duration, SystemTime};

use unbundler_codec::{
    decode_packet, encode_bundle, encode_message, encode_packet, Argument, Bundle, Message,
    NtpTime, Packet, Timetag,
};

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn read_vector(name: &str) -> String {
    let path = format!("{}/tests/vectors/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(path)
        .expect("vector file must exist")
        .trim()
        .to_string()
}

fn ardosc_message() -> Message {
    Message::new(
        "/ardosc/1",
        vec![Argument::Int(42), Argument::String("on".to_string())],
    )
}

fn mixed_nested_bundle() -> Bundle {
    let at = NtpTime::from_parts(3_950_000_000, 0x4000_0000);
    let inner = Bundle::new(
        Timetag::At(at),
        vec![
            Packet::Message(Message::new("/inner/blob", vec![Argument::Blob(vec![9; 5])])),
            Packet::Bundle(Bundle::new(Timetag::Immediate, vec![])),
        ],
    );
    Bundle::new(
        Timetag::Immediate,
        vec![
            Packet::Message(Message::new("/first", vec![Argument::Float(-0.25)])),
            Packet::Bundle(inner),
            Packet::Message(Message::new(
                "/last",
                vec![
                    Argument::String(String::new()),
                    Argument::Int(0),
                    Argument::Blob(Vec::new()),
                ],
            )),
        ],
    )
}

#[test]
fn golden_ardosc_message_vector_matches() {
    let encoded = encode_message(&ardosc_message()).expect("message should encode");
    let hex = to_hex(&encoded);
    let expected = read_vector("message_ardosc.hex");
    assert_eq!(
        hex, expected,
        "update tests/vectors/message_ardosc.hex to: {hex}"
    );
}

#[test]
fn golden_immediate_bundle_vector_matches() {
    let bundle = Bundle::new(
        Timetag::Immediate,
        vec![Packet::Message(Message::new("/a", vec![Argument::Float(1.0)]))],
    );
    let hex = to_hex(&encode_bundle(&bundle).expect("bundle should encode"));
    let expected = read_vector("bundle_immediate.hex");
    assert_eq!(
        hex, expected,
        "update tests/vectors/bundle_immediate.hex to: {hex}"
    );
}

#[test]
fn golden_blob_message_vector_matches() {
    let m = Message::new("/b", vec![Argument::Blob(vec![1, 2, 3])]);
    let hex = to_hex(&encode_message(&m).expect("message should encode"));
    let expected = read_vector("message_blob.hex");
    assert_eq!(hex, expected, "update tests/vectors/message_blob.hex to: {hex}");
}

#[test]
fn ardosc_message_end_to_end() {
    let encoded = encode_message(&ardosc_message()).expect("message should encode");
    let decoded = decode_packet(&encoded).expect("message should decode");
    let Packet::Message(m) = decoded else {
        panic!("expected a message");
    };
    assert_eq!(m.address, "/ardosc/1");
    assert_eq!(m.args[0].as_int(), Some(42));
    assert_eq!(m.args[1].as_str(), Some("on"));
    assert_eq!(m.args.len(), 2);
}

#[test]
fn message_round_trip_is_lossless() {
    for addr in ["/a", "/abc", "/abcd", "/a/b/c/d/e"] {
        let m = Message::new(
            addr,
            vec![
                Argument::String("x".repeat(addr.len())),
                Argument::Blob((0..addr.len() as u8).collect()),
                Argument::Float(3.5),
                Argument::Int(-7),
            ],
        );
        let encoded = encode_message(&m).expect("message should encode");
        assert_eq!(encoded.len() % 4, 0, "misaligned encoding for {addr}");
        assert_eq!(
            decode_packet(&encoded).expect("message should decode"),
            Packet::Message(m)
        );
    }
}

#[test]
fn nested_bundle_round_trip_preserves_order_and_timetags() {
    let bundle = Packet::Bundle(mixed_nested_bundle());
    let encoded = encode_packet(&bundle).expect("bundle should encode");
    assert_eq!(encoded.len() % 4, 0);
    let decoded = decode_packet(&encoded).expect("bundle should decode");
    assert_eq!(decoded, bundle);
}

#[test]
fn immediate_timetag_round_trips_as_immediate() {
    let bundle = Bundle::new(Timetag::Immediate, vec![]);
    let decoded = decode_packet(&encode_bundle(&bundle).expect("bundle should encode"))
        .expect("bundle should decode");
    let Packet::Bundle(b) = decoded else {
        panic!("expected a bundle");
    };
    assert_eq!(b.timetag, Timetag::Immediate);
}

#[test]
fn wall_clock_timetag_round_trips_within_fraction_precision() {
    let when = SystemTime::now() + Duration::from_millis(1_234);
    let bundle = Bundle::new(Timetag::from(when), vec![]);
    let decoded = decode_packet(&encode_bundle(&bundle).expect("bundle should encode"))
        .expect("bundle should decode");
    let Packet::Bundle(b) = decoded else {
        panic!("expected a bundle");
    };
    let back = b.timetag.instant().expect("timetag should be scheduled").to_system_time();
    let diff = match back.duration_since(when) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    assert!(diff <= Duration::from_nanos(1), "diff was {diff:?}");
}

#[test]
fn blob_length_past_end_is_a_decode_error() {
    // "/b", ",b", then a blob claiming 1000 bytes with only 4 present.
    let mut bytes = b"/b\0\0,b\0\0".to_vec();
    bytes.extend_from_slice(&1000_u32.to_be_bytes());
    bytes.extend_from_slice(&[1, 2, 3, 4]);
    let err = decode_packet(&bytes).expect_err("blob overrun must fail");
    assert!(
        err.to_string().contains("blob length 1000"),
        "unexpected error: {err}"
    );
}
