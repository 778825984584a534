//! OSC 1.0 wire codec.
//!
//! Defines the message/bundle data model, NTP timetags, and the strictly
//! 4-byte aligned binary encode/decode used on the wire.

pub mod bundle;
pub mod error;
pub mod message;
pub mod timetag;
pub mod types;
pub mod wire;

pub use bundle::{decode_bundle, encode_bundle, BUNDLE_TAG, MAX_BUNDLE_DEPTH};
pub use error::{DecodeError, EncodeError};
pub use message::{decode_message, encode_message};
pub use timetag::{NtpTime, Timetag};
pub use types::{Argument, Bundle, Message, Packet};
pub use wire::pad_len;

/// Decodes one OSC packet, choosing bundle or message framing from the
/// leading bytes.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, DecodeError> {
    if bytes.starts_with(BUNDLE_TAG) {
        decode_bundle(bytes).map(Packet::Bundle)
    } else {
        decode_message(bytes).map(Packet::Message)
    }
}

/// Encodes one OSC packet.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, EncodeError> {
    match packet {
        Packet::Message(message) => encode_message(message),
        Packet::Bundle(bundle) => encode_bundle(bundle),
    }
}
