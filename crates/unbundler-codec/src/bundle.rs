use crate::encode_packet;
use crate::error::{DecodeError, EncodeError};
use crate::message::decode_message;
use crate::timetag::Timetag;
use crate::types::{Bundle, Packet};
use crate::wire::Reader;

/// Literal header that opens every bundle.
pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Deepest bundle nesting accepted by the decoder; the outermost bundle is
/// depth 1.
pub const MAX_BUNDLE_DEPTH: usize = 32;

/// Encodes a bundle: header, timetag, then length-prefixed elements.
pub fn encode_bundle(bundle: &Bundle) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(16 + 32 * bundle.elements.len());
    out.extend_from_slice(BUNDLE_TAG);
    out.extend_from_slice(&bundle.timetag.to_bits().to_be_bytes());

    for element in &bundle.elements {
        let encoded = encode_packet(element)?;
        let len = u32::try_from(encoded.len())
            .map_err(|_| EncodeError::ElementTooLarge(encoded.len()))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&encoded);
    }

    Ok(out)
}

/// Decodes a bundle, recursing into nested elements.
pub fn decode_bundle(bytes: &[u8]) -> Result<Bundle, DecodeError> {
    decode_bundle_at(bytes, 1)
}

fn decode_bundle_at(bytes: &[u8], depth: usize) -> Result<Bundle, DecodeError> {
    let mut reader = Reader::new(bytes);
    if reader.take(BUNDLE_TAG.len(), "bundle header")? != BUNDLE_TAG {
        return Err(DecodeError::NotABundle);
    }

    let hi = reader.read_u32("timetag")? as u64;
    let lo = reader.read_u32("timetag")? as u64;
    let timetag = Timetag::from_bits((hi << 32) | lo);

    let mut elements = Vec::new();
    while !reader.is_empty() {
        let declared = reader.read_u32("element length")? as usize;
        if declared > reader.remaining() {
            return Err(DecodeError::ElementOverrun {
                declared,
                remaining: reader.remaining(),
            });
        }
        let payload = reader.take(declared, "element")?;
        let element = decode_element(payload, depth).map_err(|source| DecodeError::Nested {
            index: elements.len(),
            source: Box::new(source),
        })?;
        elements.push(element);
    }

    Ok(Bundle { timetag, elements })
}

fn decode_element(payload: &[u8], depth: usize) -> Result<Packet, DecodeError> {
    if !payload.starts_with(BUNDLE_TAG) {
        return decode_message(payload).map(Packet::Message);
    }
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(DecodeError::TooDeep {
            limit: MAX_BUNDLE_DEPTH,
        });
    }
    decode_bundle_at(payload, depth + 1).map(Packet::Bundle)
}
