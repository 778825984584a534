use crate::error::{DecodeError, EncodeError};
use crate::types::{Argument, Message};
use crate::wire::{put_blob, put_string, Reader};

/// Validates an address for encoding.
///
/// A leading `/` also keeps messages from being mistaken for `#bundle`.
fn validate_address(address: &str) -> Result<(), EncodeError> {
    if !address.starts_with('/') || address.contains('\0') {
        return Err(EncodeError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

/// Encodes a message into its padded wire form.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, EncodeError> {
    validate_address(&message.address)?;

    let mut tags = String::with_capacity(message.args.len() + 1);
    tags.push(',');
    for arg in &message.args {
        tags.push(arg.type_tag() as char);
    }

    let capacity = message.address.len() + tags.len() + 8 * message.args.len() + 8;
    let mut out = Vec::with_capacity(capacity);
    put_string(&mut out, &message.address);
    put_string(&mut out, &tags);

    for arg in &message.args {
        match arg {
            Argument::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Argument::Float(v) => out.extend_from_slice(&v.to_bits().to_be_bytes()),
            Argument::String(v) => {
                if v.contains('\0') {
                    return Err(EncodeError::NulInString);
                }
                put_string(&mut out, v);
            }
            Argument::Blob(v) => {
                let len = u32::try_from(v.len()).map_err(|_| EncodeError::BlobTooLarge(v.len()))?;
                put_blob(&mut out, len, v);
            }
        }
    }

    Ok(out)
}

/// Decodes a message from its wire form.
///
/// A buffer that ends right after the address decodes with no arguments,
/// as sent by implementations predating type-tag strings. Bytes after the
/// last argument are ignored.
pub fn decode_message(bytes: &[u8]) -> Result<Message, DecodeError> {
    let mut reader = Reader::new(bytes);
    let address = reader.read_string()?.to_string();

    if reader.is_empty() {
        return Ok(Message {
            address,
            args: Vec::new(),
        });
    }

    let tags = reader.read_string()?;
    let tags = tags
        .strip_prefix(',')
        .ok_or(DecodeError::MissingTypeTagComma)?;

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let arg = match tag {
            'i' => Argument::Int(reader.read_u32("int32")? as i32),
            'f' => Argument::Float(f32::from_bits(reader.read_u32("float32")?)),
            's' => Argument::String(reader.read_string()?.to_string()),
            'b' => Argument::Blob(reader.read_blob()?.to_vec()),
            other => return Err(DecodeError::UnknownTypeTag(other)),
        };
        args.push(arg);
    }

    Ok(Message { address, args })
}

#[cfg(test)]
mod tests {
    use super::{decode_message, encode_message};
    use crate::error::{DecodeError, EncodeError};
    use crate::types::{Argument, Message};

    #[test]
    fn negative_int_survives_round_trip() {
        let m = Message::new("/n", vec![Argument::Int(-2), Argument::Int(i32::MIN)]);
        let bytes = encode_message(&m).expect("message should encode");
        assert_eq!(&bytes[8..12], &[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(decode_message(&bytes).expect("message should decode"), m);
    }

    #[test]
    fn empty_address_and_no_args_decode() {
        let m = decode_message(b"\0\0\0\0,\0\0\0").expect("odd but well framed");
        assert_eq!(m.address, "");
        assert!(m.args.is_empty());
    }

    #[test]
    fn missing_type_tag_string_means_no_args() {
        let m = decode_message(b"/old\0\0\0\0").expect("legacy message should decode");
        assert_eq!(m, Message::new("/old", vec![]));
    }

    #[test]
    fn encode_rejects_address_without_slash() {
        let err = encode_message(&Message::new("ardosc", vec![])).expect_err("must fail");
        assert_eq!(err, EncodeError::InvalidAddress("ardosc".to_string()));
    }

    #[test]
    fn encode_rejects_nul_inside_string_argument() {
        let m = Message::new("/s", vec![Argument::String("a\0b".to_string())]);
        assert_eq!(encode_message(&m), Err(EncodeError::NulInString));
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let err = decode_message(b"/x\0\0,h\0\0\0\0\0\0\0\0\0\0").expect_err("int64 unsupported");
        assert_eq!(err, DecodeError::UnknownTypeTag('h'));
    }

    #[test]
    fn decode_rejects_tag_string_without_comma() {
        let err = decode_message(b"/x\0\0i\0\0\0\0\0\0\x01").expect_err("comma required");
        assert_eq!(err, DecodeError::MissingTypeTagComma);
    }

    #[test]
    fn decode_rejects_truncated_int() {
        let err = decode_message(b"/x\0\0,i\0\0\0\0").expect_err("int truncated");
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "int32",
                offset: 8
            }
        );
    }

    #[test]
    fn decode_rejects_unterminated_address() {
        let err = decode_message(b"/abc").expect_err("no terminator");
        assert_eq!(err, DecodeError::UnterminatedString { offset: 0 });
    }
}
