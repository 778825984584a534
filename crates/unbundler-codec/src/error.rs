use thiserror::Error;

/// Errors returned when wire bytes are structurally malformed.
///
/// Decoding never fails on semantically odd but well-framed input such as
/// an empty address or a message with zero arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ended before a fixed-size field completed.
    #[error("truncated {field} at offset {offset}")]
    Truncated { field: &'static str, offset: usize },
    /// No NUL terminator before the end of the buffer.
    #[error("unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },
    /// Alignment padding after a field would run past the buffer end.
    #[error("padding overruns buffer at offset {offset}")]
    PaddingOverrun { offset: usize },
    /// String field is not valid UTF-8.
    #[error("invalid utf-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },
    /// Type-tag string does not start with `,`.
    #[error("type tag string must start with ','")]
    MissingTypeTagComma,
    /// Type-tag character outside the supported set.
    #[error("unknown type tag '{0}'")]
    UnknownTypeTag(char),
    /// Blob length prefix exceeds the remaining buffer.
    #[error("blob length {declared} exceeds remaining {remaining} bytes")]
    BlobOverrun { declared: usize, remaining: usize },
    /// Bundle element length prefix exceeds the remaining buffer.
    #[error("bundle element length {declared} exceeds remaining {remaining} bytes")]
    ElementOverrun { declared: usize, remaining: usize },
    /// Buffer does not start with `#bundle\0`.
    #[error("missing #bundle header")]
    NotABundle,
    /// Bundles nested deeper than the decoder accepts.
    #[error("bundle nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
    /// A bundle element failed to decode.
    #[error("bundle element {index}: {source}")]
    Nested {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

/// Errors returned when a value cannot be represented on the wire.
///
/// These indicate a caller bug rather than an environment failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// Address must start with `/` and contain no NUL.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    /// String argument contains an embedded NUL.
    #[error("string argument contains NUL")]
    NulInString,
    /// Blob length does not fit the 32-bit length prefix.
    #[error("blob of {0} bytes exceeds u32 length prefix")]
    BlobTooLarge(usize),
    /// Encoded bundle element does not fit the 32-bit length prefix.
    #[error("bundle element of {0} bytes exceeds u32 length prefix")]
    ElementTooLarge(usize),
    /// Integer source value outside the int32 range.
    #[error("integer {0} out of int32 range")]
    IntegerOutOfRange(i128),
    /// Float source value not representable as float32.
    #[error("float {0} out of float32 range")]
    FloatOutOfRange(f64),
}
