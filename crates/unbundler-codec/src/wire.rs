//! Alignment and bounds-checked field primitives shared by message and
//! bundle framing.
//!
//! Every variable-length field goes through [`pad_len`] with the field's
//! own length (bytes since the field started on a 4-byte boundary).

use crate::error::DecodeError;

/// OSC field alignment in bytes.
pub const ALIGNMENT: usize = 4;

/// Number of NUL bytes needed after a field of `len` bytes to reach the
/// next 4-byte boundary.
pub const fn pad_len(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Appends a NUL-terminated string padded to the next boundary.
pub(crate) fn put_string(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    let field_len = value.len() + 1;
    out.resize(out.len() + pad_len(field_len), 0);
}

/// Appends a length-prefixed blob padded so prefix + bytes is aligned.
pub(crate) fn put_blob(out: &mut Vec<u8>, len_prefix: u32, bytes: &[u8]) {
    out.extend_from_slice(&len_prefix.to_be_bytes());
    out.extend_from_slice(bytes);
    out.resize(out.len() + pad_len(bytes.len() + 4), 0);
}

/// Forward-only cursor over a wire buffer. Never indexes out of bounds.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn take(
        &mut self,
        len: usize,
        field: &'static str,
    ) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                field,
                offset: self.pos,
            });
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub(crate) fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let raw = self.take(4, field)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Skips alignment padding after a field of `field_len` bytes.
    pub(crate) fn skip_padding(&mut self, field_len: usize) -> Result<(), DecodeError> {
        let pad = pad_len(field_len);
        if pad > self.remaining() {
            return Err(DecodeError::PaddingOverrun { offset: self.pos });
        }
        self.pos += pad;
        Ok(())
    }

    /// Reads a NUL-terminated, padded UTF-8 string.
    pub(crate) fn read_string(&mut self) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        let rest = &self.bytes[start..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(DecodeError::UnterminatedString { offset: start })?;
        let value = std::str::from_utf8(&rest[..nul])
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })?;
        self.pos = start + nul + 1;
        self.skip_padding(nul + 1)?;
        Ok(value)
    }

    /// Reads a length-prefixed, padded blob.
    pub(crate) fn read_blob(&mut self) -> Result<&'a [u8], DecodeError> {
        let declared = self.read_u32("blob length")? as usize;
        if declared > self.remaining() {
            return Err(DecodeError::BlobOverrun {
                declared,
                remaining: self.remaining(),
            });
        }
        let bytes = self.take(declared, "blob")?;
        self.skip_padding(declared + 4)?;
        Ok(bytes)
    }
}
