use std::fmt;

use crate::error::EncodeError;
use crate::timetag::Timetag;

/// One message argument. The variant alone decides the wire layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// `i`: 32-bit big-endian two's complement.
    Int(i32),
    /// `f`: 32-bit big-endian IEEE-754.
    Float(f32),
    /// `s`: NUL-terminated UTF-8, padded.
    String(String),
    /// `b`: u32 length prefix followed by raw bytes, padded.
    Blob(Vec<u8>),
}

impl Argument {
    /// Type-tag character for this argument.
    pub fn type_tag(&self) -> u8 {
        match self {
            Argument::Int(_) => b'i',
            Argument::Float(_) => b'f',
            Argument::String(_) => b's',
            Argument::Blob(_) => b'b',
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Argument::Blob(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(value)
    }
}

impl From<i16> for Argument {
    fn from(value: i16) -> Self {
        Argument::Int(value.into())
    }
}

impl From<u8> for Argument {
    fn from(value: u8) -> Self {
        Argument::Int(value.into())
    }
}

impl From<f32> for Argument {
    fn from(value: f32) -> Self {
        Argument::Float(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(value: Vec<u8>) -> Self {
        Argument::Blob(value)
    }
}

impl From<&[u8]> for Argument {
    fn from(value: &[u8]) -> Self {
        Argument::Blob(value.to_vec())
    }
}

impl TryFrom<i64> for Argument {
    type Error = EncodeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        i32::try_from(value)
            .map(Argument::Int)
            .map_err(|_| EncodeError::IntegerOutOfRange(value.into()))
    }
}

impl TryFrom<u32> for Argument {
    type Error = EncodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        i32::try_from(value)
            .map(Argument::Int)
            .map_err(|_| EncodeError::IntegerOutOfRange(value.into()))
    }
}

impl TryFrom<u64> for Argument {
    type Error = EncodeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i32::try_from(value)
            .map(Argument::Int)
            .map_err(|_| EncodeError::IntegerOutOfRange(value.into()))
    }
}

impl TryFrom<f64> for Argument {
    type Error = EncodeError;

    /// Accepts finite values within float32 range plus NaN/±inf, which
    /// have exact float32 counterparts.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value.abs() > f32::MAX as f64 {
            return Err(EncodeError::FloatOutOfRange(value));
        }
        Ok(Argument::Float(value as f32))
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(v) => write!(f, "{v}"),
            Argument::Float(v) => write!(f, "{v}"),
            Argument::String(v) => f.write_str(v),
            Argument::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
        }
    }
}

/// Address plus flat, ordered arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub address: String,
    pub args: Vec<Argument>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Appends one argument, builder style.
    pub fn with_arg(mut self, arg: impl Into<Argument>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Timetag plus ordered elements, each a message or a nested bundle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bundle {
    pub timetag: Timetag,
    pub elements: Vec<Packet>,
}

impl Bundle {
    pub fn new(timetag: Timetag, elements: Vec<Packet>) -> Self {
        Self { timetag, elements }
    }

    /// Number of messages in this bundle, counting nested bundles.
    pub fn message_count(&self) -> usize {
        self.elements
            .iter()
            .map(|element| match element {
                Packet::Message(_) => 1,
                Packet::Bundle(b) => b.message_count(),
            })
            .sum()
    }
}

/// One decoded OSC unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl From<Message> for Packet {
    fn from(message: Message) -> Self {
        Packet::Message(message)
    }
}

impl From<Bundle> for Packet {
    fn from(bundle: Bundle) -> Self {
        Packet::Bundle(bundle)
    }
}
