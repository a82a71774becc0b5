// Copyright (c) 2023 The hwcoin Developers

//! Descriptor-driven message codec
//!
//! Messages are plain structs with a static [`FieldDesc`] table
//! (generated by the `message!` macro) describing each field's tag,
//! cardinality and wire representation. Decoding walks the input one
//! `(tag, wire type)` key at a time and merges values into the field at
//! the matching table index, encoding walks the table in order.
//!
//! The wire format is protobuf (proto2) compatible:
//!
//! - all fields are reset to defaults before a message is decoded
//! - unknown tags are skipped by wire type
//! - repeated scalars are accepted packed or unpacked, and encoded unpacked
//! - a zero key terminates a message, allowing for trailing padding
//! - required fields missing after a full pass fail the decode
//!
//! Storage is fixed-capacity ([`heapless`]), exceeding a field capacity is
//! an error rather than a truncation.

mod field;
mod io;

pub use field::{Bytes, Field, Repeated};
pub use io::{write_key, write_varint, CountingSink, Reader, Sink, SliceSink, MAX_VARINT_LEN};

/// Encoded field wire type
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            _ => Err(DecodeError::InvalidWireType),
        }
    }
}

/// Field value representation
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Kind {
    /// Unsigned (or sign-extended) varint, also used for `bool` and enums
    Varint,
    /// Zig-zag encoded signed varint
    SVarint,
    Fixed32,
    Fixed64,
    Bytes,
    String,
    /// Nested message
    Message,
}

impl Kind {
    /// Wire type used to encode a single value of this kind
    pub const fn wire_type(&self) -> WireType {
        match self {
            Kind::Varint | Kind::SVarint => WireType::Varint,
            Kind::Fixed32 => WireType::Fixed32,
            Kind::Fixed64 => WireType::Fixed64,
            Kind::Bytes | Kind::String | Kind::Message => WireType::LengthDelimited,
        }
    }

    /// Scalar kinds may be packed in repeated fields
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Kind::Bytes | Kind::String | Kind::Message)
    }
}

/// Field cardinality
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

/// Static field descriptor
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct FieldDesc {
    pub tag: u32,
    pub name: &'static str,
    pub label: Label,
    pub kind: Kind,
}

impl FieldDesc {
    pub const fn new(tag: u32, name: &'static str, label: Label, kind: Kind) -> Self {
        Self {
            tag,
            name,
            label,
            kind,
        }
    }
}

/// Message with a static field descriptor table
pub trait Message: Field + Default {
    /// Message name, for diagnostics
    const NAME: &'static str;

    /// Field table, indices match [`Message::field`]
    const FIELDS: &'static [FieldDesc];

    /// Fetch the field at the provided table index
    fn field(&self, index: usize) -> Option<&dyn Field>;

    /// Fetch the mutable field at the provided table index
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Field>;
}

/// Decode errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DecodeError {
    /// Input ended before a value was complete
    Eof,
    /// Varint longer than 10 bytes
    VarintOverflow,
    /// Unsupported or mismatched wire type
    InvalidWireType,
    /// Length-delimited value exceeds field capacity
    Overflow,
    /// String value exceeds field capacity
    StringOverflow,
    /// Repeated field exceeds maximum element count
    ArrayOverflow,
    /// Required field was not present
    MissingRequiredField(&'static str),
    /// Value is not a member of the field enumeration
    InvalidEnum,
    /// String value is not valid UTF-8
    InvalidUtf8,
    /// Field table does not match message
    InvalidDescriptor,
}

impl DecodeError {
    /// Short description, used as failure text on the wire
    pub const fn as_str(&self) -> &'static str {
        match self {
            DecodeError::Eof => "io error",
            DecodeError::VarintOverflow => "varint overflow",
            DecodeError::InvalidWireType => "invalid wire_type",
            DecodeError::Overflow => "bytes overflow",
            DecodeError::StringOverflow => "string overflow",
            DecodeError::ArrayOverflow => "array overflow",
            DecodeError::MissingRequiredField(_) => "missing required field",
            DecodeError::InvalidEnum => "invalid enum value",
            DecodeError::InvalidUtf8 => "invalid utf8",
            DecodeError::InvalidDescriptor => "invalid field descriptor",
        }
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DecodeError::MissingRequiredField(name) => {
                write!(f, "missing required field '{name}'")
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Encode errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EncodeError {
    /// Output buffer exhausted
    BufferFull,
    /// Sink failed to accept data
    Sink,
    /// Field kind not supported by field storage
    InvalidDescriptor,
}

impl core::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            EncodeError::BufferFull => "buffer full",
            EncodeError::Sink => "sink error",
            EncodeError::InvalidDescriptor => "invalid field descriptor",
        };
        f.write_str(s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Decode a message from the provided buffer
pub fn decode<M: Message>(buff: &[u8]) -> Result<M, DecodeError> {
    let mut m = M::default();
    decode_into(&mut m, buff)?;
    Ok(m)
}

/// Decode into an existing message, resetting all fields first
pub fn decode_into<M: Message>(m: &mut M, buff: &[u8]) -> Result<(), DecodeError> {
    reset(m);
    merge(m, &mut Reader::new(buff))
}

/// Reset every field in the table to its default
pub fn reset<M: Message>(m: &mut M) {
    for i in 0..M::FIELDS.len() {
        if let Some(f) = m.field_mut(i) {
            f.clear();
        }
    }
}

/// Merge encoded fields from the reader into `m` until the reader is
/// exhausted or a zero key is found, then check required fields
pub fn merge<M: Message>(m: &mut M, r: &mut Reader<'_>) -> Result<(), DecodeError> {
    // Required fields are tracked by table index
    let mut seen = 0u64;

    while !r.is_empty() {
        let key = r.read_varint()?;
        if key == 0 {
            break;
        }

        let wire = WireType::try_from((key & 0x07) as u8)?;
        let tag = (key >> 3) as u32;

        let index = match M::FIELDS.iter().position(|d| d.tag == tag) {
            Some(i) => i,
            None => {
                r.skip(wire)?;
                continue;
            }
        };

        let desc = &M::FIELDS[index];
        let f = m.field_mut(index).ok_or(DecodeError::InvalidDescriptor)?;
        f.merge(desc.kind, wire, r)?;

        if index < 64 {
            seen |= 1 << index;
        }
    }

    for (i, d) in M::FIELDS.iter().enumerate() {
        if d.label == Label::Required && i < 64 && seen & (1 << i) == 0 {
            return Err(DecodeError::MissingRequiredField(d.name));
        }
    }

    Ok(())
}

/// Encode a message (without length prefix) to the provided sink
pub fn encode<M: Message>(m: &M, s: &mut dyn Sink) -> Result<(), EncodeError> {
    for (i, d) in M::FIELDS.iter().enumerate() {
        let f = m.field(i).ok_or(EncodeError::InvalidDescriptor)?;
        f.encode(d.tag, d.kind, s)?;
    }
    Ok(())
}

/// Compute the encoded length of a message
pub fn encoded_len<M: Message>(m: &M) -> Result<usize, EncodeError> {
    let mut c = CountingSink::default();
    encode(m, &mut c)?;
    Ok(c.len())
}

/// Encode a message into the provided buffer, returning the encoded length
pub fn encode_to_slice<M: Message>(m: &M, buff: &mut [u8]) -> Result<usize, EncodeError> {
    let mut s = SliceSink::new(buff);
    encode(m, &mut s)?;
    Ok(s.len())
}

/// Merge a length-delimited nested message
pub fn merge_nested<M: Message>(
    m: &mut M,
    wire: WireType,
    r: &mut Reader<'_>,
) -> Result<(), DecodeError> {
    if wire != WireType::LengthDelimited {
        return Err(DecodeError::InvalidWireType);
    }

    let n = r.read_len()?;
    let mut sub = r.sub(n)?;
    merge(m, &mut sub)
}

/// Encode a nested message with key and length prefix
pub fn encode_nested<M: Message>(m: &M, tag: u32, s: &mut dyn Sink) -> Result<(), EncodeError> {
    write_key(s, tag, WireType::LengthDelimited)?;
    write_varint(s, encoded_len(m)? as u64)?;
    encode(m, s)
}

/// Check a field table has unique, non-zero tags
pub const fn descriptor_is_valid(fields: &[FieldDesc]) -> bool {
    let mut i = 0;
    while i < fields.len() {
        if fields[i].tag == 0 {
            return false;
        }
        let mut j = i + 1;
        while j < fields.len() {
            if fields[i].tag == fields[j].tag {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}
