// Copyright (c) 2023 The hwcoin Developers

//! Field storage types

use core::ops::{Deref, DerefMut};

use heapless::{String, Vec};

use super::{write_key, write_varint, DecodeError, EncodeError, Kind, Reader, Sink, WireType};

/// Field storage, implemented for scalars, [`Option`], [`Bytes`],
/// [`heapless::String`], [`Repeated`], enumerations and nested messages
pub trait Field {
    /// Reset to the type default
    fn clear(&mut self);

    /// Merge one encoded value into the field
    fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError>;

    /// Encode the field with the provided tag, absent values write nothing
    fn encode(&self, tag: u32, kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError>;
}

/// Read a raw scalar value, applying zig-zag decoding where required
pub(crate) fn read_scalar(kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<u64, DecodeError> {
    if !kind.is_scalar() {
        return Err(DecodeError::InvalidDescriptor);
    }
    if wire != kind.wire_type() {
        return Err(DecodeError::InvalidWireType);
    }

    match kind {
        Kind::Varint => r.read_varint(),
        Kind::SVarint => {
            let v = r.read_varint()?;
            Ok(((v >> 1) as i64 ^ -((v & 1) as i64)) as u64)
        }
        Kind::Fixed32 => r.read_fixed32().map(|v| v as u64),
        Kind::Fixed64 => r.read_fixed64(),
        _ => Err(DecodeError::InvalidDescriptor),
    }
}

/// Write a keyed raw scalar value
pub(crate) fn write_scalar(tag: u32, kind: Kind, raw: u64, s: &mut dyn Sink) -> Result<(), EncodeError> {
    if !kind.is_scalar() {
        return Err(EncodeError::InvalidDescriptor);
    }

    write_key(s, tag, kind.wire_type())?;

    match kind {
        Kind::Varint => write_varint(s, raw),
        Kind::SVarint => {
            let v = raw as i64;
            write_varint(s, ((v << 1) ^ (v >> 63)) as u64)
        }
        Kind::Fixed32 => s.write(&(raw as u32).to_le_bytes()),
        Kind::Fixed64 => s.write(&raw.to_le_bytes()),
        _ => Err(EncodeError::InvalidDescriptor),
    }
}

/// Conversion between native scalars and raw wire values,
/// truncating to the native width
trait Scalar: Sized {
    fn from_raw(raw: u64) -> Self;
    fn to_raw(&self) -> u64;
}

impl Scalar for u32 {
    fn from_raw(raw: u64) -> Self {
        raw as u32
    }
    fn to_raw(&self) -> u64 {
        *self as u64
    }
}

impl Scalar for u64 {
    fn from_raw(raw: u64) -> Self {
        raw
    }
    fn to_raw(&self) -> u64 {
        *self
    }
}

impl Scalar for i32 {
    fn from_raw(raw: u64) -> Self {
        raw as i32
    }
    fn to_raw(&self) -> u64 {
        *self as i64 as u64
    }
}

impl Scalar for i64 {
    fn from_raw(raw: u64) -> Self {
        raw as i64
    }
    fn to_raw(&self) -> u64 {
        *self as u64
    }
}

impl Scalar for bool {
    fn from_raw(raw: u64) -> Self {
        raw != 0
    }
    fn to_raw(&self) -> u64 {
        *self as u64
    }
}

macro_rules! scalar_field {
    ($($t:ty),*) => {
        $(
            impl Field for $t {
                fn clear(&mut self) {
                    *self = Default::default();
                }

                fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError> {
                    *self = <$t as Scalar>::from_raw(read_scalar(kind, wire, r)?);
                    Ok(())
                }

                fn encode(&self, tag: u32, kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError> {
                    write_scalar(tag, kind, self.to_raw(), s)
                }
            }
        )*
    };
}

scalar_field!(u32, u64, i32, i64, bool);

impl<T: Field + Default> Field for Option<T> {
    fn clear(&mut self) {
        *self = None;
    }

    fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        self.get_or_insert_with(T::default).merge(kind, wire, r)
    }

    fn encode(&self, tag: u32, kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError> {
        match self {
            Some(v) => v.encode(tag, kind, s),
            None => Ok(()),
        }
    }
}

/// Read the payload of a length-delimited field
fn read_delimited<'a>(kind: Kind, wire: WireType, r: &mut Reader<'a>) -> Result<&'a [u8], DecodeError> {
    if kind.wire_type() != WireType::LengthDelimited {
        return Err(DecodeError::InvalidDescriptor);
    }
    if wire != WireType::LengthDelimited {
        return Err(DecodeError::InvalidWireType);
    }

    let n = r.read_len()?;
    r.read_slice(n)
}

fn write_delimited(tag: u32, data: &[u8], s: &mut dyn Sink) -> Result<(), EncodeError> {
    write_key(s, tag, WireType::LengthDelimited)?;
    write_varint(s, data.len() as u64)?;
    s.write(data)
}

/// Fixed-capacity byte field
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Bytes<const N: usize>(pub Vec<u8, N>);

impl<const N: usize> Bytes<N> {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Create from a slice, failing where the slice exceeds capacity
    pub fn from_slice(data: &[u8]) -> Result<Self, DecodeError> {
        Vec::from_slice(data).map(Self).map_err(|_| DecodeError::Overflow)
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Deref for Bytes<N> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for Bytes<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> core::fmt::Debug for Bytes<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for b in self.0.iter() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl<const N: usize> Field for Bytes<N> {
    fn clear(&mut self) {
        self.0.clear();
    }

    fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        if kind != Kind::Bytes {
            return Err(DecodeError::InvalidDescriptor);
        }

        let data = read_delimited(kind, wire, r)?;
        if data.len() > N {
            return Err(DecodeError::Overflow);
        }

        self.0.clear();
        self.0
            .extend_from_slice(data)
            .map_err(|_| DecodeError::Overflow)
    }

    fn encode(&self, tag: u32, _kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError> {
        write_delimited(tag, &self.0, s)
    }
}

impl<const N: usize> Field for String<N> {
    fn clear(&mut self) {
        String::clear(self);
    }

    fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        if kind != Kind::String {
            return Err(DecodeError::InvalidDescriptor);
        }

        let data = read_delimited(kind, wire, r)?;
        if data.len() > N {
            return Err(DecodeError::StringOverflow);
        }

        let s = core::str::from_utf8(data).map_err(|_| DecodeError::InvalidUtf8)?;

        String::clear(self);
        self.push_str(s).map_err(|_| DecodeError::StringOverflow)
    }

    fn encode(&self, tag: u32, _kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError> {
        write_delimited(tag, self.as_bytes(), s)
    }
}

/// Repeated field with a fixed maximum element count
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Repeated<T, const N: usize>(pub Vec<T, N>);

impl<T, const N: usize> Repeated<T, N> {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a value, failing when full
    pub fn push(&mut self, v: T) -> Result<(), DecodeError> {
        self.0.push(v).map_err(|_| DecodeError::ArrayOverflow)
    }
}

impl<T: Clone, const N: usize> Repeated<T, N> {
    pub fn from_slice(values: &[T]) -> Result<Self, DecodeError> {
        Vec::from_slice(values)
            .map(Self)
            .map_err(|_| DecodeError::ArrayOverflow)
    }
}

impl<T, const N: usize> Deref for Repeated<T, N> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T, const N: usize> DerefMut for Repeated<T, N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Field + Default, const N: usize> Field for Repeated<T, N> {
    fn clear(&mut self) {
        self.0.clear();
    }

    fn merge(&mut self, kind: Kind, wire: WireType, r: &mut Reader<'_>) -> Result<(), DecodeError> {
        // Packed run of scalar values
        if kind.is_scalar() && wire == WireType::LengthDelimited {
            let n = r.read_len()?;
            let mut sub = r.sub(n)?;

            while !sub.is_empty() {
                let mut v = T::default();
                v.merge(kind, kind.wire_type(), &mut sub)?;
                self.push(v)?;
            }

            return Ok(());
        }

        if self.0.is_full() {
            return Err(DecodeError::ArrayOverflow);
        }

        let mut v = T::default();
        v.merge(kind, wire, r)?;
        self.push(v)
    }

    fn encode(&self, tag: u32, kind: Kind, s: &mut dyn Sink) -> Result<(), EncodeError> {
        for v in self.0.iter() {
            v.encode(tag, kind, s)?;
        }
        Ok(())
    }
}
