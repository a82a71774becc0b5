// Copyright (c) 2023 The hwcoin Developers

//! Byte readers and sinks used by the codec

use super::{DecodeError, EncodeError, WireType};

/// Maximum encoded length of a varint
pub const MAX_VARINT_LEN: usize = 10;

/// Bounded reader over an encoded buffer
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    buff: &'a [u8],
    index: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided buffer
    pub fn new(buff: &'a [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Number of bytes remaining
    pub fn remaining(&self) -> usize {
        self.buff.len() - self.index
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let b = *self.buff.get(self.index).ok_or(DecodeError::Eof)?;
        self.index += 1;
        Ok(b)
    }

    /// Read an unsigned LEB128 varint
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut v = 0u64;

        for i in 0..MAX_VARINT_LEN {
            let b = self.read_byte()?;
            v |= ((b & 0x7f) as u64) << (7 * i);

            if b & 0x80 == 0 {
                return Ok(v);
            }
        }

        Err(DecodeError::VarintOverflow)
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        let s = self.read_slice(4)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        let s = self.read_slice(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(s);
        Ok(u64::from_le_bytes(b))
    }

    /// Read a slice of `n` bytes
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Eof);
        }

        let s = &self.buff[self.index..][..n];
        self.index += n;

        Ok(s)
    }

    /// Read a varint length prefix and return the bounded length
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let n = self.read_varint()?;
        if n > self.remaining() as u64 {
            return Err(DecodeError::Eof);
        }
        Ok(n as usize)
    }

    /// Split off a sub-reader over the next `n` bytes
    pub fn sub(&mut self, n: usize) -> Result<Reader<'a>, DecodeError> {
        self.read_slice(n).map(Reader::new)
    }

    /// Skip a field value with the provided wire type
    pub fn skip(&mut self, wire: WireType) -> Result<(), DecodeError> {
        match wire {
            WireType::Varint => self.read_varint().map(|_| ()),
            WireType::Fixed64 => self.read_slice(8).map(|_| ()),
            WireType::LengthDelimited => {
                let n = self.read_len()?;
                self.read_slice(n).map(|_| ())
            }
            WireType::Fixed32 => self.read_slice(4).map(|_| ()),
        }
    }
}

/// Output sink for encoded bytes
pub trait Sink {
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError>;
}

impl<T: Sink + ?Sized> Sink for &mut T {
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        T::write(self, data)
    }
}

/// Sink that discards data and counts bytes, used for sizing passes
#[derive(Clone, Debug, Default)]
pub struct CountingSink {
    n: usize,
}

impl CountingSink {
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl Sink for CountingSink {
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.n += data.len();
        Ok(())
    }
}

/// Sink writing into a fixed slice
#[derive(Debug)]
pub struct SliceSink<'a> {
    buff: &'a mut [u8],
    index: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buff: &'a mut [u8]) -> Self {
        Self { buff, index: 0 }
    }

    /// Number of bytes written
    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }
}

impl<'a> Sink for SliceSink<'a> {
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if data.len() > self.buff.len() - self.index {
            return Err(EncodeError::BufferFull);
        }

        self.buff[self.index..][..data.len()].copy_from_slice(data);
        self.index += data.len();

        Ok(())
    }
}

/// Write an unsigned LEB128 varint
pub fn write_varint(s: &mut dyn Sink, mut v: u64) -> Result<(), EncodeError> {
    let mut b = [0u8; MAX_VARINT_LEN];
    let mut n = 0;

    loop {
        b[n] = (v & 0x7f) as u8;
        v >>= 7;

        if v == 0 {
            n += 1;
            break;
        }

        b[n] |= 0x80;
        n += 1;
    }

    s.write(&b[..n])
}

/// Write a field key (tag and wire type)
pub fn write_key(s: &mut dyn Sink, tag: u32, wire: WireType) -> Result<(), EncodeError> {
    write_varint(s, ((tag as u64) << 3) | wire as u64)
}
