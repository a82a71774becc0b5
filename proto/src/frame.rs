// Copyright (c) 2023 The hwcoin Developers

//! Message framing over fixed-size transport chunks
//!
//! ## Packet encoding
//!
//! Each transport packet carries one chunk, prefixed by the chunk size and
//! (optionally) a zero report id:
//!
//! ```text
//! +-----------+------------+------------------------------+
//! | REPORT_ID | CHUNK_SIZE |   DATA (CHUNK_SIZE bytes)    |
//! +-----------+------------+------------------------------+
//! ```
//!
//! ## Frame encoding
//!
//! Messages are prefixed with an 8-byte header and split across chunks,
//! the final chunk is zero padded.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      '#'      |      '#'      |     MESSAGE_TYPE (BE u16)     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     PAYLOAD_LENGTH (BE u32)                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                            PAYLOAD...                         /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use encdec::{Decode, Encode};
use heapless::Vec;

use crate::codec::{self, EncodeError, Message, Sink};
use crate::helpers::{arr, be16, be32};

/// Frame marker bytes
pub const FRAME_MAGIC: [u8; 2] = *b"##";

/// Encoded frame header length
pub const HEADER_LEN: usize = 8;

/// Default chunk data length
pub const DEFAULT_CHUNK_SIZE: usize = 18;

/// Maximum chunk data length
pub const MAX_CHUNK_SIZE: usize = 62;

/// Maximum packet length (report id, chunk size, data)
pub const MAX_PACKET_LEN: usize = MAX_CHUNK_SIZE + 2;

/// Frame errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FrameError {
    /// Buffer too short
    InvalidLength,
    /// Missing `##` marker
    InvalidMagic,
    /// Announced payload exceeds the receive buffer
    TooLarge { msg_type: u16, len: u32 },
    /// Chunk size outside `HEADER_LEN..=MAX_CHUNK_SIZE`
    InvalidChunkSize,
}

impl From<encdec::Error> for FrameError {
    fn from(_: encdec::Error) -> Self {
        FrameError::InvalidLength
    }
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::InvalidLength => f.write_str("invalid length"),
            FrameError::InvalidMagic => f.write_str("invalid frame marker"),
            FrameError::TooLarge { msg_type, len } => {
                write!(f, "message {msg_type} too large ({len} bytes)")
            }
            FrameError::InvalidChunkSize => f.write_str("invalid chunk size"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// Frame header
#[derive(Copy, Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "FrameError")]
pub struct FrameHeader {
    #[encdec(with = "arr")]
    pub magic: [u8; 2],

    #[encdec(with = "be16")]
    pub msg_type: u16,

    #[encdec(with = "be32")]
    pub len: u32,
}

impl FrameHeader {
    pub fn new(msg_type: u16, len: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            msg_type,
            len,
        }
    }

    /// Parse and validate a frame header
    pub fn parse(buff: &[u8]) -> Result<Self, FrameError> {
        let (h, _) = FrameHeader::decode(buff)?;
        if h.magic != FRAME_MAGIC {
            return Err(FrameError::InvalidMagic);
        }
        Ok(h)
    }

    /// Encode header to a fixed array
    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN], FrameError> {
        let mut b = [0u8; HEADER_LEN];
        self.encode(&mut b)?;
        Ok(b)
    }
}

/// Check a chunk size is usable for framing
pub fn check_chunk_size(chunk_size: usize) -> Result<(), FrameError> {
    match chunk_size {
        HEADER_LEN..=MAX_CHUNK_SIZE => Ok(()),
        _ => Err(FrameError::InvalidChunkSize),
    }
}

/// Unpack chunk data from a transport packet, stripping an optional
/// leading report id and validating the chunk size marker.
///
/// Returns `None` for packets that are not chunks of the expected size.
pub fn unpack_packet(packet: &[u8], chunk_size: usize) -> Option<&[u8]> {
    let packet = match packet.first() {
        Some(0x00) => &packet[1..],
        Some(_) => packet,
        None => return None,
    };

    if packet.len() < 1 + chunk_size || packet[0] as usize != chunk_size {
        return None;
    }

    Some(&packet[1..][..chunk_size])
}

/// Reassembly progress
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Progress {
    /// Chunk was not part of a frame and was discarded
    Ignored,
    /// More chunks are required
    Pending,
    /// Frame is complete, see [`Reassembler::frame`]
    Complete,
}

/// Inbound frame reassembly into a fixed payload buffer of `N` bytes
#[derive(Clone, Debug)]
pub struct Reassembler<const N: usize> {
    header: Option<FrameHeader>,
    payload: Vec<u8, N>,
    complete: bool,
}

impl<const N: usize> Default for Reassembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Reassembler<N> {
    pub const fn new() -> Self {
        Self {
            header: None,
            payload: Vec::new(),
            complete: false,
        }
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.header = None;
        self.payload.clear();
        self.complete = false;
    }

    /// Check whether a frame is partially received
    pub fn in_progress(&self) -> bool {
        self.header.is_some() && !self.complete
    }

    /// Push chunk data (as returned by [`unpack_packet`])
    pub fn push(&mut self, chunk: &[u8]) -> Result<Progress, FrameError> {
        // Start over once a completed frame has been consumed
        if self.complete {
            self.reset();
        }

        let data = match &self.header {
            Some(_) => chunk,
            None => {
                // Idle, only header chunks are accepted
                if chunk.len() < HEADER_LEN || chunk[..2] != FRAME_MAGIC {
                    return Ok(Progress::Ignored);
                }

                let h = FrameHeader::parse(chunk)?;
                if h.len as usize > N {
                    return Err(FrameError::TooLarge {
                        msg_type: h.msg_type,
                        len: h.len,
                    });
                }

                self.header = Some(h);
                &chunk[HEADER_LEN..]
            }
        };

        let len = match &self.header {
            Some(h) => h.len as usize,
            None => return Err(FrameError::InvalidLength),
        };

        // Copy payload bytes, trailing padding is dropped
        let n = (len - self.payload.len()).min(data.len());
        self.payload
            .extend_from_slice(&data[..n])
            .map_err(|_| FrameError::InvalidLength)?;

        if self.payload.len() == len {
            self.complete = true;
            Ok(Progress::Complete)
        } else {
            Ok(Progress::Pending)
        }
    }

    /// Fetch the completed frame type and payload
    pub fn frame(&self) -> Option<(u16, &[u8])> {
        match (&self.header, self.complete) {
            (Some(h), true) => Some((h.msg_type, &self.payload)),
            _ => None,
        }
    }
}

/// [`Sink`] splitting output into chunk packets, passed to `flush` as
/// they fill. The first flush error is retained and reported on
/// completion.
pub struct ChunkWriter<F, E> {
    packet: [u8; MAX_PACKET_LEN],
    prefix: usize,
    index: usize,
    chunk_size: usize,
    flush: F,
    error: Option<E>,
}

impl<F, E> ChunkWriter<F, E>
where
    F: FnMut(&[u8]) -> Result<(), E>,
{
    /// Create a new writer, `report_id` prefixes each packet with a zero byte
    pub fn new(chunk_size: usize, report_id: bool, flush: F) -> Result<Self, FrameError> {
        check_chunk_size(chunk_size)?;

        let mut packet = [0u8; MAX_PACKET_LEN];
        let prefix = match report_id {
            true => {
                packet[1] = chunk_size as u8;
                2
            }
            false => {
                packet[0] = chunk_size as u8;
                1
            }
        };

        Ok(Self {
            packet,
            prefix,
            index: 0,
            chunk_size,
            flush,
            error: None,
        })
    }

    fn push(&mut self, b: u8) -> Result<(), EncodeError> {
        if self.error.is_some() {
            return Err(EncodeError::Sink);
        }

        self.packet[self.prefix + self.index] = b;
        self.index += 1;

        if self.index == self.chunk_size {
            self.index = 0;

            let n = self.prefix + self.chunk_size;
            if let Err(e) = (self.flush)(&self.packet[..n]) {
                self.error = Some(e);
                return Err(EncodeError::Sink);
            }
        }

        Ok(())
    }

    /// Zero pad and flush the final chunk
    pub fn finish(mut self) -> Result<(), E> {
        while self.error.is_none() && self.index != 0 {
            let _ = self.push(0);
        }

        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Take a pending flush error
    pub fn take_error(&mut self) -> Option<E> {
        self.error.take()
    }
}

impl<F, E> Sink for ChunkWriter<F, E>
where
    F: FnMut(&[u8]) -> Result<(), E>,
{
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        for b in data {
            self.push(*b)?;
        }
        Ok(())
    }
}

/// Frame write errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum WriteError<E> {
    Frame(FrameError),
    Encode(EncodeError),
    Sink(E),
}

/// Write a framed message as a sequence of packets.
///
/// The payload length is computed by a sizing pass before the header is
/// emitted, then the message is encoded directly into chunks.
pub fn write_frame<M, F, E>(
    msg_type: u16,
    msg: &M,
    chunk_size: usize,
    report_id: bool,
    flush: F,
) -> Result<usize, WriteError<E>>
where
    M: Message,
    F: FnMut(&[u8]) -> Result<(), E>,
{
    let len = codec::encoded_len(msg).map_err(WriteError::Encode)?;
    let header = FrameHeader::new(msg_type, len as u32)
        .to_bytes()
        .map_err(WriteError::Frame)?;

    let mut w = ChunkWriter::new(chunk_size, report_id, flush).map_err(WriteError::Frame)?;

    let r = w
        .write(&header)
        .and_then(|_| codec::encode(msg, &mut w));

    if let Err(e) = r {
        return match w.take_error() {
            Some(e) => Err(WriteError::Sink(e)),
            None => Err(WriteError::Encode(e)),
        };
    }

    w.finish().map_err(WriteError::Sink)?;

    Ok(len)
}
