// Copyright (c) 2023 The hwcoin Developers

//! Message channel over a chunked [`Transport`]
//!
//! Inbound packets are unpacked and reassembled into frames, outbound
//! [`Output`]s are framed and split into packets with each send retried
//! while the transport is busy.

use hwcoin_proto::{
    codec::EncodeError,
    frame::{
        check_chunk_size, unpack_packet, FrameError, Progress, Reassembler, WriteError,
        MAX_PACKET_LEN,
    },
};

use crate::{
    consts::{Config, MAX_MESSAGE_SIZE},
    engine::Output,
    ui::Clock,
};

/// Packet transport (USB HID, BLE, ...)
pub trait Transport {
    /// Send a single packet
    fn send(&mut self, packet: &[u8]) -> Result<(), TransportError>;

    /// Poll for a received packet, returning the packet length if available
    fn recv(&mut self, buff: &mut [u8]) -> Result<Option<usize>, TransportError>;
}

impl<T: Transport> Transport for &mut T {
    fn send(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        T::send(self, packet)
    }

    fn recv(&mut self, buff: &mut [u8]) -> Result<Option<usize>, TransportError> {
        T::recv(self, buff)
    }
}

/// Transport errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum TransportError {
    /// Transport is busy, retry later
    #[cfg_attr(feature = "thiserror", error("transport busy"))]
    Busy,

    /// No transmit buffers available, retry later
    #[cfg_attr(feature = "thiserror", error("no transport buffers"))]
    NoBuffers,

    /// Peer disconnected
    #[cfg_attr(feature = "thiserror", error("disconnected"))]
    Disconnected,

    /// Other transport failure
    #[cfg_attr(feature = "thiserror", error("transport error"))]
    Other,
}

/// [`Channel`] errors
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum ChannelError {
    #[cfg_attr(feature = "thiserror", error("transport: {0}"))]
    Transport(TransportError),

    /// Send retries or inbound chunks exceeded the io timeout
    #[cfg_attr(feature = "thiserror", error("timeout"))]
    Timeout,

    /// Announced message exceeds the receive buffer
    #[cfg_attr(feature = "thiserror", error("message {msg_type} too large ({len} bytes)"))]
    TooLarge { msg_type: u16, len: u32 },

    #[cfg_attr(feature = "thiserror", error("encode: {0}"))]
    Encode(EncodeError),

    #[cfg_attr(feature = "thiserror", error("frame: {0}"))]
    Frame(FrameError),
}

impl From<TransportError> for ChannelError {
    fn from(e: TransportError) -> Self {
        ChannelError::Transport(e)
    }
}

impl From<WriteError<ChannelError>> for ChannelError {
    fn from(e: WriteError<ChannelError>) -> Self {
        match e {
            WriteError::Frame(e) => ChannelError::Frame(e),
            WriteError::Encode(e) => ChannelError::Encode(e),
            WriteError::Sink(e) => e,
        }
    }
}

/// Framed message channel
pub struct Channel<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    chunk_size: usize,
    report_id: bool,
    io_timeout_ms: u64,
    rx: Reassembler<MAX_MESSAGE_SIZE>,
}

impl<T: Transport, C: Clock> Channel<T, C> {
    /// Create a new channel, failing where the configured chunk size
    /// cannot carry a frame header
    pub fn new(transport: T, clock: C, config: &Config) -> Result<Self, ChannelError> {
        check_chunk_size(config.chunk_size).map_err(ChannelError::Frame)?;

        Ok(Self {
            transport,
            clock,
            chunk_size: config.chunk_size,
            report_id: config.report_id,
            io_timeout_ms: config.io_timeout_ms,
            rx: Reassembler::new(),
        })
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Receive a message.
    ///
    /// Returns `Ok(None)` immediately where no message has started, once
    /// a header chunk is accepted the remaining chunks must each arrive
    /// within the io timeout.
    pub fn receive(&mut self) -> Result<Option<(u16, &[u8])>, ChannelError> {
        let mut packet = [0u8; MAX_PACKET_LEN];
        let mut deadline = None;

        loop {
            let n = match self.transport.recv(&mut packet) {
                Ok(Some(n)) => n.min(packet.len()),
                Ok(None) => match deadline {
                    None => return Ok(None),
                    Some(d) if self.clock.now_ms() >= d => {
                        #[cfg(feature = "log")]
                        log::warn!("receive timeout, dropping partial message");

                        self.rx.reset();
                        return Err(ChannelError::Timeout);
                    }
                    Some(_) => {
                        core::hint::spin_loop();
                        continue;
                    }
                },
                Err(e) => {
                    self.rx.reset();
                    return Err(e.into());
                }
            };

            let chunk = match unpack_packet(&packet[..n], self.chunk_size) {
                Some(c) => c,
                None => {
                    #[cfg(feature = "log")]
                    log::debug!("ignoring malformed packet ({} bytes)", n);
                    continue;
                }
            };

            match self.rx.push(chunk) {
                Ok(Progress::Ignored) => (),
                Ok(Progress::Pending) => {
                    deadline = Some(self.clock.now_ms() + self.io_timeout_ms);
                }
                Ok(Progress::Complete) => break,
                Err(FrameError::TooLarge { msg_type, len }) => {
                    self.rx.reset();
                    return Err(ChannelError::TooLarge { msg_type, len });
                }
                Err(e) => {
                    self.rx.reset();
                    return Err(ChannelError::Frame(e));
                }
            }
        }

        Ok(self.rx.frame())
    }

    /// Send an [`Output`] as a framed message, returning the payload length
    pub fn send(&mut self, output: &Output) -> Result<usize, ChannelError> {
        let (chunk_size, report_id, timeout_ms) =
            (self.chunk_size, self.report_id, self.io_timeout_ms);
        let (transport, clock) = (&mut self.transport, &self.clock);

        let n = output.write(chunk_size, report_id, |p| {
            send_packet(transport, clock, timeout_ms, p)
        })?;

        #[cfg(feature = "log")]
        log::trace!("sent {:?} ({} bytes)", output.message_type(), n);

        Ok(n)
    }
}

/// Send a packet, retrying while the transport is busy
fn send_packet<T: Transport, C: Clock>(
    transport: &mut T,
    clock: &C,
    timeout_ms: u64,
    packet: &[u8],
) -> Result<(), ChannelError> {
    let deadline = clock.now_ms() + timeout_ms;

    loop {
        match transport.send(packet) {
            Ok(()) => return Ok(()),
            Err(TransportError::Busy | TransportError::NoBuffers) => {
                if clock.now_ms() >= deadline {
                    return Err(ChannelError::Timeout);
                }
                core::hint::spin_loop();
            }
            Err(e) => return Err(e.into()),
        }
    }
}
