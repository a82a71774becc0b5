// Copyright (c) 2023 The hwcoin Developers

//! Device constants and runtime [`Config`]

use static_assertions::const_assert;

use hwcoin_proto::frame::{DEFAULT_CHUNK_SIZE, HEADER_LEN, MAX_CHUNK_SIZE};

/// Device vendor string
pub const VENDOR: &str = "hwcoin";

/// Firmware version (major, minor, patch)
pub const VERSION: (u32, u32, u32) = (1, 5, 2);

/// Maximum inbound message payload, larger messages are rejected before decode
pub const MAX_MESSAGE_SIZE: usize = 2048;

/// Transport chunk size (data bytes per packet)
pub const CHUNK_SIZE: usize = DEFAULT_CHUNK_SIZE;

/// Per-chunk transport timeout
pub const IO_TIMEOUT_MS: u64 = 2_000;

/// Confirmation dialog timeout
pub const CONFIRM_TIMEOUT_MS: u64 = 10_000;

/// PIN entry timeout
pub const PIN_TIMEOUT_MS: u64 = 7_000;

/// Idle timeout before the device powers off
pub const POWEROFF_TIMEOUT_MS: u64 = 300_000;

/// Maximum PIN length
pub const MAX_PIN_LEN: usize = 9;

/// Maximum entropy returned per [`GetEntropy`][hwcoin_proto::GetEntropy] request
pub const MAX_ENTROPY_LEN: usize = hwcoin_proto::MAX_ENTROPY_LEN;

/// Length of the stored wallet entropy
pub const ENTROPY_LEN: usize = 32;

/// Random bytes used to generate the device UUID
pub const UUID_BYTES: usize = 12;

// The whole frame header must fit in the first chunk
const_assert!(CHUNK_SIZE >= HEADER_LEN);
const_assert!(CHUNK_SIZE <= MAX_CHUNK_SIZE);

/// Device runtime configuration, defaults from the constants above
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Data bytes per transport chunk
    pub chunk_size: usize,
    /// Prefix outbound packets with a zero report id
    pub report_id: bool,
    /// Per-chunk transport timeout
    pub io_timeout_ms: u64,
    /// Confirmation dialog timeout
    pub confirm_timeout_ms: u64,
    /// PIN entry timeout
    pub pin_timeout_ms: u64,
    /// Idle poweroff timeout
    pub poweroff_timeout_ms: u64,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            report_id: true,
            io_timeout_ms: IO_TIMEOUT_MS,
            confirm_timeout_ms: CONFIRM_TIMEOUT_MS,
            pin_timeout_ms: PIN_TIMEOUT_MS,
            poweroff_timeout_ms: POWEROFF_TIMEOUT_MS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
