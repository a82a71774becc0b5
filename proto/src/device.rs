// Copyright (c) 2023 The hwcoin Developers

//! Device management messages

use heapless::String;

use crate::codec::{Bytes, Repeated};
use crate::types::{CoinType, FailureType};

/// Maximum number of coins advertised in [`Features`]
pub const MAX_COINS: usize = 8;

/// Maximum entropy returned by [`GetEntropy`]
pub const MAX_ENTROPY_LEN: usize = 1024;

message! {
    /// Reset the session and request device [`Features`]
    pub struct Initialize {}
}

message! {
    /// Request device [`Features`]
    pub struct GetFeatures {}
}

message! {
    /// Device features and state
    pub struct Features {
        1 Optional String vendor: Option<String<33>>,
        2 Optional Varint major_version: Option<u32>,
        3 Optional Varint minor_version: Option<u32>,
        4 Optional Varint patch_version: Option<u32>,
        5 Optional Varint bootloader_mode: Option<bool>,
        6 Optional String device_id: Option<String<25>>,
        7 Optional Varint pin_protection: Option<bool>,
        8 Optional Varint passphrase_protection: Option<bool>,
        9 Optional String language: Option<String<17>>,
        10 Optional String label: Option<String<33>>,
        11 Repeated Message coins: Repeated<CoinType, MAX_COINS>,
        12 Optional Varint initialized: Option<bool>,
        13 Optional Bytes revision: Option<Bytes<20>>,
        15 Optional Varint imported: Option<bool>,
        16 Optional Varint pin_cached: Option<bool>,
        17 Optional Varint passphrase_cached: Option<bool>,
        19 Optional Varint needs_backup: Option<bool>,
        20 Optional Varint flags: Option<u32>,
    }
}

message! {
    /// Liveness check, optionally gated by confirmation or PIN
    pub struct Ping {
        1 Optional String message: Option<String<256>>,
        2 Optional Varint button_protection: Option<bool>,
        3 Optional Varint pin_protection: Option<bool>,
        4 Optional Varint passphrase_protection: Option<bool>,
    }
}

message! {
    /// Generic success response
    pub struct Success {
        1 Optional String message: Option<String<256>>,
    }
}

message! {
    /// Generic failure response
    pub struct Failure {
        1 Optional Varint code: Option<FailureType>,
        2 Optional String message: Option<String<256>>,
    }
}

message! {
    /// Set, change or remove the device PIN
    pub struct ChangePin {
        1 Optional Varint remove: Option<bool>,
    }
}

message! {
    /// Erase all wallet data
    pub struct WipeDevice {}
}

message! {
    /// Request random bytes from the device
    pub struct GetEntropy {
        1 Required Varint size: u32,
    }
}

message! {
    /// Device-generated random bytes
    pub struct Entropy {
        1 Required Bytes entropy: Bytes<MAX_ENTROPY_LEN>,
    }
}

message! {
    /// Initialise a new wallet
    pub struct ResetDevice {
        1 Optional Varint display_random: Option<bool>,
        2 Optional Varint strength: Option<u32>,
        3 Optional Varint passphrase_protection: Option<bool>,
        4 Optional Varint pin_protection: Option<bool>,
        5 Optional String language: Option<String<17>>,
        6 Optional String label: Option<String<33>>,
        8 Optional Varint skip_backup: Option<bool>,
    }
}

message! {
    /// Device request for host entropy during reset
    pub struct EntropyRequest {}
}

message! {
    /// Host entropy supplied during reset
    pub struct EntropyAck {
        1 Optional Bytes entropy: Option<Bytes<128>>,
    }
}

message! {
    /// Mark the wallet seed as backed up
    pub struct BackupDevice {}
}

message! {
    /// Abort the in-progress operation
    pub struct Cancel {}
}

message! {
    /// Clear cached session data (seed and PIN)
    pub struct ClearSession {}
}

message! {
    /// Apply device settings
    pub struct ApplySettings {
        1 Optional String language: Option<String<17>>,
        2 Optional String label: Option<String<33>>,
        3 Optional Varint use_passphrase: Option<bool>,
        4 Optional Bytes homescreen: Option<Bytes<1024>>,
    }
}

message! {
    /// Set device flags (bitwise OR with stored flags)
    pub struct ApplyFlags {
        1 Optional Varint flags: Option<u32>,
    }
}

impl Success {
    /// Create a success response with the provided message
    pub fn new(message: &str) -> Self {
        Self {
            message: String::try_from(message).ok(),
        }
    }
}

impl Failure {
    /// Create a failure response with the provided code and message
    pub fn new(code: FailureType, message: &str) -> Self {
        Self {
            code: Some(code),
            message: String::try_from(message).ok(),
        }
    }
}
