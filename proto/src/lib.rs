// Copyright (c) 2023 The hwcoin Developers

//! Protocol definitions for hardware coin wallet communication
//!
//! This crate provides the wire protocol used between a host and the
//! wallet device: message definitions, a descriptor-driven codec and the
//! chunked frame format.
//!
//! Messages use a protobuf (proto2) compatible encoding, decoded directly
//! into fixed-capacity structures so that neither side of the codec
//! requires an allocator. See [`codec`] for encoding details and [`frame`]
//! for the transport framing.

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod macros;

pub mod codec;
pub mod device;
pub mod frame;
pub mod tx;
pub mod types;
pub mod wallet;

mod helpers;

pub use codec::{DecodeError, EncodeError, Message};
pub use device::*;
pub use frame::{FrameError, FrameHeader};
pub use tx::*;
pub use types::*;
pub use wallet::*;

/// Wire message type identifiers
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
    strum::Display,
    strum::EnumIter,
)]
#[repr(u16)]
pub enum MessageType {
    Initialize = 0,
    Ping = 1,
    Success = 2,
    Failure = 3,
    ChangePin = 4,
    WipeDevice = 5,
    GetEntropy = 9,
    Entropy = 10,
    GetPublicKey = 11,
    PublicKey = 12,
    ResetDevice = 14,
    SignTx = 15,
    Features = 17,
    Cancel = 20,
    TxRequest = 21,
    TxAck = 22,
    ClearSession = 24,
    ApplySettings = 25,
    ApplyFlags = 28,
    GetAddress = 29,
    Address = 30,
    BackupDevice = 34,
    EntropyRequest = 35,
    EntropyAck = 36,
    SignMessage = 38,
    VerifyMessage = 39,
    MessageSignature = 40,
    SignIdentity = 53,
    SignedIdentity = 54,
    GetFeatures = 55,
    GetECDHSessionKey = 61,
    ECDHSessionKey = 62,
}

impl MessageType {
    /// Check whether a message type is accepted by the device
    pub const fn is_inbound(&self) -> bool {
        use MessageType::*;

        matches!(
            self,
            Initialize
                | Ping
                | ChangePin
                | WipeDevice
                | GetEntropy
                | GetPublicKey
                | ResetDevice
                | SignTx
                | Cancel
                | TxAck
                | ClearSession
                | ApplySettings
                | ApplyFlags
                | GetAddress
                | BackupDevice
                | EntropyAck
                | SignMessage
                | VerifyMessage
                | SignIdentity
                | GetFeatures
                | GetECDHSessionKey
        )
    }
}

/// Binds a message structure to its wire type identifier
pub trait MessageId: Message {
    const MESSAGE_TYPE: MessageType;
}

message_ids! {
    Initialize => Initialize,
    Ping => Ping,
    Success => Success,
    Failure => Failure,
    ChangePin => ChangePin,
    WipeDevice => WipeDevice,
    GetEntropy => GetEntropy,
    Entropy => Entropy,
    GetPublicKey => GetPublicKey,
    PublicKey => PublicKey,
    ResetDevice => ResetDevice,
    SignTx => SignTx,
    Features => Features,
    Cancel => Cancel,
    TxRequest => TxRequest,
    TxAck => TxAck,
    ClearSession => ClearSession,
    ApplySettings => ApplySettings,
    ApplyFlags => ApplyFlags,
    GetAddress => GetAddress,
    Address => Address,
    BackupDevice => BackupDevice,
    EntropyRequest => EntropyRequest,
    EntropyAck => EntropyAck,
    SignMessage => SignMessage,
    VerifyMessage => VerifyMessage,
    MessageSignature => MessageSignature,
    SignIdentity => SignIdentity,
    SignedIdentity => SignedIdentity,
    GetFeatures => GetFeatures,
    GetECDHSessionKey => GetECDHSessionKey,
    ECDHSessionKey => ECDHSessionKey,
}
