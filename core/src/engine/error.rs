// Copyright (c) 2023 The hwcoin Developers

use hwcoin_proto::{DecodeError, FailureType};

use crate::{crypto::CryptoError, storage::StorageError};

/// [Engine][super::Engine] errors, each reported as a single `Failure` response
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Message type is not handled by the device
    #[cfg_attr(feature = "thiserror", error("Unknown message"))]
    UnknownMessage,

    /// Message is not valid in the current state
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Unexpected(&'static str),

    /// Request payload failed to decode
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Decode(DecodeError),

    /// Malformed request parameters
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Data(&'static str),

    /// Internal derivation or signing failure
    #[cfg_attr(feature = "thiserror", error("{0}"))]
    Process(&'static str),

    /// Key-touching request on an uninitialised device
    #[cfg_attr(feature = "thiserror", error("Device not initialized"))]
    NotInitialized,

    /// User declined a confirmation (or it timed out)
    #[cfg_attr(feature = "thiserror", error("Action cancelled by user"))]
    ActionCancelled,

    /// PIN entry aborted
    #[cfg_attr(feature = "thiserror", error("PIN cancelled"))]
    PinCancelled,

    /// PIN did not match
    #[cfg_attr(feature = "thiserror", error("PIN invalid"))]
    PinInvalid,

    /// Signature verification failed
    #[cfg_attr(feature = "thiserror", error("Invalid signature"))]
    InvalidSignature,

    /// Inputs do not cover outputs
    #[cfg_attr(feature = "thiserror", error("Not enough funds"))]
    NotEnoughFunds,

    /// Persistent storage failure
    #[cfg_attr(feature = "thiserror", error("Firmware error"))]
    Storage(StorageError),
}

impl Error {
    /// Wire failure classification
    pub fn failure_type(&self) -> FailureType {
        match self {
            Error::UnknownMessage | Error::Unexpected(_) => FailureType::UnexpectedMessage,
            Error::Decode(_) | Error::Data(_) => FailureType::DataError,
            Error::Process(_) => FailureType::ProcessError,
            Error::NotInitialized => FailureType::NotInitialized,
            Error::ActionCancelled => FailureType::ActionCancelled,
            Error::PinCancelled => FailureType::PinCancelled,
            Error::PinInvalid => FailureType::PinInvalid,
            Error::InvalidSignature => FailureType::InvalidSignature,
            Error::NotEnoughFunds => FailureType::NotEnoughFunds,
            Error::Storage(_) => FailureType::FirmwareError,
        }
    }

    /// Wire failure text
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::UnknownMessage => "Unknown message",
            Error::Unexpected(s) | Error::Data(s) | Error::Process(s) => s,
            Error::Decode(e) => e.as_str(),
            Error::NotInitialized => "Device not initialized",
            Error::ActionCancelled => "Action cancelled by user",
            Error::PinCancelled => "PIN cancelled",
            Error::PinInvalid => "PIN invalid",
            Error::InvalidSignature => "Invalid signature",
            Error::NotEnoughFunds => "Not enough funds",
            Error::Storage(_) => "Firmware error",
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<CryptoError> for Error {
    fn from(_: CryptoError) -> Self {
        Error::Process("Process error")
    }
}
