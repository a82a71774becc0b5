// Copyright (c) 2023 The hwcoin Developers

//! Key derivation, signing and address primitives

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

mod hdnode;
pub use hdnode::{HDNode, HARDENED};
pub(crate) use hdnode::hmac_sha512;

mod message;
pub use message::{message_digest, sign_message, verify_message, SignatureHeader, VerifyError};

pub mod address;

pub mod multisig;

pub mod identity;

/// Recoverable signature length (header, r, s)
pub const SIGNATURE_LEN: usize = 65;

/// Crypto errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum CryptoError {
    /// Key material is not a valid curve scalar or point
    #[cfg_attr(feature = "thiserror", error("invalid key"))]
    InvalidKey,

    /// Child key derivation produced an invalid key
    #[cfg_attr(feature = "thiserror", error("derivation failed"))]
    DerivationFailed,

    /// Hardened derivation requires a private key
    #[cfg_attr(feature = "thiserror", error("private key required"))]
    PrivateKeyRequired,

    /// Signing failed
    #[cfg_attr(feature = "thiserror", error("signing failed"))]
    SigningFailed,

    /// Encoded value exceeds output capacity
    #[cfg_attr(feature = "thiserror", error("encoding failed"))]
    Encoding,
}

/// Double SHA-256
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let mut h = [0u8; 32];
    h.copy_from_slice(&Sha256::digest(Sha256::digest(data)));
    h
}

/// RIPEMD-160 of SHA-256
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut h = [0u8; 20];
    h.copy_from_slice(&Ripemd160::digest(Sha256::digest(data)));
    h
}

/// Write a Bitcoin compact size length prefix, returning the prefix length
pub fn ser_length(len: u32, out: &mut [u8; 5]) -> usize {
    match len {
        0..=252 => {
            out[0] = len as u8;
            1
        }
        253..=0xffff => {
            out[0] = 253;
            out[1..3].copy_from_slice(&(len as u16).to_le_bytes());
            3
        }
        _ => {
            out[0] = 254;
            out[1..5].copy_from_slice(&len.to_le_bytes());
            5
        }
    }
}

/// Update a digest with a compact size length prefix
pub fn hash_length(hasher: &mut impl Digest, len: u32) {
    let mut b = [0u8; 5];
    let n = ser_length(len, &mut b);
    hasher.update(&b[..n]);
}
