// Copyright (c) 2023 The hwcoin Developers

//! Message signing and verification
//!
//! Signatures are 65 bytes: a header byte followed by `r` and `s`. The
//! header jointly encodes the recovery id and the address family the
//! signing key is presented as:
//!
//! | Header   | Family                         |
//! |----------|--------------------------------|
//! | 27..=30  | P2PKH, uncompressed public key |
//! | 31..=34  | P2PKH, compressed public key   |
//! | 35..=38  | P2SH wrapped segwit            |
//! | 39..=42  | Native segwit                  |

use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey,
};
use sha2::{Digest, Sha256};

use hwcoin_proto::InputScriptType;

use super::{address::p2sh_segwit_hash, hash160, hash_length, CryptoError, HDNode, SIGNATURE_LEN};
use crate::coins::CoinInfo;

/// Lowest valid header byte
const HEADER_BASE: u8 = 27;

/// Highest accepted header byte
const HEADER_MAX: u8 = 43;

/// Message verification errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum VerifyError {
    /// Header byte out of range
    #[cfg_attr(feature = "thiserror", error("invalid signature header"))]
    InvalidHeader,

    /// Public key recovery failed
    #[cfg_attr(feature = "thiserror", error("public key recovery failed"))]
    RecoveryFailed,

    /// Recovered key does not match the address
    #[cfg_attr(feature = "thiserror", error("address mismatch"))]
    AddressMismatch,

    /// Address type does not match the signature family
    #[cfg_attr(feature = "thiserror", error("address type mismatch"))]
    TypeMismatch,

    /// Signature family cannot be verified
    #[cfg_attr(feature = "thiserror", error("unsupported signature type"))]
    Unsupported,
}

/// Decoded signature header
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SignatureHeader {
    P2pkh { recid: u8, compressed: bool },
    P2shSegwit { recid: u8 },
    NativeSegwit { recid: u8 },
}

impl SignatureHeader {
    /// Select the header for a signing script type
    pub fn for_script_type(script_type: InputScriptType, recid: u8) -> Self {
        let recid = recid & 0x03;

        match script_type {
            InputScriptType::SpendP2shWitness => Self::P2shSegwit { recid },
            InputScriptType::SpendWitness => Self::NativeSegwit { recid },
            _ => Self::P2pkh {
                recid,
                compressed: true,
            },
        }
    }

    /// Parse a header byte
    pub fn parse(b: u8) -> Result<Self, VerifyError> {
        if !(HEADER_BASE..=HEADER_MAX).contains(&b) {
            return Err(VerifyError::InvalidHeader);
        }

        let recid = (b - HEADER_BASE) % 4;

        match b {
            27..=30 => Ok(Self::P2pkh {
                recid,
                compressed: false,
            }),
            31..=34 => Ok(Self::P2pkh {
                recid,
                compressed: true,
            }),
            35..=38 => Ok(Self::P2shSegwit { recid }),
            39..=42 => Ok(Self::NativeSegwit { recid }),
            // In range, but no family is defined
            _ => Err(VerifyError::Unsupported),
        }
    }

    pub fn to_byte(&self) -> u8 {
        match self {
            Self::P2pkh {
                recid,
                compressed: false,
            } => 27 + recid,
            Self::P2pkh {
                recid,
                compressed: true,
            } => 31 + recid,
            Self::P2shSegwit { recid } => 35 + recid,
            Self::NativeSegwit { recid } => 39 + recid,
        }
    }

    pub fn recid(&self) -> u8 {
        match self {
            Self::P2pkh { recid, .. } => *recid,
            Self::P2shSegwit { recid } => *recid,
            Self::NativeSegwit { recid } => *recid,
        }
    }
}

/// Compute the signed message digest for a coin
pub fn message_digest(coin: &CoinInfo, message: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(coin.signed_message_header.as_bytes());
    hash_length(&mut h, message.len() as u32);
    h.update(message);

    let mut d = [0u8; 32];
    d.copy_from_slice(&Sha256::digest(h.finalize()));
    d
}

/// Sign a message with the provided node
pub fn sign_message(
    coin: &CoinInfo,
    node: &HDNode,
    script_type: InputScriptType,
    message: &[u8],
) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let digest = message_digest(coin, message);
    let (sig, recid) = node.sign_digest(&digest)?;

    let header = SignatureHeader::for_script_type(script_type, recid.to_byte());

    let mut b = [0u8; SIGNATURE_LEN];
    b[0] = header.to_byte();
    b[1..].copy_from_slice(&sig.to_bytes());

    Ok(b)
}

/// Verify a message signature against an address (type and hash)
pub fn verify_message(
    coin: &CoinInfo,
    message: &[u8],
    address_type: u32,
    address_hash: &[u8; 20],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<(), VerifyError> {
    let header = SignatureHeader::parse(signature[0])?;
    if let SignatureHeader::NativeSegwit { .. } = header {
        return Err(VerifyError::Unsupported);
    }

    let digest = message_digest(coin, message);

    let public_key = recover(&digest, header.recid(), &signature[1..])?;

    let hash = match header {
        SignatureHeader::P2pkh { compressed, .. } => {
            if address_type != coin.address_type {
                return Err(VerifyError::TypeMismatch);
            }
            hash160(public_key.to_encoded_point(compressed).as_bytes())
        }
        SignatureHeader::P2shSegwit { .. } => {
            if address_type != coin.address_type_p2sh {
                return Err(VerifyError::TypeMismatch);
            }
            p2sh_segwit_hash(public_key.to_encoded_point(true).as_bytes())
        }
        SignatureHeader::NativeSegwit { .. } => return Err(VerifyError::Unsupported),
    };

    match &hash == address_hash {
        true => Ok(()),
        false => Err(VerifyError::AddressMismatch),
    }
}

/// Recover the signing public key from a digest and `r || s`
fn recover(digest: &[u8; 32], recid: u8, rs: &[u8]) -> Result<PublicKey, VerifyError> {
    let mut sig = Signature::from_slice(rs).map_err(|_| VerifyError::RecoveryFailed)?;
    let mut recid = RecoveryId::from_byte(recid).ok_or(VerifyError::RecoveryFailed)?;

    // Recovery requires low-S, negating s flips the point parity
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let vk = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| VerifyError::RecoveryFailed)?;

    Ok(PublicKey::from(&vk))
}
