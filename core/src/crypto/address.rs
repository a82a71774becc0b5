// Copyright (c) 2023 The hwcoin Developers

//! Base58check addresses and output scripts

use heapless::{String, Vec};

use hwcoin_proto::AddressString;

use super::{hash160, CryptoError};
use crate::coins::CoinInfo;

/// Address hash length
pub const HASH_LEN: usize = 20;

/// Maximum address prefix length
pub const MAX_PREFIX_LEN: usize = 4;

/// Maximum raw (decoded) address length, prefix and hash
pub const MAX_RAW_LEN: usize = MAX_PREFIX_LEN + HASH_LEN;

/// Address decode errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum AddressError {
    /// Invalid base58 encoding or checksum
    #[cfg_attr(feature = "thiserror", error("invalid encoding"))]
    Encoding,

    /// Prefix does not match a coin address type
    #[cfg_attr(feature = "thiserror", error("unknown address prefix"))]
    Prefix,

    /// Decoded length does not match the prefix and hash lengths
    #[cfg_attr(feature = "thiserror", error("invalid address length"))]
    Length,
}

/// Address kind, selected by prefix
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

/// Decoded address
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Address {
    pub kind: AddressKind,
    /// Prefix (address type) the address was encoded with
    pub prefix: u32,
    pub hash: [u8; HASH_LEN],
}

/// Minimal big-endian prefix length for an address type
pub const fn prefix_len(prefix: u32) -> usize {
    match prefix {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    }
}

/// Write a minimal big-endian prefix, returning the written length
pub fn write_prefix(prefix: u32, out: &mut [u8; MAX_PREFIX_LEN]) -> usize {
    let n = prefix_len(prefix);
    out[..n].copy_from_slice(&prefix.to_be_bytes()[MAX_PREFIX_LEN - n..]);
    n
}

/// Check whether raw address data starts with the provided prefix
pub fn check_prefix(prefix: u32, raw: &[u8]) -> bool {
    let mut p = [0u8; MAX_PREFIX_LEN];
    let n = write_prefix(prefix, &mut p);
    raw.starts_with(&p[..n])
}

/// Base58check encode a value
pub fn base58check_encode<const N: usize>(data: &[u8]) -> Result<String<N>, CryptoError> {
    // Base58 expands by at most 138/100, plus checksum
    let mut buff = [0u8; 128];

    let n = bs58::encode(data)
        .with_check()
        .into(&mut buff[..])
        .map_err(|_| CryptoError::Encoding)?;

    let s = core::str::from_utf8(&buff[..n]).map_err(|_| CryptoError::Encoding)?;
    String::try_from(s).map_err(|_| CryptoError::Encoding)
}

/// Encode an address from a prefix and hash
pub fn encode_address(prefix: u32, hash: &[u8; HASH_LEN]) -> Result<AddressString, CryptoError> {
    let mut raw = [0u8; MAX_RAW_LEN];
    let mut p = [0u8; MAX_PREFIX_LEN];

    let n = write_prefix(prefix, &mut p);
    raw[..n].copy_from_slice(&p[..n]);
    raw[n..][..HASH_LEN].copy_from_slice(hash);

    base58check_encode(&raw[..n + HASH_LEN])
}

/// Decode an address for the provided coin, the prefix must match
/// the coin P2PKH or P2SH address type
pub fn decode_address(address: &str, coin: &CoinInfo) -> Result<Address, AddressError> {
    // Decode buffer includes space for the checksum
    let mut raw = [0u8; MAX_RAW_LEN + 4];

    let n = bs58::decode(address)
        .with_check(None)
        .into(&mut raw[..])
        .map_err(|_| AddressError::Encoding)?;
    let raw = &raw[..n];

    let (kind, prefix) = if check_prefix(coin.address_type, raw) {
        (AddressKind::P2pkh, coin.address_type)
    } else if check_prefix(coin.address_type_p2sh, raw) {
        (AddressKind::P2sh, coin.address_type_p2sh)
    } else {
        return Err(AddressError::Prefix);
    };

    let p = prefix_len(prefix);
    if raw.len() != p + HASH_LEN {
        return Err(AddressError::Length);
    }

    let mut hash = [0u8; HASH_LEN];
    hash.copy_from_slice(&raw[p..]);

    Ok(Address { kind, prefix, hash })
}

/// P2PKH address for a public key
pub fn p2pkh_address(public_key: &[u8], prefix: u32) -> Result<AddressString, CryptoError> {
    encode_address(prefix, &hash160(public_key))
}

/// P2SH-wrapped P2WPKH redeem script hash for a compressed public key
pub fn p2sh_segwit_hash(public_key: &[u8]) -> [u8; HASH_LEN] {
    let mut script = [0u8; 2 + HASH_LEN];
    script[0] = 0x00;
    script[1] = HASH_LEN as u8;
    script[2..].copy_from_slice(&hash160(public_key));

    hash160(&script)
}

/// P2SH-wrapped segwit address for a compressed public key
pub fn p2sh_segwit_address(public_key: &[u8], prefix: u32) -> Result<AddressString, CryptoError> {
    encode_address(prefix, &p2sh_segwit_hash(public_key))
}

/// Output script opcodes
pub mod op {
    pub const PUSHDATA1: u8 = 0x4c;
    pub const RETURN: u8 = 0x6a;
    pub const DUP: u8 = 0x76;
    pub const EQUAL: u8 = 0x87;
    pub const EQUALVERIFY: u8 = 0x88;
    pub const HASH160: u8 = 0xa9;
    pub const CHECKSIG: u8 = 0xac;
    pub const CHECKMULTISIG: u8 = 0xae;

    /// `OP_1` .. `OP_16`
    pub const fn num(n: u8) -> u8 {
        0x50 + n
    }
}

/// Maximum output script length
pub const MAX_SCRIPT_LEN: usize = 520;

/// Output script buffer
pub type Script = Vec<u8, MAX_SCRIPT_LEN>;

/// Pay-to-public-key-hash output script
pub fn p2pkh_script(hash: &[u8; HASH_LEN]) -> [u8; 25] {
    let mut s = [0u8; 25];
    s[0] = op::DUP;
    s[1] = op::HASH160;
    s[2] = HASH_LEN as u8;
    s[3..23].copy_from_slice(hash);
    s[23] = op::EQUALVERIFY;
    s[24] = op::CHECKSIG;
    s
}

/// Pay-to-script-hash output script
pub fn p2sh_script(hash: &[u8; HASH_LEN]) -> [u8; 23] {
    let mut s = [0u8; 23];
    s[0] = op::HASH160;
    s[1] = HASH_LEN as u8;
    s[2..22].copy_from_slice(hash);
    s[22] = op::EQUAL;
    s
}

/// `OP_RETURN` output script
pub fn op_return_script(data: &[u8]) -> Result<Script, CryptoError> {
    let mut s = Script::new();

    let r = match data.len() {
        0..=75 => s.push(op::RETURN).and_then(|_| s.push(data.len() as u8)),
        76..=255 => s
            .push(op::RETURN)
            .and_then(|_| s.push(op::PUSHDATA1))
            .and_then(|_| s.push(data.len() as u8)),
        _ => return Err(CryptoError::Encoding),
    };

    r.map_err(|_| CryptoError::Encoding)?;
    s.extend_from_slice(data).map_err(|_| CryptoError::Encoding)?;

    Ok(s)
}

/// Output script for a decoded address
pub fn address_script(a: &Address) -> Script {
    let mut s = Script::new();

    // Both scripts are well under capacity
    let _ = match a.kind {
        AddressKind::P2pkh => s.extend_from_slice(&p2pkh_script(&a.hash)),
        AddressKind::P2sh => s.extend_from_slice(&p2sh_script(&a.hash)),
    };

    s
}
