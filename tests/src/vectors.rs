// Copyright (c) 2023 The hwcoin Developers

//! Shared test vectors

use lazy_static::lazy_static;

use crate::helpers::HARDENED;

/// Default PIN for tests requiring PIN protection
pub const PIN: &str = "1234";

/// Account path, m/44'/0'/0'
pub const ACCOUNT_PATH: &[u32] = &[HARDENED | 44, HARDENED, HARDENED];

/// Receive addresses (relative to [ACCOUNT_PATH])
pub const ADDRESS_INDICES: &[u32] = &[0, 1, 2, 19, 0x7fff_ffff];

lazy_static! {
    /// Host entropy supplied on reset
    pub static ref HOST_ENTROPY: Vec<u8> =
        hex::decode("5c3fa1e0b4d2719c8e6a0f3b2d1c4e5f60718293a4b5c6d7e8f9012345678901").unwrap();
}

/// Messages for signing / verification
pub const MESSAGES: &[&[u8]] = &[
    b"This is an example of a signed message.",
    b"",
    b"\x00\x01\x02 binary \xff",
    &[0x61; 300],
];

/// SLIP-0013 identity vector
#[derive(Clone, PartialEq, Debug)]
pub struct IdentityVector {
    pub proto: Option<&'static str>,
    pub user: Option<&'static str>,
    pub host: Option<&'static str>,
    pub port: Option<&'static str>,
    pub path: Option<&'static str>,
    pub index: u32,
    pub uri: &'static str,
}

pub const IDENTITIES: &[IdentityVector] = &[
    IdentityVector {
        proto: Some("https"),
        user: Some("satoshi"),
        host: Some("bitcoin.org"),
        port: None,
        path: Some("/login"),
        index: 0,
        uri: "https://satoshi@bitcoin.org/login",
    },
    IdentityVector {
        proto: Some("ftp"),
        user: Some("satoshi"),
        host: Some("bitcoin.org"),
        port: Some("2323"),
        path: Some("/pub"),
        index: 3,
        uri: "ftp://satoshi@bitcoin.org:2323/pub",
    },
    IdentityVector {
        proto: Some("ssh"),
        user: Some("satoshi"),
        host: Some("bitcoin.org"),
        port: None,
        path: None,
        index: 47,
        uri: "ssh://satoshi@bitcoin.org",
    },
];

/// Transaction vector, amounts in base units
#[derive(Clone, PartialEq, Debug)]
pub struct TxVector {
    /// Input amounts, spent from consecutive receive addresses
    pub inputs: &'static [u64],
    /// External output amounts
    pub outputs: &'static [u64],
    /// Change output amount, if any
    pub change: Option<u64>,
    pub lock_time: u32,
}

pub const TRANSACTIONS: &[TxVector] = &[
    TxVector {
        inputs: &[100_000],
        outputs: &[90_000],
        change: None,
        lock_time: 0,
    },
    TxVector {
        inputs: &[50_000, 70_000],
        outputs: &[90_000],
        change: Some(20_000),
        lock_time: 500_000,
    },
    TxVector {
        inputs: &[1_000_000, 2_000_000, 3_000_000],
        outputs: &[1_500_000, 2_500_000],
        change: Some(1_900_000),
        lock_time: 0,
    },
];
