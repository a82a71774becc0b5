// Copyright (c) 2023 The hwcoin Developers

//! Key, address, message signing and identity messages

use heapless::String;

use crate::codec::Bytes;
use crate::types::{
    AddressPath, AddressString, CoinName, HDNodeType, IdentityType, InputScriptType,
    MultisigRedeemScriptType,
};

/// Maximum signed / verified message length
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Recoverable signature length (header byte, r, s)
pub const SIGNATURE_LEN: usize = 65;

message! {
    /// Request the public node at the provided path
    pub struct GetPublicKey {
        1 Repeated Varint address_n: AddressPath,
        2 Optional String ecdsa_curve_name: Option<String<32>>,
        3 Optional Varint show_display: Option<bool>,
        4 Optional String coin_name: Option<CoinName>,
    }
}

message! {
    /// Public node and extended public key
    pub struct PublicKey {
        1 Required Message node: HDNodeType,
        2 Optional String xpub: Option<String<112>>,
    }
}

message! {
    /// Request the address at the provided path
    pub struct GetAddress {
        1 Repeated Varint address_n: AddressPath,
        2 Optional String coin_name: Option<CoinName>,
        3 Optional Varint show_display: Option<bool>,
        4 Optional Message multisig: Option<MultisigRedeemScriptType>,
        5 Optional Varint script_type: Option<InputScriptType>,
    }
}

message! {
    /// Encoded address
    pub struct Address {
        1 Required String address: AddressString,
    }
}

message! {
    /// Sign a message with the key at the provided path
    pub struct SignMessage {
        1 Repeated Varint address_n: AddressPath,
        2 Required Bytes message: Bytes<MAX_MESSAGE_LEN>,
        3 Optional String coin_name: Option<CoinName>,
        4 Optional Varint script_type: Option<InputScriptType>,
    }
}

message! {
    /// Verify a message signature against an address
    pub struct VerifyMessage {
        1 Optional String address: Option<AddressString>,
        2 Optional Bytes signature: Option<Bytes<SIGNATURE_LEN>>,
        3 Optional Bytes message: Option<Bytes<MAX_MESSAGE_LEN>>,
        4 Optional String coin_name: Option<CoinName>,
    }
}

message! {
    /// Message signature and signing address
    pub struct MessageSignature {
        1 Optional String address: Option<AddressString>,
        2 Optional Bytes signature: Option<Bytes<SIGNATURE_LEN>>,
    }
}

message! {
    /// Sign a challenge with a SLIP-0013 identity key
    pub struct SignIdentity {
        1 Optional Message identity: Option<IdentityType>,
        2 Optional Bytes challenge_hidden: Option<Bytes<256>>,
        3 Optional String challenge_visual: Option<String<256>>,
        4 Optional String ecdsa_curve_name: Option<String<32>>,
    }
}

message! {
    /// Identity challenge signature
    pub struct SignedIdentity {
        1 Optional String address: Option<AddressString>,
        2 Optional Bytes public_key: Option<Bytes<33>>,
        3 Optional Bytes signature: Option<Bytes<SIGNATURE_LEN>>,
    }
}

message! {
    /// Request an ECDH shared secret with a SLIP-0017 identity key
    pub struct GetECDHSessionKey {
        1 Optional Message identity: Option<IdentityType>,
        2 Optional Bytes peer_public_key: Option<Bytes<65>>,
        3 Optional String ecdsa_curve_name: Option<String<32>>,
    }
}

message! {
    /// ECDH shared secret (uncompressed point)
    pub struct ECDHSessionKey {
        1 Optional Bytes session_key: Option<Bytes<65>>,
    }
}

impl GetAddress {
    pub fn script_type(&self) -> InputScriptType {
        self.script_type.unwrap_or_default()
    }
}

impl SignMessage {
    pub fn script_type(&self) -> InputScriptType {
        self.script_type.unwrap_or_default()
    }
}
