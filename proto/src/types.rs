// Copyright (c) 2023 The hwcoin Developers

//! Shared types and enumerations

use heapless::String;

use crate::codec::{Bytes, Repeated};

/// Maximum BIP-0032 derivation path depth
pub const MAX_PATH_LEN: usize = 8;

/// Maximum number of keys in a multisig redeem script
pub const MAX_MULTISIG_KEYS: usize = 15;

/// Maximum encoded address length
pub const MAX_ADDRESS_LEN: usize = 41;

/// Maximum coin name length
pub const MAX_COIN_NAME_LEN: usize = 17;

/// Maximum DER signature length (with sighash byte)
pub const MAX_DER_SIGNATURE_LEN: usize = 73;

/// BIP-0032 derivation path
pub type AddressPath = Repeated<u32, MAX_PATH_LEN>;

/// Coin name string
pub type CoinName = String<MAX_COIN_NAME_LEN>;

/// Encoded address string
pub type AddressString = String<MAX_ADDRESS_LEN>;

enumeration! {
    /// Failure classification carried in [`Failure`][crate::Failure] responses
    pub enum FailureType {
        UnexpectedMessage = 1,
        ButtonExpected = 2,
        DataError = 3,
        ActionCancelled = 4,
        PinExpected = 5,
        PinCancelled = 6,
        PinInvalid = 7,
        InvalidSignature = 8,
        ProcessError = 9,
        NotEnoughFunds = 10,
        NotInitialized = 11,
        FirmwareError = 99,
    }
}

enumeration! {
    /// Script type for inputs and owned addresses
    pub enum InputScriptType {
        /// Pay-to-public-key-hash
        SpendAddress = 0,
        /// P2SH multisig
        SpendMultisig = 1,
        /// Not owned by this device
        External = 2,
        /// Native segwit
        SpendWitness = 3,
        /// Segwit wrapped in P2SH
        SpendP2shWitness = 4,
    }
}

enumeration! {
    /// Script type for transaction outputs
    pub enum OutputScriptType {
        PayToAddress = 0,
        PayToScriptHash = 1,
        PayToMultisig = 2,
        PayToOpReturn = 3,
        PayToWitness = 4,
        PayToP2shWitness = 5,
    }
}

enumeration! {
    /// Kind of data requested by a [`TxRequest`][crate::TxRequest]
    pub enum RequestType {
        TxInput = 0,
        TxOutput = 1,
        TxMeta = 2,
        TxFinished = 3,
        TxExtraData = 4,
    }
}

message! {
    /// Serialised BIP-0032 node
    pub struct HDNodeType {
        1 Required Varint depth: u32,
        2 Required Varint fingerprint: u32,
        3 Required Varint child_num: u32,
        4 Required Bytes chain_code: Bytes<32>,
        5 Optional Bytes private_key: Option<Bytes<32>>,
        6 Optional Bytes public_key: Option<Bytes<33>>,
    }
}

message! {
    /// Node with a relative (public derivation) path
    pub struct HDNodePathType {
        1 Required Message node: HDNodeType,
        2 Repeated Varint address_n: AddressPath,
    }
}

message! {
    /// Coin parameters, as advertised in [`Features`][crate::Features]
    pub struct CoinType {
        1 Optional String coin_name: Option<CoinName>,
        2 Optional String coin_shortcut: Option<String<9>>,
        3 Optional Varint address_type: Option<u32>,
        4 Optional Varint maxfee_kb: Option<u64>,
        5 Optional Varint address_type_p2sh: Option<u32>,
        8 Optional String signed_message_header: Option<String<32>>,
        9 Optional Varint xpub_magic: Option<u32>,
        10 Optional Varint xprv_magic: Option<u32>,
        11 Optional Varint segwit: Option<bool>,
    }
}

message! {
    /// Multisig redeem script description
    pub struct MultisigRedeemScriptType {
        1 Repeated Message pubkeys: Repeated<HDNodePathType, MAX_MULTISIG_KEYS>,
        2 Repeated Bytes signatures: Repeated<Bytes<MAX_DER_SIGNATURE_LEN>, MAX_MULTISIG_KEYS>,
        3 Optional Varint m: Option<u32>,
    }
}

message! {
    /// Transaction input
    pub struct TxInputType {
        1 Repeated Varint address_n: AddressPath,
        2 Required Bytes prev_hash: Bytes<32>,
        3 Required Varint prev_index: u32,
        4 Optional Bytes script_sig: Option<Bytes<1650>>,
        5 Optional Varint sequence: Option<u32>,
        6 Optional Varint script_type: Option<InputScriptType>,
        7 Optional Message multisig: Option<MultisigRedeemScriptType>,
        8 Optional Varint amount: Option<u64>,
    }
}

impl TxInputType {
    /// Input sequence, defaulting to final
    pub fn sequence(&self) -> u32 {
        self.sequence.unwrap_or(0xffff_ffff)
    }

    pub fn script_type(&self) -> InputScriptType {
        self.script_type.unwrap_or_default()
    }
}

message! {
    /// Transaction output
    pub struct TxOutputType {
        1 Optional String address: Option<AddressString>,
        2 Repeated Varint address_n: AddressPath,
        3 Required Varint amount: u64,
        4 Required Varint script_type: OutputScriptType,
        5 Optional Message multisig: Option<MultisigRedeemScriptType>,
        6 Optional Bytes op_return_data: Option<Bytes<80>>,
    }
}

message! {
    /// Compiled transaction output
    pub struct TxOutputBinType {
        1 Required Varint amount: u64,
        2 Required Bytes script_pubkey: Bytes<520>,
    }
}

message! {
    /// Transaction data carried by [`TxAck`][crate::TxAck]
    pub struct TransactionType {
        1 Optional Varint version: Option<u32>,
        2 Repeated Message inputs: Repeated<TxInputType, 1>,
        3 Repeated Message bin_outputs: Repeated<TxOutputBinType, 1>,
        4 Optional Varint lock_time: Option<u32>,
        5 Repeated Message outputs: Repeated<TxOutputType, 1>,
        6 Optional Varint inputs_cnt: Option<u32>,
        7 Optional Varint outputs_cnt: Option<u32>,
    }
}

message! {
    /// Index of the requested item
    pub struct TxRequestDetailsType {
        1 Optional Varint request_index: Option<u32>,
        2 Optional Bytes tx_hash: Option<Bytes<32>>,
    }
}

message! {
    /// Signature and serialised transaction data streamed back to the host
    pub struct TxRequestSerializedType {
        1 Optional Varint signature_index: Option<u32>,
        2 Optional Bytes signature: Option<Bytes<MAX_DER_SIGNATURE_LEN>>,
        3 Optional Bytes serialized_tx: Option<Bytes<2048>>,
    }
}

message! {
    /// SLIP-0013 identity
    pub struct IdentityType {
        1 Optional String proto: Option<String<9>>,
        2 Optional String user: Option<String<64>>,
        3 Optional String host: Option<String<64>>,
        4 Optional String port: Option<String<6>>,
        5 Optional String path: Option<String<256>>,
        6 Optional Varint index: Option<u32>,
    }
}
