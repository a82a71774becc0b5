// Copyright (c) 2023 The hwcoin Developers

//! Hardware coin wallet core
//!
//! This provides a common [Engine][engine] supporting key derivation,
//! message and transaction signing for execution on hardware wallets.
//!
//! Interactions with the [Engine][engine] are performed via [Event][engine::Event]s
//! and [Output][engine::Output]s, see [hwcoin_proto] for message objects and
//! wire encodings. A [Device][device::Device] binds an engine to a framed
//! [Channel][channel::Channel] over a platform [Transport][channel::Transport].
//!
//! ## Operations
//!
//! Prior to interacting with a device the client should issue an
//! [`Initialize`][hwcoin_proto::Initialize] to abort any in-progress
//! operation and fetch [`Features`][hwcoin_proto::Features] describing the
//! device version, initialisation and PIN state.
//!
//! ### Initialising a device
//!
//! 1. Issue [`ResetDevice`][hwcoin_proto::ResetDevice], optionally setting a
//!    PIN, to receive an [`EntropyRequest`][hwcoin_proto::EntropyRequest]
//! 2. Issue [`EntropyAck`][hwcoin_proto::EntropyAck] with host entropy, this is
//!    mixed with device entropy to generate the wallet seed
//!
//! ### Requesting keys and addresses
//!
//! Public nodes can be requested via [`GetPublicKey`][hwcoin_proto::GetPublicKey],
//! returning a [`PublicKey`][hwcoin_proto::PublicKey] containing the BIP-0032
//! node and extended public key for a given path.
//!
//! Addresses (P2PKH, P2SH-segwit and P2SH multisig) can be requested via
//! [`GetAddress`][hwcoin_proto::GetAddress], returning an
//! [`Address`][hwcoin_proto::Address].
//!
//! ### Executing a transaction
//!
//! Transactions are streamed to the device one item at a time, the device
//! driving the exchange via [`TxRequest`][hwcoin_proto::TxRequest]s.
//!
//! 1. Issue [`SignTx`][hwcoin_proto::SignTx] with input and output counts
//! 2. Answer each [`TxRequest`][hwcoin_proto::TxRequest] with a
//!    [`TxAck`][hwcoin_proto::TxAck] carrying the requested input or output
//!     1. Inputs and outputs are first supplied for confirmation
//!     2. Each input is then signed, with all inputs and outputs supplied again
//!        and checked against the confirmed transaction
//!     3. Outputs are finally supplied again for serialisation
//! 3. Collect signatures and serialised transaction fragments from each
//!    [`TxRequest`][hwcoin_proto::TxRequest] until
//!    [`RequestType::TxFinished`][hwcoin_proto::RequestType::TxFinished]
//!
//! Any failure aborts the transaction, requiring the client to restart
//! from [`SignTx`][hwcoin_proto::SignTx].

#![cfg_attr(not(feature = "std"), no_std)]

pub use hwcoin_proto::{self as proto};

pub mod channel;

pub mod coins;

pub mod consts;

pub mod crypto;

pub mod device;

pub mod engine;

pub mod helpers;

pub mod pin;

pub mod storage;

pub mod ui;
