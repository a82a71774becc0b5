// Copyright (c) 2023 The hwcoin Developers

//! Tests for hardware coin wallet integration.
//!
//! Generic over [Exchange] and [Operator] for reuse against simulated
//! and physical devices.
//!

pub use client::*;


pub mod vectors;

pub mod init;

pub mod wallet;

pub mod message;

pub mod ident;

pub mod transaction;
