// Copyright (c) 2023 The hwcoin Developers

use zeroize::Zeroize;

use super::Error;
use crate::{
    crypto::{hmac_sha512, HDNode},
    storage::{Storage, WalletStorage},
};

/// Seed derivation key applied to stored entropy
const SEED_KEY: &[u8] = b"entropy";

/// Seed length in bytes
pub const SEED_LEN: usize = 64;

/// Volatile session state, lost on power-off and cleared by
/// `ClearSession` / `Initialize`
pub struct Session {
    seed: Option<[u8; SEED_LEN]>,
    pin_cached: bool,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            seed: None,
            pin_cached: false,
        }
    }

    pub fn pin_cached(&self) -> bool {
        self.pin_cached
    }

    pub fn set_pin_cached(&mut self, cached: bool) {
        self.pin_cached = cached;
    }

    /// Check whether a seed has been derived this session
    pub fn seed_cached(&self) -> bool {
        self.seed.is_some()
    }

    /// Drop the cached seed, optionally retaining the PIN state
    pub fn clear(&mut self, clear_pin: bool) {
        self.seed.zeroize();
        self.seed = None;

        if clear_pin {
            self.pin_cached = false;
        }
    }

    /// Fetch the wallet seed, deriving and caching it from stored
    /// entropy on first use
    pub fn seed<S: Storage>(&mut self, storage: &S) -> Result<&[u8; SEED_LEN], Error> {
        if self.seed.is_none() {
            let mut entropy = storage.entropy()?.ok_or(Error::NotInitialized)?;

            let r = hmac_sha512(SEED_KEY, &[&entropy[..]]);
            entropy.zeroize();

            self.seed = Some(r.map_err(|_| Error::Process("Failed to derive seed"))?);

            #[cfg(feature = "log")]
            log::debug!("session seed derived");
        }

        self.seed.as_ref().ok_or(Error::NotInitialized)
    }

    /// Fetch the BIP-0032 master node for the session seed
    pub fn root_node<S: Storage>(&mut self, storage: &S) -> Result<HDNode, Error> {
        let seed = self.seed(storage)?;
        HDNode::from_seed(seed).map_err(|_| Error::Process("Failed to derive private key"))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}
