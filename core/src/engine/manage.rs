// Copyright (c) 2023 The hwcoin Developers

//! Device management handlers

use heapless::String;
use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use hwcoin_proto::{
    codec::Repeated, ApplyFlags, ApplySettings, ChangePin, Entropy, EntropyAck, EntropyRequest,
    Features, GetEntropy, Ping, ResetDevice, Success, MAX_ENTROPY_LEN,
};

use super::{Engine, Error, Output, ResetState};
use crate::{
    coins::COINS,
    consts::{ENTROPY_LEN, UUID_BYTES, VENDOR, VERSION},
    storage::{Storage, Uuid, WalletStorage},
    ui::Ui,
};

impl<S: Storage, U: Ui, RNG: CryptoRngCore> Engine<S, U, RNG> {
    /// Abort any active flow and clear the session (retaining the PIN cache)
    pub(super) fn initialize(&mut self) -> Result<Output, Error> {
        self.function.clear();
        self.session.clear(false);

        self.features().map(Output::from)
    }

    /// Build the device feature report
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn features(&mut self) -> Result<Features, Error> {
        let device_id = self.device_id()?;

        let mut coins = Repeated::new();
        for c in COINS {
            coins.push(c.to_coin_type())?;
        }

        let initialized = self.storage.is_initialized();

        Ok(Features {
            vendor: String::try_from(VENDOR).ok(),
            major_version: Some(VERSION.0),
            minor_version: Some(VERSION.1),
            patch_version: Some(VERSION.2),
            bootloader_mode: None,
            device_id: String::try_from(device_id.as_str()).ok(),
            pin_protection: Some(self.storage.has_pin()),
            passphrase_protection: Some(false),
            language: None,
            label: None,
            coins,
            initialized: Some(initialized),
            revision: None,
            imported: Some(false),
            pin_cached: Some(self.session.pin_cached()),
            passphrase_cached: Some(false),
            needs_backup: Some(initialized && self.storage.needs_backup()?),
            flags: Some(self.storage.flags()?),
        })
    }

    /// Fetch the device UUID, generating and storing one on first use
    fn device_id(&mut self) -> Result<Uuid, Error> {
        if let Some(u) = self.storage.uuid()? {
            return Ok(u);
        }

        let mut raw = [0u8; UUID_BYTES];
        self.rng.fill_bytes(&mut raw);

        let mut hex_buff = [0u8; UUID_BYTES * 2];
        hex::encode_to_slice(raw, &mut hex_buff)
            .map_err(|_| Error::Process("Failed to generate device id"))?;
        let s = core::str::from_utf8(&hex_buff)
            .map_err(|_| Error::Process("Failed to generate device id"))?;

        self.storage.set_uuid(s)?;

        #[cfg(feature = "log")]
        log::info!("generated device id {}", s);

        Uuid::try_from(s).map_err(|_| Error::Process("Failed to generate device id"))
    }

    pub(super) fn ping(&mut self, p: &Ping) -> Result<Output, Error> {
        if p.button_protection == Some(true) {
            self.confirm(&["Do you really want to answer to ping?"])?;
        }

        if p.pin_protection == Some(true) {
            self.check_pin(true)?;
        }

        Ok(Output::Success(Success {
            message: p.message.clone(),
        }))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn change_pin(&mut self, c: &ChangePin) -> Result<Output, Error> {
        let remove = c.remove.unwrap_or(false);
        let has_pin = self.storage.has_pin();

        match (remove, has_pin) {
            (true, false) => return Ok(Output::success("PIN removed")),
            (true, true) => self.confirm(&["Do you really want to remove current PIN?"])?,
            (false, true) => self.confirm(&["Do you really want to change current PIN?"])?,
            (false, false) => self.confirm(&["Do you really want to set new PIN?"])?,
        }

        self.check_pin(false)?;

        if remove {
            self.storage.set_pin(None)?;
            return Ok(Output::success("PIN removed"));
        }

        let pin = self.ui.enter_pin(true).ok_or(Error::ActionCancelled)?;
        self.storage.set_pin(Some(&pin))?;
        self.session.set_pin_cached(true);

        Ok(Output::success("PIN changed"))
    }

    pub(super) fn wipe_device(&mut self) -> Result<Output, Error> {
        self.confirm(&["Do you really want to wipe the device?\nAll data will be lost."])?;

        self.storage.wipe()?;
        self.session.clear(true);
        self.function.clear();

        #[cfg(feature = "log")]
        log::info!("device wiped");

        Ok(Output::success("Device wiped"))
    }

    pub(super) fn get_entropy(&mut self, g: &GetEntropy) -> Result<Output, Error> {
        self.confirm(&["Do you really want to send entropy?"])?;

        let len = (g.size as usize).min(MAX_ENTROPY_LEN);

        let mut e = Entropy::default();
        e.entropy
            .0
            .resize(len, 0)
            .map_err(|_| Error::Process("Process error"))?;
        self.rng.fill_bytes(&mut e.entropy);

        Ok(Output::Entropy(e))
    }

    /// Start a device reset, requesting host entropy
    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn reset_device(&mut self, r: &ResetDevice) -> Result<Output, Error> {
        if self.storage.is_initialized() {
            return Err(Error::Unexpected(
                "Device is already initialized. Use Wipe first.",
            ));
        }

        let pin = match r.pin_protection == Some(true) {
            true => Some(self.ui.enter_pin(true).ok_or(Error::ActionCancelled)?),
            false => None,
        };

        self.function.reset_init(ResetState {
            pin,
            passphrase_protection: r.passphrase_protection.unwrap_or(false),
            skip_backup: r.skip_backup.unwrap_or(false),
        });

        Ok(Output::EntropyRequest(EntropyRequest {}))
    }

    /// Complete a device reset, mixing host entropy with internal randomness
    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn entropy_ack(&mut self, a: &EntropyAck) -> Result<Output, Error> {
        let state = self
            .function
            .take_reset()
            .ok_or(Error::Unexpected("Not in Reset mode"))?;

        let mut internal = [0u8; ENTROPY_LEN];
        self.rng.fill_bytes(&mut internal);

        let mut h = Sha256::new();
        h.update(internal);
        if let Some(e) = &a.entropy {
            h.update(&e[..]);
        }
        internal.zeroize();

        let mut entropy = [0u8; ENTROPY_LEN];
        entropy.copy_from_slice(&h.finalize());

        let r = self.store_reset(&entropy, &state);
        entropy.zeroize();
        r?;

        #[cfg(feature = "log")]
        log::info!("device initialized (skip backup: {})", state.skip_backup);

        Ok(Output::success("Device successfully initialized"))
    }

    /// Persist reset results, entropy is written last so a partial write
    /// leaves the device uninitialised
    fn store_reset(&mut self, entropy: &[u8; ENTROPY_LEN], state: &ResetState) -> Result<(), Error> {
        self.storage.set_pin(state.pin.as_ref())?;
        self.storage.set_pin_fails(0)?;
        self.storage.set_backed_up(false)?;
        self.storage.set_entropy(entropy)?;

        self.session.clear(true);
        self.session.set_pin_cached(state.pin.is_some());

        Ok(())
    }

    pub(super) fn backup_device(&mut self) -> Result<Output, Error> {
        self.check_initialized()?;
        self.check_pin(false)?;

        if !self.storage.needs_backup()? {
            return Err(Error::Unexpected("Seed already backed up"));
        }

        self.confirm(&["Do you really want to mark the seed as backed up?"])?;
        self.storage.set_backed_up(true)?;

        Ok(Output::success("Seed successfully backed up"))
    }

    pub(super) fn cancel(&mut self) -> Result<Output, Error> {
        self.function.clear();
        Err(Error::ActionCancelled)
    }

    pub(super) fn clear_session(&mut self) -> Result<Output, Error> {
        self.session.clear(true);
        Ok(Output::success("Session cleared"))
    }

    pub(super) fn apply_settings(&mut self, _s: &ApplySettings) -> Result<Output, Error> {
        Ok(Output::success("Settings applied"))
    }

    pub(super) fn apply_flags(&mut self, f: &ApplyFlags) -> Result<Output, Error> {
        let flags = self.storage.flags()? | f.flags.unwrap_or(0);
        self.storage.set_flags(flags)?;

        Ok(Output::success("Flags applied"))
    }
}
