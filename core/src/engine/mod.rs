// Copyright (c) 2023 The hwcoin Developers

//! The [Engine] implements the device request state machine.
//!
//! This handles [Event] inputs (decoded request messages) and returns
//! [Output] responses to the caller, see [hwcoin_proto] for message
//! definitions and wire encodings.
//!
//! Each handler checks its preconditions in a fixed order before touching
//! key material: the initialised check (or not-initialised, for setup
//! messages), then the PIN, then user confirmation, and only then the
//! cryptographic operation. Any failed check results in exactly one
//! [`Failure`][hwcoin_proto::Failure] response and leaves persistent state
//! unchanged.
//!
//! Multi-message flows (device reset and transaction signing) are held in
//! a [Function] context, at most one of which is active at a time.
//! `Initialize` and `Cancel` abort any active flow.

use rand_core::{CryptoRngCore, OsRng};

use crate::{
    coins::{coin_by_name, CoinInfo, DEFAULT_COIN},
    crypto::HDNode,
    storage::{Storage, WalletStorage},
    ui::Ui,
};

mod error;
pub use error::Error;

mod event;
pub use event::Event;

mod output;
pub use output::Output;

mod function;
pub use function::{Function, ResetState};

mod session;
pub use session::{Session, SEED_LEN};

mod signing;
pub use signing::{estimate_size_kb, SigningSession, Stage};

mod manage;

mod wallet;

/// Supported curve name for key and identity requests
pub const SECP256K1: &str = "secp256k1";

/// [Engine] provides hardware-independent request handling for wallet devices
pub struct Engine<S: Storage, U: Ui, RNG: CryptoRngCore = OsRng> {
    storage: S,
    ui: U,
    rng: RNG,

    session: Session,
    function: Function,
}

impl<S: Storage, U: Ui> Engine<S, U> {
    /// Create a new engine instance with the provided storage and UI,
    /// using the default [OsRng]
    pub const fn new(storage: S, ui: U) -> Self {
        Self::new_with_rng(storage, ui, OsRng {})
    }
}

impl<S: Storage, U: Ui, RNG: CryptoRngCore> Engine<S, U, RNG> {
    /// Create a new engine instance with the provided storage, UI and rng
    pub const fn new_with_rng(storage: S, ui: U, rng: RNG) -> Self {
        Self {
            storage,
            ui,
            rng,
            session: Session::new(),
            function: Function::new(),
        }
    }

    /// Handle an incoming request event
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:?}", evt.message_type());

        match evt {
            // Empty event, do nothing
            Event::None => Ok(Output::None),

            // Device management
            Event::Initialize(_) => self.initialize(),
            Event::GetFeatures(_) => self.features().map(Output::from),
            Event::Ping(p) => self.ping(p),
            Event::ChangePin(c) => self.change_pin(c),
            Event::WipeDevice(_) => self.wipe_device(),
            Event::GetEntropy(g) => self.get_entropy(g),
            Event::ResetDevice(r) => self.reset_device(r),
            Event::EntropyAck(a) => self.entropy_ack(a),
            Event::BackupDevice(_) => self.backup_device(),
            Event::Cancel(_) => self.cancel(),
            Event::ClearSession(_) => self.clear_session(),
            Event::ApplySettings(s) => self.apply_settings(s),
            Event::ApplyFlags(f) => self.apply_flags(f),

            // Keys and signing
            Event::GetPublicKey(g) => self.get_public_key(g),
            Event::GetAddress(g) => self.get_address(g),
            Event::SignMessage(m) => self.sign_message(m),
            Event::VerifyMessage(v) => self.verify_message(v),
            Event::SignIdentity(s) => self.sign_identity(s),
            Event::GetECDHSessionKey(g) => self.get_ecdh_session_key(g),
            Event::SignTx(t) => self.sign_tx(t),
            Event::TxAck(a) => self.tx_ack(a),
        }
    }

    /// Handle an incoming request event, mapping errors to a `Failure` output
    pub fn handle(&mut self, evt: &Event) -> Output {
        match self.update(evt) {
            Ok(o) => o,
            Err(e) => {
                #[cfg(feature = "log")]
                log::warn!("request {:?} failed: {:?}", evt.message_type(), e);

                Output::from(e)
            }
        }
    }

    /// Parse and handle an inbound frame (message type and payload)
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn handle_frame(&mut self, msg_type: u16, payload: &[u8]) -> Output {
        match Event::parse(msg_type, payload) {
            Ok(evt) => self.handle(&evt),
            Err(e) => {
                #[cfg(feature = "log")]
                log::warn!("failed to parse message {}: {:?}", msg_type, e);

                Output::from(e)
            }
        }
    }

    /// Fetch engine storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Fetch engine storage (mutable)
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Fetch engine UI
    pub fn ui(&mut self) -> &mut U {
        &mut self.ui
    }

    /// Fetch session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch active function context
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Abort any active multi-message flow
    pub fn abort(&mut self) {
        self.function.clear();
    }

    /// Require an initialised device
    fn check_initialized(&self) -> Result<(), Error> {
        match self.storage.is_initialized() {
            true => Ok(()),
            false => Err(Error::NotInitialized),
        }
    }

    /// Check the user PIN, accepting a cached entry where `use_cached` is set.
    ///
    /// Devices without a PIN always pass.
    #[cfg_attr(feature = "noinline", inline(never))]
    fn check_pin(&mut self, use_cached: bool) -> Result<(), Error> {
        let stored = match self.storage.pin()? {
            Some(p) => p,
            None => return Ok(()),
        };

        if use_cached && self.session.pin_cached() {
            return Ok(());
        }

        let candidate = self.ui.enter_pin(false).ok_or(Error::PinCancelled)?;

        let (ok, _steps) = stored.compare(&candidate);
        if !ok {
            let fails = self.storage.pin_fails()?.saturating_add(1);
            self.storage.set_pin_fails(fails)?;

            #[cfg(feature = "log")]
            log::warn!("invalid PIN ({} failures)", fails);

            return Err(Error::PinInvalid);
        }

        self.session.set_pin_cached(true);
        if self.storage.pin_fails()? != 0 {
            self.storage.set_pin_fails(0)?;
        }

        Ok(())
    }

    /// Request user confirmation, rejection cancels the request
    fn confirm(&mut self, parts: &[&str]) -> Result<(), Error> {
        match self.ui.confirm(parts) {
            true => Ok(()),
            false => Err(Error::ActionCancelled),
        }
    }

    /// Derive the node for `path` from the session root
    fn derive_node(&mut self, path: &[u32]) -> Result<HDNode, Error> {
        self.session
            .root_node(&self.storage)?
            .derive_path(path)
            .map_err(|_| Error::Process("Failed to derive private key"))
    }
}

/// Resolve a coin by name, defaulting to Bitcoin
fn coin(name: Option<&str>) -> Result<&'static CoinInfo, Error> {
    coin_by_name(name.unwrap_or(DEFAULT_COIN)).ok_or(Error::Data("Invalid coin name"))
}

/// Check a requested curve is supported
fn check_curve(name: Option<&str>) -> Result<(), Error> {
    match name {
        None | Some(SECP256K1) => Ok(()),
        Some(_) => Err(Error::Data("Unsupported curve")),
    }
}
