// Copyright (c) 2023 The hwcoin Developers

//! User interaction
//!
//! The [`Engine`][crate::engine::Engine] consults the user through the [`Ui`]
//! trait. [`PollingUi`] provides a reference implementation over a
//! character [`Terminal`], polling for input with explicit timeouts so a
//! dialog can never block forever.

use emstr::EncodeStr;

use crate::{consts::Config, pin::Pin};

/// Confirmation and display collaborator
pub trait Ui {
    /// Display the provided prompt (concatenated parts) and block for
    /// accept / reject. Timeouts reject.
    fn confirm(&mut self, parts: &[&str]) -> bool;

    /// Collect a PIN, `None` on cancellation or timeout
    fn enter_pin(&mut self, is_new: bool) -> Option<Pin>;

    /// Display operation progress (0..=1000)
    fn show_progress(&mut self, label: &str, permille: u32);

    /// Display a public key
    fn show_public_key(&mut self, public_key: &[u8]);
}

impl<T: Ui> Ui for &mut T {
    fn confirm(&mut self, parts: &[&str]) -> bool {
        T::confirm(self, parts)
    }

    fn enter_pin(&mut self, is_new: bool) -> Option<Pin> {
        T::enter_pin(self, is_new)
    }

    fn show_progress(&mut self, label: &str, permille: u32) {
        T::show_progress(self, label, permille)
    }

    fn show_public_key(&mut self, public_key: &[u8]) {
        T::show_public_key(self, public_key)
    }
}

/// Monotonic millisecond clock
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<T: Clock> Clock for &T {
    fn now_ms(&self) -> u64 {
        T::now_ms(self)
    }
}

/// [`Clock`] backed by [`std::time::Instant`]
#[cfg(feature = "std")]
#[derive(Clone, Debug)]
pub struct SystemClock(std::time::Instant);

#[cfg(feature = "std")]
impl SystemClock {
    pub fn new() -> Self {
        Self(std::time::Instant::now())
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

/// Character console used by [`PollingUi`]
pub trait Terminal {
    /// Poll for an input character
    fn read_char(&mut self) -> Option<char>;

    /// Write output text
    fn write_str(&mut self, s: &str);
}

/// Console control characters
const CTRL_C: char = '\x03';
const BACKSPACE: char = '\x08';
const DELETE: char = '\x7f';
const ESCAPE: char = '\x1b';

/// [`Ui`] implementation polling a [`Terminal`] for input.
///
/// Confirmations accept `Y` / `y` and reject `N` / `n`. PIN entry accepts
/// digits, backspace to correct, enter to complete, and Ctrl-C or escape
/// to cancel.
pub struct PollingUi<T: Terminal, C: Clock> {
    term: T,
    clock: C,
    confirm_timeout_ms: u64,
    pin_timeout_ms: u64,
}

impl<T: Terminal, C: Clock> PollingUi<T, C> {
    pub fn new(term: T, clock: C, config: &Config) -> Self {
        Self {
            term,
            clock,
            confirm_timeout_ms: config.confirm_timeout_ms,
            pin_timeout_ms: config.pin_timeout_ms,
        }
    }

    /// Access the underlying terminal
    pub fn terminal(&mut self) -> &mut T {
        &mut self.term
    }

    /// Poll for a character until `deadline`
    fn poll_char(&mut self, deadline: u64) -> Option<char> {
        loop {
            if let Some(c) = self.term.read_char() {
                return Some(c);
            }
            if self.clock.now_ms() >= deadline {
                return None;
            }
            core::hint::spin_loop();
        }
    }
}

impl<T: Terminal, C: Clock> Ui for PollingUi<T, C> {
    fn confirm(&mut self, parts: &[&str]) -> bool {
        for p in parts {
            self.term.write_str(p);
        }
        self.term.write_str("\n[Confirm: Y/N] ");

        let deadline = self.clock.now_ms() + self.confirm_timeout_ms;

        let r = loop {
            match self.poll_char(deadline) {
                Some('Y' | 'y') => break true,
                Some('N' | 'n' | CTRL_C | ESCAPE) => break false,
                Some(_) => (),
                None => {
                    #[cfg(feature = "log")]
                    log::debug!("confirmation timeout");

                    break false;
                }
            }
        };

        self.term.write_str("\n");
        r
    }

    fn enter_pin(&mut self, is_new: bool) -> Option<Pin> {
        self.term.write_str(match is_new {
            true => "Enter new pin: ",
            false => "Enter current pin: ",
        });

        let mut pin = Pin::empty();

        // Each keypress restarts the entry timeout
        let r = loop {
            let deadline = self.clock.now_ms() + self.pin_timeout_ms;

            match self.poll_char(deadline) {
                Some('\r' | '\n') if !pin.is_empty() => break Some(pin),
                Some(c @ '0'..='9') => {
                    if pin.push(c as u8) {
                        self.term.write_str("*");
                    }
                }
                Some(BACKSPACE | DELETE) => {
                    if pin.pop().is_some() {
                        self.term.write_str("\x08 \x08");
                    }
                }
                Some(CTRL_C | ESCAPE) => break None,
                Some(_) => (),
                None => {
                    #[cfg(feature = "log")]
                    log::debug!("pin entry timeout");

                    break None;
                }
            }
        };

        self.term.write_str("\n");
        r
    }

    fn show_progress(&mut self, label: &str, permille: u32) {
        let mut buff = [0u8; 8];
        let n = emstr::write!(&mut buff[..], (permille.min(1000) / 10) as u64, '%').unwrap_or(0);

        self.term.write_str(label);
        self.term.write_str(" [");
        self.term
            .write_str(core::str::from_utf8(&buff[..n]).unwrap_or("?"));
        self.term.write_str("]...\r");
    }

    fn show_public_key(&mut self, public_key: &[u8]) {
        let mut buff = [0u8; 2];

        self.term.write_str("Public key: ");
        for b in public_key {
            if hex::encode_to_slice([*b], &mut buff).is_ok() {
                self.term.write_str(core::str::from_utf8(&buff).unwrap_or("??"));
            }
        }
        self.term.write_str("\n");
    }
}
