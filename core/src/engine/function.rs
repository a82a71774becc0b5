// Copyright (c) 2023 The hwcoin Developers

use super::signing::SigningSession;
use crate::pin::Pin;

pub struct Function {
    inner: FunctionType,
}

impl Default for Function {
    fn default() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }
}

/// Enum for multi-message state machines, at most one of which may be
/// active at a time
#[allow(clippy::large_enum_variant)]
enum FunctionType {
    None,

    /// Device reset awaiting host entropy
    Reset(ResetState),

    /// Transaction signing in progress
    Signing(SigningSession),
}

/// Pending reset state, held between `ResetDevice` and `EntropyAck`
#[derive(Default)]
pub struct ResetState {
    /// PIN to apply on completion
    pub pin: Option<Pin>,
    pub passphrase_protection: bool,
    pub skip_backup: bool,
}

impl Function {
    /// Create a new / empty function context
    pub const fn new() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }

    /// Check whether no function is active
    pub fn is_none(&self) -> bool {
        matches!(self.inner, FunctionType::None)
    }

    /// Setup reset context, replacing any active function
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn reset_init(&mut self, state: ResetState) {
        // Clear function prior to init (executes drop)
        self.clear();

        self.inner = FunctionType::Reset(state);
    }

    /// Check whether a reset is awaiting entropy
    pub fn is_reset(&self) -> bool {
        matches!(self.inner, FunctionType::Reset(_))
    }

    /// Take pending reset context, leaving no function active
    pub fn take_reset(&mut self) -> Option<ResetState> {
        match core::mem::take(&mut self.inner) {
            FunctionType::Reset(r) => Some(r),
            other => {
                self.inner = other;
                None
            }
        }
    }

    /// Setup signing context, replacing any active function
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn signing_init(&mut self, session: SigningSession) -> &mut SigningSession {
        self.clear();

        self.inner = FunctionType::Signing(session);

        match &mut self.inner {
            FunctionType::Signing(s) => s,
            // Set immediately above
            _ => unreachable!(),
        }
    }

    /// Fetch signing context
    pub fn signing(&mut self) -> Option<&mut SigningSession> {
        match &mut self.inner {
            FunctionType::Signing(s) => Some(s),
            _ => None,
        }
    }

    /// Fetch signing context
    pub fn signing_ref(&self) -> Option<&SigningSession> {
        match &self.inner {
            FunctionType::Signing(s) => Some(s),
            _ => None,
        }
    }

    /// Clear context, executing drop if required
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn clear(&mut self) {
        #[cfg(feature = "log")]
        match &self.inner {
            FunctionType::Reset(_) => log::debug!("aborting reset"),
            FunctionType::Signing(_) => log::debug!("aborting signing"),
            FunctionType::None => (),
        }

        self.inner = FunctionType::None;
    }
}

impl Default for FunctionType {
    fn default() -> Self {
        Self::None
    }
}
