// Copyright (c) 2023 The hwcoin Developers

//! Device PIN type and comparison

use zeroize::Zeroize;

use crate::consts::MAX_PIN_LEN;

/// Number of steps taken by [`Pin::compare`], independent of PIN contents
pub const PIN_COMPARE_STEPS: usize = MAX_PIN_LEN + 1;

/// Device PIN, one to [`MAX_PIN_LEN`] ASCII digits.
///
/// Digits are held in a zero-padded buffer that is wiped on drop.
#[derive(Clone)]
pub struct Pin {
    digits: [u8; PIN_COMPARE_STEPS],
    len: usize,
}

impl Pin {
    /// Create an empty PIN for digit entry
    pub const fn empty() -> Self {
        Self {
            digits: [0u8; PIN_COMPARE_STEPS],
            len: 0,
        }
    }

    /// Create a PIN from a digit string, `None` if empty, too long,
    /// or containing non-digit characters
    pub fn new(s: &str) -> Option<Self> {
        Self::from_bytes(s.as_bytes())
    }

    /// Create a PIN from raw digit bytes
    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        if b.is_empty() || b.len() > MAX_PIN_LEN || !b.iter().all(u8::is_ascii_digit) {
            return None;
        }

        let mut p = Self::empty();
        p.digits[..b.len()].copy_from_slice(b);
        p.len = b.len();

        Some(p)
    }

    /// Append a digit, returns false if the PIN is full or `c` is not a digit
    pub fn push(&mut self, c: u8) -> bool {
        if !c.is_ascii_digit() || self.len >= MAX_PIN_LEN {
            return false;
        }

        self.digits[self.len] = c;
        self.len += 1;
        true
    }

    /// Remove the last digit
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;
        let c = self.digits[self.len];
        self.digits[self.len] = 0;
        Some(c)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.digits[..self.len]
    }

    /// Compare against a candidate PIN.
    ///
    /// Every byte of both zero-padded buffers is visited, so the padding
    /// terminator catches length mismatches and the number of steps does
    /// not depend on where the PINs first differ. Returns the match result
    /// and the step count.
    pub fn compare(&self, candidate: &Pin) -> (bool, usize) {
        let mut diff = 0u8;
        let mut steps = 0;

        for (a, b) in self.digits.iter().zip(candidate.digits.iter()) {
            diff |= a ^ b;
            steps += 1;
        }

        (core::hint::black_box(diff) == 0, steps)
    }
}

impl Default for Pin {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other).0
    }
}

impl core::fmt::Debug for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Pin(<{} digits>)", self.len)
    }
}

impl Zeroize for Pin {
    fn zeroize(&mut self) {
        self.digits.zeroize();
        self.len = 0;
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        self.zeroize();
    }
}
