// Copyright (c) 2023 The hwcoin Developers

//! Persistent record storage
//!
//! The device persists small records addressed by `(table, key)` through
//! a platform [`Storage`] implementation. [`WalletStorage`] layers typed
//! accessors for the wallet settings over any [`Storage`].

use byteorder::{ByteOrder, LittleEndian};
use heapless::String;
use zeroize::Zeroize;

use crate::{consts::ENTROPY_LEN, pin::Pin};

/// Table holding wallet settings
pub const TABLE_WALLET: u16 = 0x0001;

/// Table holding bonded peer records
pub const TABLE_BONDS: u16 = 0x0002;

/// Wallet setting keys
pub mod keys {
    pub const UUID: u16 = 0x0001;
    pub const ENTROPY: u16 = 0x0002;
    pub const PIN: u16 = 0x0003;
    pub const PIN_FAILS: u16 = 0x0004;
    pub const FLAGS: u16 = 0x0005;
    pub const BACKUP: u16 = 0x0006;

    /// All wallet keys, for wipe
    pub const ALL: &[u16] = &[UUID, ENTROPY, PIN, PIN_FAILS, FLAGS, BACKUP];
}

/// Maximum record size
pub const MAX_RECORD_LEN: usize = 64;

/// Device UUID length (hex encoded)
pub const UUID_LEN: usize = 24;

/// Device UUID string
pub type Uuid = String<UUID_LEN>;

/// Storage errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum StorageError {
    /// Record exceeds storage or buffer capacity
    #[cfg_attr(feature = "thiserror", error("record too large"))]
    TooLarge,

    /// Storage is full
    #[cfg_attr(feature = "thiserror", error("storage full"))]
    Full,

    /// Stored record is malformed
    #[cfg_attr(feature = "thiserror", error("invalid record"))]
    InvalidRecord,

    /// Underlying storage failure
    #[cfg_attr(feature = "thiserror", error("storage i/o error"))]
    Io,
}

/// [`Storage`] provides atomic access to persisted records
pub trait Storage {
    /// Read a record into `buff`, returning the record slice if present
    fn get<'a>(
        &self,
        table: u16,
        key: u16,
        buff: &'a mut [u8],
    ) -> Result<Option<&'a [u8]>, StorageError>;

    /// Write (create or replace) a record
    fn set(&mut self, table: u16, key: u16, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a record, deleting a missing record is not an error
    fn delete(&mut self, table: u16, key: u16) -> Result<(), StorageError>;

    /// Find the first record in `table` containing `needle` at `offset`
    fn find_by_content(
        &self,
        table: u16,
        offset: usize,
        needle: &[u8],
    ) -> Result<Option<u16>, StorageError>;
}

impl<T: Storage> Storage for &mut T {
    fn get<'a>(
        &self,
        table: u16,
        key: u16,
        buff: &'a mut [u8],
    ) -> Result<Option<&'a [u8]>, StorageError> {
        T::get(self, table, key, buff)
    }

    fn set(&mut self, table: u16, key: u16, value: &[u8]) -> Result<(), StorageError> {
        T::set(self, table, key, value)
    }

    fn delete(&mut self, table: u16, key: u16) -> Result<(), StorageError> {
        T::delete(self, table, key)
    }

    fn find_by_content(
        &self,
        table: u16,
        offset: usize,
        needle: &[u8],
    ) -> Result<Option<u16>, StorageError> {
        T::find_by_content(self, table, offset, needle)
    }
}

/// Typed wallet settings, implemented for all [`Storage`] types
pub trait WalletStorage: Storage {
    /// Entropy presence defines an initialised device
    fn is_initialized(&self) -> bool {
        let mut b = [0u8; MAX_RECORD_LEN];
        let r = matches!(self.get(TABLE_WALLET, keys::ENTROPY, &mut b), Ok(Some(e)) if e.len() == ENTROPY_LEN);
        b.zeroize();
        r
    }

    /// Read the wallet entropy
    fn entropy(&self) -> Result<Option<[u8; ENTROPY_LEN]>, StorageError> {
        let mut b = [0u8; MAX_RECORD_LEN];

        let r = match self.get(TABLE_WALLET, keys::ENTROPY, &mut b)? {
            Some(e) if e.len() == ENTROPY_LEN => {
                let mut entropy = [0u8; ENTROPY_LEN];
                entropy.copy_from_slice(e);
                Ok(Some(entropy))
            }
            Some(_) => Err(StorageError::InvalidRecord),
            None => Ok(None),
        };

        b.zeroize();
        r
    }

    fn set_entropy(&mut self, entropy: &[u8; ENTROPY_LEN]) -> Result<(), StorageError> {
        self.set(TABLE_WALLET, keys::ENTROPY, entropy)
    }

    /// Read the stored PIN, `None` if no PIN is required
    fn pin(&self) -> Result<Option<Pin>, StorageError> {
        let mut b = [0u8; MAX_RECORD_LEN];

        let r = match self.get(TABLE_WALLET, keys::PIN, &mut b)? {
            Some(p) => Pin::from_bytes(p).map(Some).ok_or(StorageError::InvalidRecord),
            None => Ok(None),
        };

        b.zeroize();
        r
    }

    /// Store or remove the PIN
    fn set_pin(&mut self, pin: Option<&Pin>) -> Result<(), StorageError> {
        match pin {
            Some(p) => self.set(TABLE_WALLET, keys::PIN, p.as_bytes()),
            None => self.delete(TABLE_WALLET, keys::PIN),
        }
    }

    fn has_pin(&self) -> bool {
        matches!(self.pin(), Ok(Some(_)))
    }

    fn pin_fails(&self) -> Result<u32, StorageError> {
        self.read_u32(keys::PIN_FAILS)
    }

    fn set_pin_fails(&mut self, fails: u32) -> Result<(), StorageError> {
        self.write_u32(keys::PIN_FAILS, fails)
    }

    fn flags(&self) -> Result<u32, StorageError> {
        self.read_u32(keys::FLAGS)
    }

    fn set_flags(&mut self, flags: u32) -> Result<(), StorageError> {
        self.write_u32(keys::FLAGS, flags)
    }

    /// Check whether the seed still requires a backup
    fn needs_backup(&self) -> Result<bool, StorageError> {
        self.read_u32(keys::BACKUP).map(|v| v == 0)
    }

    fn set_backed_up(&mut self, backed_up: bool) -> Result<(), StorageError> {
        self.write_u32(keys::BACKUP, backed_up as u32)
    }

    fn uuid(&self) -> Result<Option<Uuid>, StorageError> {
        let mut b = [0u8; MAX_RECORD_LEN];

        match self.get(TABLE_WALLET, keys::UUID, &mut b)? {
            Some(u) => {
                let s = core::str::from_utf8(u).map_err(|_| StorageError::InvalidRecord)?;
                let s = Uuid::try_from(s).map_err(|_| StorageError::InvalidRecord)?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    fn set_uuid(&mut self, uuid: &str) -> Result<(), StorageError> {
        self.set(TABLE_WALLET, keys::UUID, uuid.as_bytes())
    }

    /// Delete all wallet records
    fn wipe(&mut self) -> Result<(), StorageError> {
        for k in keys::ALL {
            self.delete(TABLE_WALLET, *k)?;
        }
        Ok(())
    }

    /// Read a little-endian u32 record, missing records read as zero
    fn read_u32(&self, key: u16) -> Result<u32, StorageError> {
        let mut b = [0u8; MAX_RECORD_LEN];

        match self.get(TABLE_WALLET, key, &mut b)? {
            Some(v) if v.len() == 4 => Ok(LittleEndian::read_u32(v)),
            Some(_) => Err(StorageError::InvalidRecord),
            None => Ok(0),
        }
    }

    fn write_u32(&mut self, key: u16, value: u32) -> Result<(), StorageError> {
        self.set(TABLE_WALLET, key, &value.to_le_bytes())
    }
}

impl<T: Storage + ?Sized> WalletStorage for T {}

/// In-memory [`Storage`] for tests and simulation
#[cfg(feature = "std")]
#[derive(Clone, Debug, Default)]
pub struct MemStorage {
    records: std::collections::BTreeMap<(u16, u16), std::vec::Vec<u8>>,
}

#[cfg(feature = "std")]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(feature = "std")]
impl Storage for MemStorage {
    fn get<'a>(
        &self,
        table: u16,
        key: u16,
        buff: &'a mut [u8],
    ) -> Result<Option<&'a [u8]>, StorageError> {
        let v = match self.records.get(&(table, key)) {
            Some(v) => v,
            None => return Ok(None),
        };

        if v.len() > buff.len() {
            return Err(StorageError::TooLarge);
        }

        buff[..v.len()].copy_from_slice(v);
        Ok(Some(&buff[..v.len()]))
    }

    fn set(&mut self, table: u16, key: u16, value: &[u8]) -> Result<(), StorageError> {
        if value.len() > MAX_RECORD_LEN {
            return Err(StorageError::TooLarge);
        }

        self.records.insert((table, key), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, table: u16, key: u16) -> Result<(), StorageError> {
        if let Some(mut v) = self.records.remove(&(table, key)) {
            v.as_mut_slice().zeroize();
        }
        Ok(())
    }

    fn find_by_content(
        &self,
        table: u16,
        offset: usize,
        needle: &[u8],
    ) -> Result<Option<u16>, StorageError> {
        let k = self
            .records
            .iter()
            .filter(|((t, _), _)| *t == table)
            .find(|(_, v)| v.get(offset..offset + needle.len()) == Some(needle))
            .map(|((_, k), _)| *k);

        Ok(k)
    }
}
