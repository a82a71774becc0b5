// Copyright (c) 2023 The hwcoin Developers

//! SLIP-0013 identity signing and SLIP-0017 ECDH key derivation

use core::fmt::Write;

use byteorder::{ByteOrder, LittleEndian};
use heapless::String;
use sha2::{Digest, Sha256};

use hwcoin_proto::{IdentityType, InputScriptType};

use super::{sign_message, CryptoError, HDNode, HARDENED, SIGNATURE_LEN};
use crate::coins::BITCOIN;

/// SLIP-0013 purpose index (identity signing)
pub const SIGN_IDENTITY_INDEX: u32 = 13;

/// SLIP-0017 purpose index (ECDH)
pub const ECDH_IDENTITY_INDEX: u32 = 17;

/// Maximum identity URI length
pub const MAX_URI_LEN: usize = 404;

/// Identity fingerprint, SHA256 over the index and URI components
pub fn identity_fingerprint(id: &IdentityType) -> [u8; 32] {
    let mut h = Sha256::new();

    h.update(id.index.unwrap_or(0).to_le_bytes());

    if let Some(proto) = non_empty(&id.proto) {
        h.update(proto);
        h.update("://");
    }
    if let Some(user) = non_empty(&id.user) {
        h.update(user);
        h.update("@");
    }
    if let Some(host) = non_empty(&id.host) {
        h.update(host);
    }
    if let Some(port) = non_empty(&id.port) {
        h.update(":");
        h.update(port);
    }
    if let Some(path) = non_empty(&id.path) {
        h.update(path);
    }

    let mut f = [0u8; 32];
    f.copy_from_slice(&h.finalize());
    f
}

/// Derivation path for an identity under the provided purpose index
pub fn identity_path(purpose: u32, id: &IdentityType) -> [u32; 5] {
    let hash = identity_fingerprint(id);

    let mut p = [0u32; 5];
    p[0] = HARDENED | purpose;
    for i in 0..4 {
        p[i + 1] = HARDENED | LittleEndian::read_u32(&hash[i * 4..]);
    }

    p
}

/// Human readable identity URI, for display
pub fn identity_uri(id: &IdentityType) -> String<MAX_URI_LEN> {
    let mut s = String::new();

    // Components are bounded so the URI always fits
    let _ = (|| -> core::fmt::Result {
        if let Some(proto) = non_empty(&id.proto) {
            write!(s, "{proto}://")?;
        }
        if let Some(user) = non_empty(&id.user) {
            write!(s, "{user}@")?;
        }
        if let Some(host) = non_empty(&id.host) {
            s.write_str(host)?;
        }
        if let Some(port) = non_empty(&id.port) {
            write!(s, ":{port}")?;
        }
        if let Some(path) = non_empty(&id.path) {
            s.write_str(path)?;
        }
        Ok(())
    })();

    s
}

/// Identity signing scheme, selected by protocol
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum IdentityScheme {
    /// SSH, signs SHA256(challenge_hidden)
    Ssh,
    /// GPG, signs a 32-byte digest directly
    Gpg,
    /// Message signature over both challenges
    Message,
}

impl IdentityScheme {
    pub fn for_identity(id: &IdentityType) -> Self {
        match id.proto.as_deref() {
            Some("ssh") => Self::Ssh,
            Some("gpg") => Self::Gpg,
            _ => Self::Message,
        }
    }
}

/// Sign an identity challenge
pub fn sign_challenge(
    node: &HDNode,
    scheme: IdentityScheme,
    challenge_hidden: &[u8],
    challenge_visual: &str,
) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    match scheme {
        IdentityScheme::Ssh => {
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&Sha256::digest(challenge_hidden));
            sign_raw(node, &digest)
        }
        IdentityScheme::Gpg => {
            let digest: &[u8; 32] = challenge_hidden
                .try_into()
                .map_err(|_| CryptoError::SigningFailed)?;
            sign_raw(node, digest)
        }
        IdentityScheme::Message => {
            let mut m = [0u8; 64];
            m[..32].copy_from_slice(&Sha256::digest(challenge_hidden));
            m[32..].copy_from_slice(&Sha256::digest(challenge_visual.as_bytes()));

            sign_message(&BITCOIN, node, InputScriptType::SpendAddress, &m)
        }
    }
}

/// Zero header byte followed by `r || s`
fn sign_raw(node: &HDNode, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
    let (sig, _) = node.sign_digest(digest)?;

    let mut b = [0u8; SIGNATURE_LEN];
    b[1..].copy_from_slice(&sig.to_bytes());
    Ok(b)
}

fn non_empty<const N: usize>(s: &Option<String<N>>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}
