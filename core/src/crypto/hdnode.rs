// Copyright (c) 2023 The hwcoin Developers

//! BIP-0032 hierarchical deterministic keys over secp256k1

use byteorder::{BigEndian, ByteOrder};
use heapless::String;
use hmac::{Hmac, Mac};
use k256::{
    ecdsa::{RecoveryId, Signature, SigningKey},
    elliptic_curve::{sec1::ToEncodedPoint, PrimeField},
    FieldBytes, ProjectivePoint, PublicKey, Scalar, SecretKey,
};
use sha2::Sha512;
use zeroize::Zeroize;

use hwcoin_proto::{codec::Bytes, HDNodeType};

use super::{hash160, CryptoError};

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Serialised extended key length
const XKEY_LEN: usize = 78;

type HmacSha512 = Hmac<Sha512>;

/// HD node, owned by the caller.
///
/// Private key material is wiped on drop.
#[derive(Clone)]
pub struct HDNode {
    pub depth: u32,
    pub child_num: u32,
    /// Fingerprint of the parent node (zero for master nodes)
    pub parent_fingerprint: u32,
    pub chain_code: [u8; 32],
    pub public_key: [u8; 33],
    private_key: Option<[u8; 32]>,
}

impl HDNode {
    /// Create a master node from a seed (BIP-0032 "Bitcoin seed")
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let mut i = hmac_sha512(b"Bitcoin seed", &[seed])?;

        let mut private_key = [0u8; 32];
        private_key.copy_from_slice(&i[..32]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);
        i.zeroize();

        let r = Self::from_private(0, 0, 0, chain_code, &private_key);
        private_key.zeroize();
        r
    }

    /// Create a node from a private key
    pub fn from_private(
        depth: u32,
        child_num: u32,
        parent_fingerprint: u32,
        chain_code: [u8; 32],
        private_key: &[u8; 32],
    ) -> Result<Self, CryptoError> {
        let sk = SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidKey)?;

        Ok(Self {
            depth,
            child_num,
            parent_fingerprint,
            chain_code,
            public_key: compressed(&sk.public_key()),
            private_key: Some(*private_key),
        })
    }

    /// Create a public-only node from a compressed public key
    pub fn from_public(
        depth: u32,
        child_num: u32,
        parent_fingerprint: u32,
        chain_code: [u8; 32],
        public_key: &[u8],
    ) -> Result<Self, CryptoError> {
        let pk = PublicKey::from_sec1_bytes(public_key).map_err(|_| CryptoError::InvalidKey)?;

        Ok(Self {
            depth,
            child_num,
            parent_fingerprint,
            chain_code,
            public_key: compressed(&pk),
            private_key: None,
        })
    }

    /// Create a public-only node from its wire representation
    pub fn from_node_type(n: &HDNodeType) -> Result<Self, CryptoError> {
        let public_key = n.public_key.as_ref().ok_or(CryptoError::InvalidKey)?;
        if public_key.len() != 33 || n.chain_code.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&n.chain_code);

        Self::from_public(n.depth, n.child_num, n.fingerprint, chain_code, public_key)
    }

    pub fn private_key(&self) -> Option<&[u8; 32]> {
        self.private_key.as_ref()
    }

    /// Node fingerprint, the first four bytes of HASH160(public key)
    pub fn fingerprint(&self) -> u32 {
        BigEndian::read_u32(&hash160(&self.public_key))
    }

    /// Derive a child node in place, hardened indices require a private key
    pub fn derive(&mut self, index: u32) -> Result<(), CryptoError> {
        match self.private_key.is_some() {
            true => self.private_ckd(index),
            false => self.public_ckd(index),
        }
    }

    /// Derive a descendant node along `path`, leaving `self` unchanged
    pub fn derive_path(&self, path: &[u32]) -> Result<HDNode, CryptoError> {
        let mut n = self.clone();
        for i in path {
            n.derive(*i)?;
        }
        Ok(n)
    }

    /// Private child key derivation
    pub fn private_ckd(&mut self, index: u32) -> Result<(), CryptoError> {
        let mut parent = self.private_key.ok_or(CryptoError::PrivateKeyRequired)?;
        let fingerprint = self.fingerprint();

        let mut data = [0u8; 37];
        match index & HARDENED != 0 {
            true => data[1..33].copy_from_slice(&parent),
            false => data[..33].copy_from_slice(&self.public_key),
        }
        data[33..].copy_from_slice(&index.to_be_bytes());

        let mut i = hmac_sha512(&self.chain_code, &[&data])?;
        data.zeroize();

        let r = child_scalar(&i[..32]).and_then(|il| {
            let k = scalar(&parent).ok_or(CryptoError::InvalidKey)?;
            let child = il + k;
            SecretKey::from_bytes(&child.to_bytes()).map_err(|_| CryptoError::DerivationFailed)
        });
        parent.zeroize();

        let sk = match r {
            Ok(sk) => sk,
            Err(e) => {
                i.zeroize();
                return Err(e);
            }
        };

        let mut child = [0u8; 32];
        child.copy_from_slice(&sk.to_bytes());

        self.public_key = compressed(&sk.public_key());
        self.private_key = Some(child);
        self.chain_code.copy_from_slice(&i[32..]);
        self.depth += 1;
        self.child_num = index;
        self.parent_fingerprint = fingerprint;

        child.zeroize();
        i.zeroize();

        Ok(())
    }

    /// Public (non-hardened) child key derivation, discarding any private key
    pub fn public_ckd(&mut self, index: u32) -> Result<(), CryptoError> {
        if index & HARDENED != 0 {
            return Err(CryptoError::PrivateKeyRequired);
        }

        let parent =
            PublicKey::from_sec1_bytes(&self.public_key).map_err(|_| CryptoError::InvalidKey)?;
        let fingerprint = self.fingerprint();

        let mut data = [0u8; 37];
        data[..33].copy_from_slice(&self.public_key);
        data[33..].copy_from_slice(&index.to_be_bytes());

        let i = hmac_sha512(&self.chain_code, &[&data])?;
        let il = child_scalar(&i[..32])?;

        let p = ProjectivePoint::GENERATOR * il + parent.to_projective();
        let child =
            PublicKey::from_affine(p.to_affine()).map_err(|_| CryptoError::DerivationFailed)?;

        if let Some(k) = self.private_key.as_mut() {
            k.zeroize();
        }
        self.private_key = None;
        self.public_key = compressed(&child);
        self.chain_code.copy_from_slice(&i[32..]);
        self.depth += 1;
        self.child_num = index;
        self.parent_fingerprint = fingerprint;

        Ok(())
    }

    /// Uncompressed (65 byte) public key
    pub fn uncompressed_public_key(&self) -> Result<[u8; 65], CryptoError> {
        let pk =
            PublicKey::from_sec1_bytes(&self.public_key).map_err(|_| CryptoError::InvalidKey)?;

        let mut b = [0u8; 65];
        b.copy_from_slice(pk.to_encoded_point(false).as_bytes());
        Ok(b)
    }

    fn signing_key(&self) -> Result<SigningKey, CryptoError> {
        let k = self.private_key.as_ref().ok_or(CryptoError::PrivateKeyRequired)?;
        SigningKey::from_slice(k).map_err(|_| CryptoError::InvalidKey)
    }

    /// Sign a 32-byte digest, returning a low-S signature and recovery id
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<(Signature, RecoveryId), CryptoError> {
        let (mut sig, mut recid) = self
            .signing_key()?
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::SigningFailed)?;

        // Negating s flips the parity of the recovered point
        if let Some(normalized) = sig.normalize_s() {
            sig = normalized;
            recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
        }

        Ok((sig, recid))
    }

    /// ECDH with a SEC1 encoded peer key, returning the uncompressed shared point
    pub fn ecdh(&self, peer_public_key: &[u8]) -> Result<[u8; 65], CryptoError> {
        let k = self.private_key.as_ref().ok_or(CryptoError::PrivateKeyRequired)?;
        let sk = SecretKey::from_slice(k).map_err(|_| CryptoError::InvalidKey)?;
        let peer =
            PublicKey::from_sec1_bytes(peer_public_key).map_err(|_| CryptoError::InvalidKey)?;

        let p = peer.to_projective() * *sk.to_nonzero_scalar();
        let shared = PublicKey::from_affine(p.to_affine()).map_err(|_| CryptoError::InvalidKey)?;

        let mut b = [0u8; 65];
        b.copy_from_slice(shared.to_encoded_point(false).as_bytes());
        Ok(b)
    }

    /// Public wire representation
    pub fn to_node_type(&self) -> HDNodeType {
        HDNodeType {
            depth: self.depth,
            fingerprint: self.parent_fingerprint,
            child_num: self.child_num,
            chain_code: Bytes::from_slice(&self.chain_code).unwrap_or_default(),
            private_key: None,
            public_key: Bytes::from_slice(&self.public_key).ok(),
        }
    }

    /// Base58check extended public key with the provided version magic
    pub fn serialize_public(&self, version: u32) -> Result<String<112>, CryptoError> {
        let mut b = [0u8; XKEY_LEN];

        BigEndian::write_u32(&mut b[0..], version);
        b[4] = self.depth as u8;
        BigEndian::write_u32(&mut b[5..], self.parent_fingerprint);
        BigEndian::write_u32(&mut b[9..], self.child_num);
        b[13..45].copy_from_slice(&self.chain_code);
        b[45..].copy_from_slice(&self.public_key);

        super::address::base58check_encode(&b)
    }
}

impl Drop for HDNode {
    fn drop(&mut self) {
        if let Some(k) = self.private_key.as_mut() {
            k.zeroize();
        }
    }
}

impl core::fmt::Debug for HDNode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HDNode")
            .field("depth", &self.depth)
            .field("child_num", &self.child_num)
            .field("parent_fingerprint", &self.parent_fingerprint)
            .field("public_key", &Bytes::<33>::from_slice(&self.public_key).ok())
            .finish_non_exhaustive()
    }
}

fn compressed(pk: &PublicKey) -> [u8; 33] {
    let mut b = [0u8; 33];
    b.copy_from_slice(pk.to_encoded_point(true).as_bytes());
    b
}

fn scalar(b: &[u8]) -> Option<Scalar> {
    Option::from(Scalar::from_repr(*FieldBytes::from_slice(b)))
}

/// Parse an intermediate child scalar, values outside the curve order
/// are invalid per BIP-0032
fn child_scalar(b: &[u8]) -> Result<Scalar, CryptoError> {
    scalar(b).ok_or(CryptoError::DerivationFailed)
}

pub(crate) fn hmac_sha512(key: &[u8], data: &[&[u8]]) -> Result<[u8; 64], CryptoError> {
    let mut m = <HmacSha512 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
    for d in data {
        m.update(d);
    }

    let mut b = [0u8; 64];
    b.copy_from_slice(&m.finalize().into_bytes());
    Ok(b)
}
