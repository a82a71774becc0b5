// Copyright (c) 2023 The hwcoin Developers

//! Multisig redeem scripts and fingerprints

use heapless::Vec;
use sha2::{Digest, Sha256};

use hwcoin_proto::{HDNodePathType, MultisigRedeemScriptType, MAX_MULTISIG_KEYS};

use super::{
    address::{op, Script},
    HDNode,
};

/// Derive a public key from a public node along a non-hardened path.
///
/// Returns `None` if the node is malformed or any derivation step fails.
pub fn derive_public_key_from_path(
    public_key: &[u8],
    chain_code: &[u8],
    path: &[u32],
) -> Option<[u8; 33]> {
    if public_key.len() != 33 || chain_code.len() != 32 {
        return None;
    }

    let mut cc = [0u8; 32];
    cc.copy_from_slice(chain_code);

    let mut n = HDNode::from_public(0, 0, 0, cc, public_key).ok()?;
    for i in path {
        n.public_ckd(*i).ok()?;
    }

    Some(n.public_key)
}

/// Resolve the public key for a multisig entry
pub fn node_path_pubkey(p: &HDNodePathType) -> Option<[u8; 33]> {
    derive_public_key_from_path(p.node.public_key.as_deref()?, &p.node.chain_code, &p.address_n)
}

/// Signature threshold, valid only where `1 <= m <= n`
pub fn threshold(ms: &MultisigRedeemScriptType) -> Option<u32> {
    let n = ms.pubkeys.len() as u32;
    match ms.m {
        Some(m) if (1..=n).contains(&m) && n as usize <= MAX_MULTISIG_KEYS => Some(m),
        _ => None,
    }
}

/// Resolve all multisig public keys in position order
pub fn multisig_pubkeys(ms: &MultisigRedeemScriptType) -> Option<Vec<[u8; 33], MAX_MULTISIG_KEYS>> {
    let mut keys = Vec::new();
    for p in ms.pubkeys.iter() {
        keys.push(node_path_pubkey(p)?).ok()?;
    }
    Some(keys)
}

/// Find the position of `public_key` in a multisig description
pub fn multisig_pubkey_index(ms: &MultisigRedeemScriptType, public_key: &[u8; 33]) -> Option<usize> {
    ms.pubkeys
        .iter()
        .position(|p| node_path_pubkey(p).as_ref() == Some(public_key))
}

/// Build the `m`-of-`n` redeem script for a multisig description
pub fn redeem_script(ms: &MultisigRedeemScriptType) -> Option<Script> {
    let m = threshold(ms)?;
    let keys = multisig_pubkeys(ms)?;

    let mut s = Script::new();
    s.push(op::num(m as u8)).ok()?;
    for k in keys.iter() {
        s.push(33).ok()?;
        s.extend_from_slice(k).ok()?;
    }
    s.push(op::num(keys.len() as u8)).ok()?;
    s.push(op::CHECKMULTISIG).ok()?;

    Some(s)
}

/// Compute the order-independent fingerprint of a multisig description.
///
/// Entries are sorted by public key before hashing
/// `m || (depth || fingerprint || child_num || chain_code || public_key)* || n`,
/// integers little-endian.
pub fn sorted_multisig_fingerprint(ms: &MultisigRedeemScriptType) -> Option<[u8; 32]> {
    let n = ms.pubkeys.len();
    if n == 0 || n > MAX_MULTISIG_KEYS {
        return None;
    }
    let m = threshold(ms)?;

    let mut nodes: Vec<&HDNodePathType, MAX_MULTISIG_KEYS> = Vec::new();
    for p in ms.pubkeys.iter() {
        let pk = p.node.public_key.as_ref()?;
        if pk.len() != 33 || p.node.chain_code.len() != 32 {
            return None;
        }
        nodes.push(p).ok()?;
    }

    // Stable (insertion) sort by raw public key bytes
    for i in 1..nodes.len() {
        let mut j = i;
        while j > 0 && nodes[j - 1].node.public_key.as_deref() > nodes[j].node.public_key.as_deref() {
            nodes.swap(j - 1, j);
            j -= 1;
        }
    }

    let mut h = Sha256::new();
    h.update(m.to_le_bytes());
    for p in nodes.iter() {
        h.update(p.node.depth.to_le_bytes());
        h.update(p.node.fingerprint.to_le_bytes());
        h.update(p.node.child_num.to_le_bytes());
        h.update(&p.node.chain_code[..]);
        h.update(p.node.public_key.as_deref().unwrap_or_default());
    }
    h.update((n as u32).to_le_bytes());

    let mut f = [0u8; 32];
    f.copy_from_slice(&h.finalize());
    Some(f)
}
