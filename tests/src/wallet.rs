// Copyright (c) 2023 The hwcoin Developers

//! Public key and address derivation tests

use log::{debug, info};

use hwcoin_proto::{
    codec::Repeated, Address, FailureType, GetAddress, GetPublicKey, HDNodePathType, HDNodeType,
    InputScriptType, MultisigRedeemScriptType, PublicKey,
};

use crate::{
    call, expect_failure,
    helpers::{base58_address, hash160, p2pkh_address, p2sh_segwit_address, HARDENED},
    vectors::{ACCOUNT_PATH, ADDRESS_INDICES},
    Exchange, Operator,
};

/// Receive address path for `index`
pub fn receive_path(index: u32) -> Vec<u32> {
    let mut p = ACCOUNT_PATH.to_vec();
    p.extend_from_slice(&[0, index]);
    p
}

/// Fetch the public node at `path`
pub async fn public_node<T>(t: &T, path: &[u32]) -> anyhow::Result<HDNodeType>
where
    T: Exchange + Sync,
{
    let r: PublicKey = call(
        t,
        &GetPublicKey {
            address_n: Repeated::from_slice(path)?,
            ..Default::default()
        },
    )
    .await?;

    Ok(r.node)
}

/// Fetch the compressed public key at `path`
pub async fn public_key<T>(t: &T, path: &[u32]) -> anyhow::Result<Vec<u8>>
where
    T: Exchange + Sync,
{
    let n = public_node(t, path).await?;
    let pk = n
        .public_key
        .ok_or_else(|| anyhow::anyhow!("missing public key"))?;
    Ok(pk.to_vec())
}

/// Check public key derivation and extended key encoding
pub async fn public_keys<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    let master: PublicKey = call(t, &GetPublicKey::default()).await?;
    assert_eq!(master.node.depth, 0);
    assert_eq!(master.node.fingerprint, 0);
    assert!(master.node.private_key.is_none());

    let account: PublicKey = call(
        t,
        &GetPublicKey {
            address_n: Repeated::from_slice(ACCOUNT_PATH)?,
            ..Default::default()
        },
    )
    .await?;
    info!("account xpub: {:?}", account.xpub);

    assert_eq!(account.node.depth, ACCOUNT_PATH.len() as u32);
    assert_eq!(account.node.child_num, HARDENED);
    assert!(account.node.private_key.is_none());

    let xpub = account.xpub.as_deref().unwrap_or_default();
    assert!(xpub.starts_with("xpub"), "unexpected xpub: {xpub}");

    // Extended keys decode to 78 bytes with the node key at the tail
    let raw = bs58::decode(xpub).with_check(None).into_vec()?;
    assert_eq!(raw.len(), 78);
    assert_eq!(&raw[..4], &[0x04, 0x88, 0xb2, 0x1e]);
    assert_eq!(raw[4], ACCOUNT_PATH.len() as u8);
    assert_eq!(&raw[13..45], &account.node.chain_code[..]);
    assert_eq!(
        Some(&raw[45..]),
        account.node.public_key.as_deref()
    );

    // Testnet uses its own magic
    let testnet: PublicKey = call(
        t,
        &GetPublicKey {
            address_n: Repeated::from_slice(ACCOUNT_PATH)?,
            coin_name: Some("Testnet".try_into().unwrap()),
            ..Default::default()
        },
    )
    .await?;
    assert!(testnet.xpub.as_deref().unwrap_or_default().starts_with("tpub"));
    assert_eq!(testnet.node, account.node);

    // Derivation is deterministic
    let again = public_node(t, ACCOUNT_PATH).await?;
    assert_eq!(again, account.node);

    let r = GetPublicKey {
        ecdsa_curve_name: Some("nist256p1".try_into().unwrap()),
        ..Default::default()
    };
    let f = expect_failure(t, &r, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Unsupported curve"));

    let r = GetPublicKey {
        coin_name: Some("Dogecoin".try_into().unwrap()),
        ..Default::default()
    };
    let f = expect_failure(t, &r, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Invalid coin name"));

    Ok(())
}

/// Check addresses match locally computed encodings of the device keys
pub async fn addresses<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    for i in ADDRESS_INDICES {
        let path = receive_path(*i);
        let pk = public_key(t, &path).await?;

        let r: Address = call(
            t,
            &GetAddress {
                address_n: Repeated::from_slice(&path)?,
                ..Default::default()
            },
        )
        .await?;
        debug!("address {}: {}", i, r.address);
        assert_eq!(r.address.as_str(), p2pkh_address(&pk, 0));
        assert!(r.address.starts_with('1'));

        let r: Address = call(
            t,
            &GetAddress {
                address_n: Repeated::from_slice(&path)?,
                script_type: Some(InputScriptType::SpendP2shWitness),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(r.address.as_str(), p2sh_segwit_address(&pk, 5));
        assert!(r.address.starts_with('3'));

        let r: Address = call(
            t,
            &GetAddress {
                address_n: Repeated::from_slice(&path)?,
                coin_name: Some("Testnet".try_into().unwrap()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(r.address.as_str(), p2pkh_address(&pk, 111));
    }

    let r = GetAddress {
        address_n: Repeated::from_slice(&receive_path(0))?,
        script_type: Some(InputScriptType::SpendWitness),
        ..Default::default()
    };
    let f = expect_failure(t, &r, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Can't encode address"));

    Ok(())
}

/// Check confirmation of displayed addresses
pub async fn show_address<T, O>(t: &T, o: &O) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let r = GetAddress {
        address_n: Repeated::from_slice(&receive_path(0))?,
        show_display: Some(true),
        ..Default::default()
    };

    let _: Address = call(t, &r).await?;

    o.set_approve(false).await;
    let f = expect_failure(t, &r, FailureType::ActionCancelled).await;
    o.set_approve(true).await;
    f?;

    Ok(())
}

/// Check 2-of-2 multisig addresses built from the account node
pub async fn multisig_address<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    let account = public_node(t, ACCOUNT_PATH).await?;

    let entry = |i: u32| -> anyhow::Result<HDNodePathType> {
        Ok(HDNodePathType {
            node: account.clone(),
            address_n: Repeated::from_slice(&[0, i])?,
        })
    };

    let ms = MultisigRedeemScriptType {
        pubkeys: Repeated::from_slice(&[entry(0)?, entry(1)?])?,
        m: Some(2),
        ..Default::default()
    };

    // Expected redeem script from hardened-path derived keys
    let mut script = vec![0x52];
    for i in 0..2 {
        script.push(33);
        script.extend_from_slice(&public_key(t, &receive_path(i)).await?);
    }
    script.extend_from_slice(&[0x52, 0xae]);

    let r: Address = call(
        t,
        &GetAddress {
            address_n: Repeated::from_slice(&receive_path(0))?,
            multisig: Some(ms.clone()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(r.address.as_str(), base58_address(5, &hash160(&script)));

    // Signing key must be a member
    let r = GetAddress {
        address_n: Repeated::from_slice(&receive_path(2))?,
        multisig: Some(ms.clone()),
        ..Default::default()
    };
    let f = expect_failure(t, &r, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Pubkey not found in multisig script"));

    // Threshold above key count is invalid
    let r = GetAddress {
        address_n: Repeated::from_slice(&receive_path(0))?,
        multisig: Some(MultisigRedeemScriptType { m: Some(3), ..ms }),
        ..Default::default()
    };
    let f = expect_failure(t, &r, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Invalid multisig script"));

    Ok(())
}
