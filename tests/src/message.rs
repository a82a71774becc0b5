// Copyright (c) 2023 The hwcoin Developers

//! Message signing and verification tests

use log::debug;

use hwcoin_proto::{
    codec::{Bytes, Repeated},
    FailureType, MessageSignature, SignMessage, Success, VerifyMessage,
};

use crate::{
    assert_success, call, expect_failure,
    helpers::{message_digest, p2pkh_address, recover_message_key, BITCOIN_MESSAGE_HEADER},
    vectors::MESSAGES,
    wallet::receive_path,
    Exchange, Operator,
};

/// Sign each test message, checking signatures recover to the signing address
/// and verify on the device
pub async fn sign_verify<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    for (i, m) in MESSAGES.iter().enumerate() {
        let path = receive_path(i as u32);

        let r: MessageSignature = call(
            t,
            &SignMessage {
                address_n: Repeated::from_slice(&path)?,
                message: Bytes::from_slice(m)?,
                ..Default::default()
            },
        )
        .await?;
        debug!("signature: {:?}", r);

        let address = r
            .address
            .ok_or_else(|| anyhow::anyhow!("missing address"))?;
        let signature = r
            .signature
            .ok_or_else(|| anyhow::anyhow!("missing signature"))?;

        // Compressed P2PKH header
        assert!((31..=34).contains(&signature[0]), "header: {}", signature[0]);

        let digest = message_digest(BITCOIN_MESSAGE_HEADER, m);
        let pk = recover_message_key(&digest, &signature)?;
        assert_eq!(address.as_str(), p2pkh_address(&pk, 0));

        let v = VerifyMessage {
            address: Some(address.clone()),
            signature: Some(signature.clone()),
            message: Some(Bytes::from_slice(m)?),
            coin_name: None,
        };
        let s: Success = call(t, &v).await?;
        assert_success(&s, "Message verified");

        // Tampered message
        let mut tampered = m.to_vec();
        tampered.push(0x2e);
        let v = VerifyMessage {
            message: Some(Bytes::from_slice(&tampered)?),
            ..v
        };
        let f = expect_failure(t, &v, FailureType::InvalidSignature).await?;
        assert_eq!(f.message.as_deref(), Some("Invalid signature"));
    }

    Ok(())
}

/// Check verification input errors
pub async fn verify_errors<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    let m = MESSAGES[0];

    let r: MessageSignature = call(
        t,
        &SignMessage {
            address_n: Repeated::from_slice(&receive_path(0))?,
            message: Bytes::from_slice(m)?,
            ..Default::default()
        },
    )
    .await?;

    let v = VerifyMessage {
        address: r.address,
        signature: r.signature,
        message: Some(Bytes::from_slice(m)?),
        coin_name: None,
    };

    // Signed by another key
    let other: MessageSignature = call(
        t,
        &SignMessage {
            address_n: Repeated::from_slice(&receive_path(1))?,
            message: Bytes::from_slice(m)?,
            ..Default::default()
        },
    )
    .await?;
    let w = VerifyMessage {
        signature: other.signature,
        ..v.clone()
    };
    expect_failure(t, &w, FailureType::InvalidSignature).await?;

    // Truncated signature
    let w = VerifyMessage {
        signature: Some(Bytes::from_slice(&[0x1f; 64])?),
        ..v.clone()
    };
    expect_failure(t, &w, FailureType::InvalidSignature).await?;

    // Malformed address
    let w = VerifyMessage {
        address: Some("1NotAnAddress".try_into().unwrap()),
        ..v.clone()
    };
    let f = expect_failure(t, &w, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("Invalid address"));

    // Missing fields
    let w = VerifyMessage {
        message: None,
        ..v.clone()
    };
    let f = expect_failure(t, &w, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("No message provided"));

    let w = VerifyMessage { address: None, ..v };
    let f = expect_failure(t, &w, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("No address provided"));

    Ok(())
}

/// Check a rejected signing confirmation returns a cancellation
pub async fn sign_rejected<T, O>(t: &T, o: &O) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let r = SignMessage {
        address_n: Repeated::from_slice(&receive_path(0))?,
        message: Bytes::from_slice(MESSAGES[0])?,
        ..Default::default()
    };

    o.set_approve(false).await;
    let f = expect_failure(t, &r, FailureType::ActionCancelled).await;
    o.set_approve(true).await;
    f?;

    Ok(())
}
