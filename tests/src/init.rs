// Copyright (c) 2023 The hwcoin Developers

//! Device lifecycle tests: initialisation, PIN handling, wipe and protocol errors

use log::info;

use hwcoin_proto::{
    codec::Bytes, ApplyFlags, BackupDevice, Cancel, ChangePin, ClearSession, Entropy, EntropyAck,
    EntropyRequest, Failure, FailureType, Features, GetEntropy, GetFeatures, GetPublicKey,
    Initialize, MessageType, Ping, PublicKey, ResetDevice, SignTx, Success, TxAck, WipeDevice,
};

use crate::{
    assert_success, call, expect_failure, vectors::HOST_ENTROPY, Exchange, Operator, Response,
    MAX_REQUEST_LEN,
};

/// Check an uninitialised device reports features and rejects key requests
pub async fn uninitialised<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    let f: Features = call(t, &Initialize {}).await?;
    info!("features: {:?}", f);

    assert_eq!(f.vendor.as_deref(), Some("hwcoin"));
    assert_eq!(
        (f.major_version, f.minor_version, f.patch_version),
        (Some(1), Some(5), Some(2))
    );
    assert_eq!(f.initialized, Some(false));
    assert_eq!(f.pin_protection, Some(false));
    assert_eq!(f.needs_backup, Some(false));
    assert!(!f.coins.is_empty());

    // Device id is generated once and retained
    let id = f.device_id.clone();
    assert_eq!(id.as_ref().map(|v| v.len()), Some(24));

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.device_id, id);

    let r = expect_failure(t, &GetPublicKey::default(), FailureType::NotInitialized).await?;
    assert_eq!(r.message.as_deref(), Some("Device not initialized"));

    expect_failure(t, &BackupDevice {}, FailureType::NotInitialized).await?;

    let s = SignTx {
        inputs_count: 1,
        outputs_count: 1,
        ..Default::default()
    };
    expect_failure(t, &s, FailureType::NotInitialized).await?;

    // Entropy is available regardless
    let e: Entropy = call(t, &GetEntropy { size: 48 }).await?;
    assert_eq!(e.entropy.len(), 48);

    Ok(())
}

/// Initialise a device with host entropy and an optional PIN
pub async fn reset<T, O>(t: &T, o: &O, pin: Option<&str>) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    if let Some(p) = pin {
        o.push_pin(Some(p)).await;
    }

    let r = ResetDevice {
        pin_protection: Some(pin.is_some()),
        ..Default::default()
    };
    let _: EntropyRequest = call(t, &r).await?;

    let a = EntropyAck {
        entropy: Some(Bytes::from_slice(&HOST_ENTROPY)?),
    };
    let s: Success = call(t, &a).await?;
    assert_success(&s, "Device successfully initialized");

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.initialized, Some(true));
    assert_eq!(f.pin_protection, Some(pin.is_some()));
    assert_eq!(f.needs_backup, Some(true));

    // A second reset is refused
    let f = expect_failure(t, &r, FailureType::UnexpectedMessage).await?;
    assert_eq!(
        f.message.as_deref(),
        Some("Device is already initialized. Use Wipe first.")
    );

    Ok(())
}

/// Check reset flow errors: unexpected entropy and cancelled PIN entry
pub async fn reset_errors<T, O>(t: &T, o: &O) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let f = expect_failure(t, &EntropyAck::default(), FailureType::UnexpectedMessage).await?;
    assert_eq!(f.message.as_deref(), Some("Not in Reset mode"));

    o.push_pin(None).await;
    let r = ResetDevice {
        pin_protection: Some(true),
        ..Default::default()
    };
    expect_failure(t, &r, FailureType::ActionCancelled).await?;

    // Initialize aborts a pending reset
    let _: EntropyRequest = call(t, &ResetDevice::default()).await?;
    let _: Features = call(t, &Initialize {}).await?;
    expect_failure(t, &EntropyAck::default(), FailureType::UnexpectedMessage).await?;

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.initialized, Some(false));

    Ok(())
}

/// Check PIN caching, failures and changes on an initialised device
/// protected by `pin`
pub async fn pin<T, O>(t: &T, o: &O, pin: &str) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let s: Success = call(t, &ClearSession {}).await?;
    assert_success(&s, "Session cleared");

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.pin_cached, Some(false));

    // Wrong PIN
    o.push_pin(Some("9999")).await;
    let f = expect_failure(t, &GetPublicKey::default(), FailureType::PinInvalid).await?;
    assert_eq!(f.message.as_deref(), Some("PIN invalid"));

    // Cancelled entry
    o.push_pin(None).await;
    expect_failure(t, &GetPublicKey::default(), FailureType::PinCancelled).await?;

    // Correct PIN is cached
    o.push_pin(Some(pin)).await;
    let _: PublicKey = call(t, &GetPublicKey::default()).await?;
    let _: PublicKey = call(t, &GetPublicKey::default()).await?;

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.pin_cached, Some(true));

    // Protected ping requires the PIN
    let p = Ping {
        message: Some("pong".try_into().unwrap()),
        pin_protection: Some(true),
        ..Default::default()
    };
    let s: Success = call(t, &p).await?;
    assert_success(&s, "pong");

    // Changing the PIN always re-enters the current PIN
    o.push_pin(Some(pin)).await;
    o.push_pin(Some("5678")).await;
    let s: Success = call(t, &ChangePin::default()).await?;
    assert_success(&s, "PIN changed");

    o.push_pin(Some("5678")).await;
    o.push_pin(Some(pin)).await;
    let s: Success = call(t, &ChangePin::default()).await?;
    assert_success(&s, "PIN changed");

    Ok(())
}

/// Check backup marking, flags and wipe on an initialised device,
/// backup always re-enters the PIN where one is set
pub async fn backup_and_wipe<T, O>(t: &T, o: &O, pin: Option<&str>) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    if let Some(p) = pin {
        o.push_pin(Some(p)).await;
    }
    o.set_approve(false).await;
    expect_failure(t, &BackupDevice {}, FailureType::ActionCancelled).await?;
    o.set_approve(true).await;

    if let Some(p) = pin {
        o.push_pin(Some(p)).await;
    }
    let s: Success = call(t, &BackupDevice {}).await?;
    assert_success(&s, "Seed successfully backed up");

    if let Some(p) = pin {
        o.push_pin(Some(p)).await;
    }
    let f = expect_failure(t, &BackupDevice {}, FailureType::UnexpectedMessage).await?;
    assert_eq!(f.message.as_deref(), Some("Seed already backed up"));

    let s: Success = call(t, &ApplyFlags { flags: Some(0x05) }).await?;
    assert_success(&s, "Flags applied");
    let _: Success = call(t, &ApplyFlags { flags: Some(0x10) }).await?;

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.flags, Some(0x15));
    assert_eq!(f.needs_backup, Some(false));

    // Rejected wipe leaves the device initialised
    o.set_approve(false).await;
    expect_failure(t, &WipeDevice {}, FailureType::ActionCancelled).await?;
    o.set_approve(true).await;

    let s: Success = call(t, &WipeDevice {}).await?;
    assert_success(&s, "Device wiped");

    let f: Features = call(t, &GetFeatures {}).await?;
    assert_eq!(f.initialized, Some(false));
    assert_eq!(f.pin_protection, Some(false));
    assert_eq!(f.flags, Some(0));

    Ok(())
}

/// Check protocol level failures
pub async fn protocol_errors<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    // Unknown message type
    let (msg_type, payload) = t.exchange(0x7fff, &[]).await?;
    let f = raw_failure(msg_type, &payload)?;
    assert_eq!(f.code, Some(FailureType::UnexpectedMessage));
    assert_eq!(f.message.as_deref(), Some("Unknown message"));

    // Missing required field
    let (msg_type, payload) = t
        .exchange(MessageType::GetEntropy.into(), &[])
        .await?;
    let f = raw_failure(msg_type, &payload)?;
    assert_eq!(f.code, Some(FailureType::DataError));
    assert_eq!(f.message.as_deref(), Some("missing required field"));

    // Oversized message is rejected before decode
    let big = vec![0x0a; MAX_REQUEST_LEN / 2 + 100];
    let (msg_type, payload) = t
        .exchange(MessageType::SignMessage.into(), &big)
        .await?;
    let f = raw_failure(msg_type, &payload)?;
    assert_eq!(f.code, Some(FailureType::DataError));
    assert_eq!(f.message.as_deref(), Some("Message too big"));

    // Acknowledgements outside a signing session
    let f = expect_failure(t, &TxAck { tx: None }, FailureType::DataError).await?;
    assert_eq!(f.message.as_deref(), Some("No transaction provided"));

    let f = expect_failure(t, &Cancel {}, FailureType::ActionCancelled).await?;
    assert_eq!(f.message.as_deref(), Some("Action cancelled by user"));

    Ok(())
}

/// Parse a raw response expecting a [Failure]
fn raw_failure(msg_type: u16, payload: &[u8]) -> anyhow::Result<Failure> {
    Response::parse(msg_type, payload)?
        .try_into()
        .map_err(|r| anyhow::anyhow!("unexpected response: {r:?}"))
}
