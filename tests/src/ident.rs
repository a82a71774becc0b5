// Copyright (c) 2023 The hwcoin Developers

//! Identity signing (SLIP-0013) and ECDH session key (SLIP-0017) tests

use k256::ecdsa::{signature::hazmat::PrehashVerifier, Signature, VerifyingKey};
use log::debug;
use sha2::{Digest, Sha256};

use hwcoin_proto::{
    codec::Bytes, ECDHSessionKey, FailureType, GetECDHSessionKey, IdentityType, SignIdentity,
    SignedIdentity,
};

use crate::{
    call, expect_failure,
    helpers::{
        ecdh_point, ephemeral_key, identity_path, message_digest, p2pkh_address,
        recover_message_key, BITCOIN_MESSAGE_HEADER,
    },
    vectors::{IdentityVector, IDENTITIES},
    wallet::public_key,
    Exchange, Operator,
};

const CHALLENGE_HIDDEN: &[u8] = &[
    0xce, 0xc1, 0xf4, 0x8a, 0x53, 0x7b, 0x4e, 0x0a, 0x31, 0x65, 0x5e, 0x1a, 0x3c, 0x2b, 0x9f, 0x62,
    0x0d, 0x77, 0x81, 0x5e, 0x03, 0x9a, 0x4c, 0x29, 0x88, 0x14, 0xb6, 0xf0, 0x6d, 0x51, 0xee, 0x12,
];

const CHALLENGE_VISUAL: &str = "2015-03-23 17:39:22";

impl IdentityVector {
    pub fn identity(&self) -> IdentityType {
        IdentityType {
            proto: self.proto.map(|v| v.try_into().unwrap()),
            user: self.user.map(|v| v.try_into().unwrap()),
            host: self.host.map(|v| v.try_into().unwrap()),
            port: self.port.map(|v| v.try_into().unwrap()),
            path: self.path.map(|v| v.try_into().unwrap()),
            index: Some(self.index),
        }
    }
}

/// Sign challenges for each identity, checking keys against the derivation
/// path and signatures against the challenge
pub async fn sign_identity<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    for v in IDENTITIES {
        let r: SignedIdentity = call(
            t,
            &SignIdentity {
                identity: Some(v.identity()),
                challenge_hidden: Some(Bytes::from_slice(CHALLENGE_HIDDEN)?),
                challenge_visual: Some(CHALLENGE_VISUAL.try_into().unwrap()),
                ecdsa_curve_name: None,
            },
        )
        .await?;
        debug!("identity {}: {:?}", v.uri, r);

        let pk = r
            .public_key
            .ok_or_else(|| anyhow::anyhow!("missing public key"))?;
        let signature = r
            .signature
            .ok_or_else(|| anyhow::anyhow!("missing signature"))?;

        // Key matches the identity derivation path
        let expected = public_key(t, &identity_path(13, v.index, v.uri)).await?;
        assert_eq!(&pk[..], &expected[..]);
        assert_eq!(r.address.as_deref(), Some(p2pkh_address(&pk, 0).as_str()));

        match v.proto {
            Some("ssh") => {
                assert_eq!(signature[0], 0);

                let digest: [u8; 32] = Sha256::digest(CHALLENGE_HIDDEN).into();
                let k = VerifyingKey::from_sec1_bytes(&pk)?;
                k.verify_prehash(&digest, &Signature::from_slice(&signature[1..])?)?;
            }
            _ => {
                let mut m = Sha256::digest(CHALLENGE_HIDDEN).to_vec();
                m.extend_from_slice(&Sha256::digest(CHALLENGE_VISUAL.as_bytes()));

                let digest = message_digest(BITCOIN_MESSAGE_HEADER, &m);
                assert_eq!(recover_message_key(&digest, &signature)?, &pk[..]);
            }
        }
    }

    Ok(())
}

/// Check identity signing is refused without confirmation or identity
pub async fn sign_identity_errors<T, O>(t: &T, o: &O) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let r = SignIdentity {
        identity: Some(IDENTITIES[0].identity()),
        challenge_hidden: Some(Bytes::from_slice(CHALLENGE_HIDDEN)?),
        challenge_visual: Some(CHALLENGE_VISUAL.try_into().unwrap()),
        ecdsa_curve_name: None,
    };

    o.set_approve(false).await;
    let f = expect_failure(t, &r, FailureType::ActionCancelled).await;
    o.set_approve(true).await;
    f?;

    let f = expect_failure(
        t,
        &SignIdentity {
            identity: None,
            ..r.clone()
        },
        FailureType::DataError,
    )
    .await?;
    assert_eq!(f.message.as_deref(), Some("Invalid identity"));

    let f = expect_failure(
        t,
        &SignIdentity {
            ecdsa_curve_name: Some("ed25519".try_into().unwrap()),
            ..r
        },
        FailureType::DataError,
    )
    .await?;
    assert_eq!(f.message.as_deref(), Some("Unsupported curve"));

    Ok(())
}

/// Check ECDH session keys match a host-side computation with the identity key
pub async fn ecdh_session_key<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    for v in IDENTITIES {
        let (sk, peer) = ephemeral_key();

        let r: ECDHSessionKey = call(
            t,
            &GetECDHSessionKey {
                identity: Some(v.identity()),
                peer_public_key: Some(Bytes::from_slice(&peer)?),
                ecdsa_curve_name: None,
            },
        )
        .await?;

        let session_key = r
            .session_key
            .ok_or_else(|| anyhow::anyhow!("missing session key"))?;
        assert_eq!(session_key.len(), 65);
        assert_eq!(session_key[0], 0x04);

        let device_key = public_key(t, &identity_path(17, v.index, v.uri)).await?;
        assert_eq!(&session_key[..], &ecdh_point(&sk, &device_key)?[..]);
    }

    // Invalid peer key
    let r = GetECDHSessionKey {
        identity: Some(IDENTITIES[0].identity()),
        peer_public_key: Some(Bytes::from_slice(&[0x05; 33])?),
        ecdsa_curve_name: None,
    };
    let f = expect_failure(t, &r, FailureType::ProcessError).await?;
    assert_eq!(f.message.as_deref(), Some("Error getting ECDH session key"));

    Ok(())
}
