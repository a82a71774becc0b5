// Copyright (c) 2023 The hwcoin Developers

//! Key, address, message, identity and transaction handlers

use core::fmt::Write;

use heapless::String;
use rand_core::CryptoRngCore;

use hwcoin_proto::{
    codec::Bytes, AddressString, ECDHSessionKey, GetAddress, GetECDHSessionKey, GetPublicKey,
    IdentityType, InputScriptType, MessageSignature, PublicKey, SignIdentity, SignMessage,
    SignTx, SignedIdentity, TxAck, VerifyMessage,
};

use super::{check_curve, coin, Engine, Error, Output, SigningSession};
use crate::{
    coins::{CoinInfo, BITCOIN},
    crypto::{
        address::{decode_address, encode_address, p2pkh_address, p2sh_segwit_address},
        hash160,
        identity::{
            identity_path, identity_uri, sign_challenge, IdentityScheme, ECDH_IDENTITY_INDEX,
            SIGN_IDENTITY_INDEX,
        },
        multisig::{multisig_pubkey_index, redeem_script, threshold},
        sign_message, verify_message, HDNode, VerifyError, SIGNATURE_LEN,
    },
    storage::Storage,
    ui::Ui,
};

/// Render message bytes for display
fn display_message(m: &[u8]) -> &str {
    core::str::from_utf8(m).unwrap_or("(binary message)")
}

/// Address for a node under the requested script type
fn node_address(
    node: &HDNode,
    coin: &CoinInfo,
    script_type: InputScriptType,
) -> Result<AddressString, Error> {
    let r = match script_type {
        InputScriptType::SpendP2shWitness => {
            p2sh_segwit_address(&node.public_key, coin.address_type_p2sh)
        }
        InputScriptType::SpendWitness => return Err(Error::Data("Can't encode address")),
        _ => p2pkh_address(&node.public_key, coin.address_type),
    };

    r.map_err(|_| Error::Data("Can't encode address"))
}

impl<S: Storage, U: Ui, RNG: CryptoRngCore> Engine<S, U, RNG> {
    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn get_public_key(&mut self, g: &GetPublicKey) -> Result<Output, Error> {
        self.check_initialized()?;
        self.check_pin(true)?;

        let coin = coin(g.coin_name.as_deref())?;
        check_curve(g.ecdsa_curve_name.as_deref())?;

        // Parent fingerprint is tracked through derivation, zero for the master
        let node = self.derive_node(&g.address_n)?;

        self.ui.show_public_key(&node.public_key);

        let xpub = node
            .serialize_public(coin.xpub_magic)
            .map_err(|_| Error::Process("Failed to serialize public key"))?;

        Ok(Output::PublicKey(PublicKey {
            node: node.to_node_type(),
            xpub: Some(xpub),
        }))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn get_address(&mut self, g: &GetAddress) -> Result<Output, Error> {
        self.check_initialized()?;
        self.check_pin(true)?;

        let coin = coin(g.coin_name.as_deref())?;
        let node = self.derive_node(&g.address_n)?;

        self.ui.show_progress("Computing address", 0);

        let address = match &g.multisig {
            Some(ms) => {
                let script = redeem_script(ms).ok_or(Error::Data("Invalid multisig script"))?;
                if multisig_pubkey_index(ms, &node.public_key).is_none() {
                    return Err(Error::Data("Pubkey not found in multisig script"));
                }

                encode_address(coin.address_type_p2sh, &hash160(&script))
                    .map_err(|_| Error::Data("Can't encode address"))?
            }
            None => node_address(&node, coin, g.script_type())?,
        };

        if g.show_display == Some(true) {
            match &g.multisig {
                Some(ms) => {
                    let mut desc = String::<24>::new();
                    let m = threshold(ms).unwrap_or(0);
                    let _ = write!(desc, "Msig {} of {}:", m, ms.pubkeys.len());

                    self.confirm(&[desc.as_str(), "\n", address.as_str()])?;
                }
                None => self.confirm(&["Address:", "\n", address.as_str()])?,
            }
        }

        Ok(Output::Address(hwcoin_proto::Address { address }))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn sign_message(&mut self, m: &SignMessage) -> Result<Output, Error> {
        self.check_initialized()?;
        self.check_pin(true)?;

        self.confirm(&["[", display_message(&m.message), "]\nSign message?"])?;

        let coin = coin(m.coin_name.as_deref())?;
        let node = self.derive_node(&m.address_n)?;

        self.ui.show_progress("Signing", 0);

        let script_type = m.script_type();
        let signature = sign_message(coin, &node, script_type, &m.message)
            .map_err(|_| Error::Process("Error signing message"))?;

        let address = node_address(&node, coin, script_type)
            .map_err(|_| Error::Process("Error computing address"))?;

        Ok(Output::MessageSignature(MessageSignature {
            address: Some(address),
            signature: Bytes::from_slice(&signature).ok(),
        }))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn verify_message(&mut self, v: &VerifyMessage) -> Result<Output, Error> {
        let address = v
            .address
            .as_deref()
            .ok_or(Error::Data("No address provided"))?;
        let message = v
            .message
            .as_deref()
            .ok_or(Error::Data("No message provided"))?;

        let coin = coin(v.coin_name.as_deref())?;

        let decoded = decode_address(address, coin).map_err(|_| Error::Data("Invalid address"))?;

        let signature: &[u8; SIGNATURE_LEN] = v
            .signature
            .as_deref()
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::InvalidSignature)?;

        self.ui.show_progress("Verifying", 0);

        match verify_message(coin, message, decoded.prefix, &decoded.hash, signature) {
            Ok(()) => (),
            Err(VerifyError::Unsupported) => {
                return Err(Error::Data("Segwit signature verification not supported"))
            }
            Err(_e) => {
                #[cfg(feature = "log")]
                log::warn!("message verification failed: {:?}", _e);

                return Err(Error::InvalidSignature);
            }
        }

        self.confirm(&["Signed by:", "\n", address])?;
        self.confirm(&["Verified message:", "\n", display_message(message)])?;

        Ok(Output::success("Message verified"))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn sign_identity(&mut self, s: &SignIdentity) -> Result<Output, Error> {
        self.check_initialized()?;

        let identity = s.identity.as_ref().ok_or(Error::Data("Invalid identity"))?;
        check_curve(s.ecdsa_curve_name.as_deref())?;

        let uri = identity_uri(identity);
        let visual = s.challenge_visual.as_deref().unwrap_or("");
        self.confirm(&["Sign identity ", uri.as_str(), "?\n", visual])?;

        self.check_pin(true)?;

        let node = self.identity_node(SIGN_IDENTITY_INDEX, identity)?;

        let hidden = s.challenge_hidden.as_deref().unwrap_or(&[]);
        let signature = sign_challenge(&node, IdentityScheme::for_identity(identity), hidden, visual)
            .map_err(|_| Error::Process("Error signing identity"))?;

        let address = p2pkh_address(&node.public_key, BITCOIN.address_type)
            .map_err(|_| Error::Process("Error signing identity"))?;

        Ok(Output::SignedIdentity(SignedIdentity {
            address: Some(address),
            public_key: Bytes::from_slice(&node.public_key).ok(),
            signature: Bytes::from_slice(&signature).ok(),
        }))
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn get_ecdh_session_key(&mut self, g: &GetECDHSessionKey) -> Result<Output, Error> {
        self.check_initialized()?;

        let identity = g.identity.as_ref().ok_or(Error::Data("Invalid identity"))?;
        check_curve(g.ecdsa_curve_name.as_deref())?;

        let uri = identity_uri(identity);
        self.confirm(&["Decrypt identity ", uri.as_str(), "?"])?;

        self.check_pin(true)?;

        let node = self.identity_node(ECDH_IDENTITY_INDEX, identity)?;

        let peer = g.peer_public_key.as_deref().unwrap_or(&[]);
        let session_key = node
            .ecdh(peer)
            .map_err(|_| Error::Process("Error getting ECDH session key"))?;

        Ok(Output::ECDHSessionKey(ECDHSessionKey {
            session_key: Bytes::from_slice(&session_key).ok(),
        }))
    }

    fn identity_node(&mut self, purpose: u32, identity: &IdentityType) -> Result<HDNode, Error> {
        self.derive_node(&identity_path(purpose, identity))
    }

    /// Start a transaction signing session
    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn sign_tx(&mut self, t: &SignTx) -> Result<Output, Error> {
        self.check_initialized()?;

        if t.inputs_count < 1 {
            return Err(Error::Data("Transaction must have at least one input"));
        }
        if t.outputs_count < 1 {
            return Err(Error::Data("Transaction must have at least one output"));
        }

        self.check_pin(true)?;

        let coin = coin(t.coin_name.as_deref())?;
        let root = self.session.root_node(&self.storage)?;

        let (session, req) = SigningSession::init(
            t.inputs_count,
            t.outputs_count,
            coin,
            root,
            t.version(),
            t.lock_time(),
        );
        self.function.signing_init(session);

        Ok(Output::TxRequest(req))
    }

    /// Continue a signing session, errors destroy the session
    #[cfg_attr(feature = "noinline", inline(never))]
    pub(super) fn tx_ack(&mut self, a: &TxAck) -> Result<Output, Error> {
        let tx = a.tx.as_ref().ok_or(Error::Data("No transaction provided"))?;

        let r = match self.function.signing() {
            Some(s) => s.step(&mut self.ui, tx).map(|req| (req, s.is_finished())),
            None => return Err(Error::Unexpected("Not in Signing mode")),
        };

        match r {
            Ok((req, finished)) => {
                if finished {
                    self.function.clear();
                }
                Ok(Output::TxRequest(req))
            }
            Err(e) => {
                self.function.clear();
                Err(e)
            }
        }
    }
}
