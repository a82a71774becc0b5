// Copyright (c) 2023 The hwcoin Developers

//! Transaction signing tests
//!
//! The host answers each [TxRequest] with the requested input or output,
//! collecting the streamed signatures and serialised transaction, then
//! rebuilds the transaction and SIGHASH_ALL digests locally to check them.

use log::{debug, info};

use hwcoin_proto::{
    codec::{Bytes, Repeated},
    Cancel, Failure, FailureType, OutputScriptType, RequestType, SignTx, TransactionType, TxAck,
    TxInputType, TxOutputType, TxRequest,
};

use crate::{
    call, expect_failure,
    helpers::{base58_address, hash160, p2pkh_script, sha256d, varint, verify_der, HARDENED},
    vectors::{TxVector, ACCOUNT_PATH, TRANSACTIONS},
    wallet::{public_key, receive_path},
    Exchange, Operator,
};

/// Host-side transaction description
#[derive(Clone, Debug)]
pub struct Transaction {
    pub inputs: Vec<TxInputType>,
    pub outputs: Vec<TxOutputType>,
    /// Compiled output scripts
    pub scripts: Vec<Vec<u8>>,
    pub lock_time: u32,
}

/// Signing results streamed from the device
#[derive(Clone, Debug, Default)]
pub struct Signed {
    pub signatures: Vec<(u32, Vec<u8>)>,
    pub serialized: Vec<u8>,
}

/// Change path, m/44'/0'/0'/1/0
fn change_path() -> Vec<u32> {
    let mut p = ACCOUNT_PATH.to_vec();
    p.extend_from_slice(&[1, 0]);
    p
}

impl Transaction {
    /// Build a transaction spending consecutive receive addresses
    pub async fn build<T>(t: &T, v: &TxVector) -> anyhow::Result<Self>
    where
        T: Exchange + Sync,
    {
        let mut inputs = vec![];
        for (i, amount) in v.inputs.iter().enumerate() {
            let mut prev_hash = [0u8; 32];
            prev_hash[0] = 0xa0 | i as u8;
            prev_hash[31] = 0x5c;

            inputs.push(TxInputType {
                address_n: Repeated::from_slice(&receive_path(i as u32))?,
                prev_hash: Bytes::from_slice(&prev_hash)?,
                prev_index: i as u32 + 1,
                amount: Some(*amount),
                ..Default::default()
            });
        }

        let mut outputs = vec![];
        let mut scripts = vec![];
        for (i, amount) in v.outputs.iter().enumerate() {
            let hash = [0x42 + i as u8; 20];

            outputs.push(TxOutputType {
                address: Some(base58_address(0, &hash).as_str().try_into().unwrap()),
                amount: *amount,
                script_type: OutputScriptType::PayToAddress,
                ..Default::default()
            });
            scripts.push(p2pkh_script(&hash));
        }

        if let Some(amount) = v.change {
            let path = change_path();
            let pk = public_key(t, &path).await?;

            outputs.push(TxOutputType {
                address_n: Repeated::from_slice(&path)?,
                amount,
                script_type: OutputScriptType::PayToAddress,
                ..Default::default()
            });
            scripts.push(p2pkh_script(&hash160(&pk)));
        }

        Ok(Self {
            inputs,
            outputs,
            scripts,
            lock_time: v.lock_time,
        })
    }

    pub fn sign_tx(&self) -> SignTx {
        SignTx {
            inputs_count: self.inputs.len() as u32,
            outputs_count: self.outputs.len() as u32,
            coin_name: None,
            version: Some(1),
            lock_time: Some(self.lock_time),
        }
    }

    /// Acknowledgement for a device request
    pub fn ack(&self, r: &TxRequest) -> anyhow::Result<TxAck> {
        let index = r
            .details
            .as_ref()
            .and_then(|d| d.request_index)
            .unwrap_or(0) as usize;

        let mut tx = TransactionType::default();
        match r.request_type {
            Some(RequestType::TxInput) => tx.inputs.push(self.inputs[index].clone())?,
            Some(RequestType::TxOutput) => tx.outputs.push(self.outputs[index].clone())?,
            _ => anyhow::bail!("unexpected request: {r:?}"),
        }

        Ok(TxAck { tx: Some(tx) })
    }

    /// SIGHASH_ALL digest for input `i`, signed by `public_key`
    pub fn sighash(&self, i: usize, public_key: &[u8]) -> [u8; 32] {
        let mut b = 1u32.to_le_bytes().to_vec();

        b.extend(varint(self.inputs.len()));
        for (n, input) in self.inputs.iter().enumerate() {
            b.extend(input.prev_hash.iter().rev());
            b.extend(input.prev_index.to_le_bytes());

            match n == i {
                true => {
                    let script = p2pkh_script(&hash160(public_key));
                    b.extend(varint(script.len()));
                    b.extend(script);
                }
                false => b.push(0),
            }
            b.extend(input.sequence().to_le_bytes());
        }

        self.extend_outputs(&mut b);
        b.extend(self.lock_time.to_le_bytes());
        b.extend([0x01, 0x00, 0x00, 0x00]);

        sha256d(&b)
    }

    /// Serialise the signed transaction from input signatures and keys
    pub fn serialize(&self, signatures: &[Vec<u8>], public_keys: &[Vec<u8>]) -> Vec<u8> {
        let mut b = 1u32.to_le_bytes().to_vec();

        b.extend(varint(self.inputs.len()));
        for (n, input) in self.inputs.iter().enumerate() {
            b.extend(input.prev_hash.iter().rev());
            b.extend(input.prev_index.to_le_bytes());

            let (sig, pk) = (&signatures[n], &public_keys[n]);
            b.extend(varint(2 + sig.len() + pk.len()));
            b.push(sig.len() as u8);
            b.extend(sig);
            b.push(pk.len() as u8);
            b.extend(pk);

            b.extend(input.sequence().to_le_bytes());
        }

        self.extend_outputs(&mut b);
        b.extend(self.lock_time.to_le_bytes());
        b
    }

    fn extend_outputs(&self, b: &mut Vec<u8>) {
        b.extend(varint(self.outputs.len()));
        for (o, script) in self.outputs.iter().zip(&self.scripts) {
            b.extend(o.amount.to_le_bytes());
            b.extend(varint(script.len()));
            b.extend(script);
        }
    }
}

/// Run a signing session to completion, answering device requests
pub async fn sign<T>(t: &T, tx: &Transaction) -> anyhow::Result<Signed>
where
    T: Exchange + Sync,
{
    let mut signed = Signed::default();
    let mut r: TxRequest = call(t, &tx.sign_tx()).await?;

    // Each input is streamed once per phase 2 pass
    let limit = (tx.inputs.len() + tx.outputs.len()) * (tx.inputs.len() + 2);

    for _ in 0..=limit {
        debug!("request: {:?}", r);

        if let Some(s) = &r.serialized {
            if let (Some(i), Some(sig)) = (s.signature_index, &s.signature) {
                signed.signatures.push((i, sig.to_vec()));
            }
            if let Some(d) = &s.serialized_tx {
                signed.serialized.extend_from_slice(d);
            }
        }

        if r.request_type == Some(RequestType::TxFinished) {
            return Ok(signed);
        }

        r = call(t, &tx.ack(&r)?).await?;
    }

    anyhow::bail!("signing did not complete")
}

/// Sign each test transaction, checking signatures and serialisation
pub async fn sign_transactions<T>(t: &T) -> anyhow::Result<()>
where
    T: Exchange + Sync,
{
    for v in TRANSACTIONS {
        info!("signing: {:?}", v);

        let tx = Transaction::build(t, v).await?;
        let signed = sign(t, &tx).await?;

        let mut public_keys = vec![];
        for i in 0..tx.inputs.len() {
            public_keys.push(public_key(t, &receive_path(i as u32)).await?);
        }

        // One signature per input, in order, with SIGHASH_ALL appended
        assert_eq!(signed.signatures.len(), tx.inputs.len());
        let mut signatures = vec![];
        for (n, (i, sig)) in signed.signatures.iter().enumerate() {
            assert_eq!(*i as usize, n);
            assert_eq!(sig.last(), Some(&0x01));

            let digest = tx.sighash(n, &public_keys[n]);
            verify_der(&public_keys[n], &digest, &sig[..sig.len() - 1])?;

            signatures.push(sig.clone());
        }

        assert_eq!(
            hex::encode(&signed.serialized),
            hex::encode(tx.serialize(&signatures, &public_keys))
        );
    }

    Ok(())
}

/// Check funding, cancellation and consistency failures
pub async fn sign_errors<T, O>(t: &T, o: &O) -> anyhow::Result<()>
where
    T: Exchange + Sync,
    O: Operator + Sync,
{
    let v = &TRANSACTIONS[0];

    // Outputs exceeding inputs
    let over = TxVector {
        outputs: &[200_000],
        ..v.clone()
    };
    let tx = Transaction::build(t, &over).await?;
    let f = expect_failure_after(t, &tx, 1, FailureType::NotEnoughFunds).await?;
    assert_eq!(f.message.as_deref(), Some("Not enough funds"));

    // Cancelled session
    let tx = Transaction::build(t, v).await?;
    let _: TxRequest = call(t, &tx.sign_tx()).await?;
    expect_failure(t, &Cancel {}, FailureType::ActionCancelled).await?;

    let ack = tx.ack(&TxRequest::new(RequestType::TxInput, 0))?;
    let f = expect_failure(t, &ack, FailureType::UnexpectedMessage).await?;
    assert_eq!(f.message.as_deref(), Some("Not in Signing mode"));

    // Rejected output confirmation ends the session
    o.set_approve(false).await;
    let r = expect_failure_after(t, &tx, 1, FailureType::ActionCancelled).await;
    o.set_approve(true).await;
    r?;
    expect_failure(t, &ack, FailureType::UnexpectedMessage).await?;

    // Input changed between phases
    let _: TxRequest = call(t, &tx.sign_tx()).await?;
    let _: TxRequest = call(t, &tx.ack(&TxRequest::new(RequestType::TxInput, 0))?).await?;
    let _: TxRequest = call(t, &tx.ack(&TxRequest::new(RequestType::TxOutput, 0))?).await?;

    let mut changed = tx.clone();
    changed.inputs[0].amount = Some(1_000_000);
    let _: TxRequest = call(t, &changed.ack(&TxRequest::new(RequestType::TxInput, 0))?).await?;

    let f = expect_failure(
        t,
        &tx.ack(&TxRequest::new(RequestType::TxOutput, 0))?,
        FailureType::ProcessError,
    )
    .await?;
    assert_eq!(
        f.message.as_deref(),
        Some("Transaction has changed during signing")
    );

    // Change paid to a key outside the receive chain
    let mut hardened = tx.clone();
    hardened.outputs[0] = TxOutputType {
        address_n: Repeated::from_slice(&[HARDENED | 44, HARDENED, HARDENED, 1, 7])?,
        amount: hardened.outputs[0].amount,
        script_type: OutputScriptType::PayToAddress,
        ..Default::default()
    };
    let pk = public_key(t, &hardened.outputs[0].address_n).await?;
    hardened.scripts[0] = p2pkh_script(&hash160(&pk));

    let signed = sign(t, &hardened).await?;
    assert_eq!(signed.signatures.len(), 1);

    Ok(())
}

/// Start signing `tx`, acknowledging `inputs` inputs and then the first
/// output, expecting a failure with `code`
async fn expect_failure_after<T>(
    t: &T,
    tx: &Transaction,
    inputs: usize,
    code: FailureType,
) -> anyhow::Result<Failure>
where
    T: Exchange + Sync,
{
    let _: TxRequest = call(t, &tx.sign_tx()).await?;
    for i in 0..inputs {
        let _: TxRequest = call(t, &tx.ack(&TxRequest::new(RequestType::TxInput, i as u32))?).await?;
    }

    expect_failure(t, &tx.ack(&TxRequest::new(RequestType::TxOutput, 0))?, code).await
}
