// Copyright (c) 2023 The hwcoin Developers

//! Legacy (P2PKH) transaction signing session
//!
//! Signing runs in three phases, each driven by [`TxRequest`]s for the
//! next input or output and answered with a [`TransactionType`] carrying
//! exactly that item:
//!
//! 1. All inputs and outputs are streamed once. Inputs are totalled and
//!    hashed into a check digest, outputs are compiled, confirmed by the
//!    user and hashed. Fees are checked once the last output is seen.
//! 2. For each input `i` the whole transaction is streamed again to build
//!    the SIGHASH_ALL preimage (with the script code on input `i` only).
//!    The check digest must match phase 1, then input `i` is signed and
//!    returned with its serialised form.
//! 3. Outputs are streamed a final time and returned serialised, the last
//!    response carries the lock time and [`RequestType::TxFinished`].

use sha2::{Digest, Sha256};

use hwcoin_proto::{
    codec::{self, Bytes, EncodeError, Sink},
    AddressPath, InputScriptType, OutputScriptType, RequestType, TransactionType, TxInputType, TxOutputType,
    TxRequest, TxRequestSerializedType, MAX_DER_SIGNATURE_LEN,
};

use super::Error;
use crate::{
    coins::CoinInfo,
    crypto::{
        address::{address_script, decode_address, op_return_script, p2pkh_script, Script},
        hash160, hash_length, ser_length, HDNode,
    },
    helpers::fmt_amount,
    ui::Ui,
};

/// SIGHASH_ALL, little-endian u32 as appended to the preimage
const SIGHASH_ALL: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Serialised transaction fragment capacity
const SERIALIZED_LEN: usize = 2048;

type Serialized = Bytes<SERIALIZED_LEN>;

/// Signing stage
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Stage {
    /// Phase 1, inputs
    Inputs,
    /// Phase 1, outputs
    Outputs,
    /// Phase 2, inputs for the signing input
    SignInputs,
    /// Phase 2, outputs for the signing input
    SignOutputs,
    /// Phase 3, output serialisation
    SerializeOutputs,
    /// Transaction signed and serialised
    Finished,
}

/// Transaction signing session state
pub struct SigningSession {
    coin: &'static CoinInfo,
    root: HDNode,

    inputs_count: u32,
    outputs_count: u32,
    version: u32,
    lock_time: u32,

    stage: Stage,
    /// Index of the current item within the stage
    index: u32,
    /// Input being signed in phase 2
    signing: u32,

    /// Phase 1 digest over all inputs and outputs
    check: Sha256,
    check_digest: [u8; 32],
    /// Phase 1 digest over all outputs
    outputs_check: Sha256,
    outputs_digest: [u8; 32],
    /// Phase 2 (and 3) recheck digest
    recheck: Sha256,
    /// SIGHASH_ALL preimage for the signing input
    sighash: Sha256,

    /// Sum of input amounts
    to_spend: u64,
    /// Sum of output amounts
    spending: u64,
    /// Sum of change output amounts
    change_spend: u64,

    /// Input currently being signed, captured in phase 2
    signing_input: Option<SigningInput>,
}

/// Fields of the signing input retained for serialisation
#[derive(Clone, Debug)]
struct SigningInput {
    address_n: AddressPath,
    prev_hash: [u8; 32],
    prev_index: u32,
    sequence: u32,
}

/// [`Sink`] adaptor feeding encoded messages into a digest
struct HashSink<'a, D: Digest>(&'a mut D);

impl<'a, D: Digest> Sink for HashSink<'a, D> {
    fn write(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.0.update(data);
        Ok(())
    }
}

/// Hash the wire encoding of a message
fn hash_message<M: codec::Message, D: Digest>(h: &mut D, m: &M) -> Result<(), Error> {
    codec::encode(m, &mut HashSink(h)).map_err(|_| Error::Process("Failed to hash transaction"))
}

fn append<const N: usize>(b: &mut Bytes<N>, data: &[u8]) -> Result<(), Error> {
    b.0.extend_from_slice(data)
        .map_err(|_| Error::Process("Failed to serialize transaction"))
}

fn append_length<const N: usize>(b: &mut Bytes<N>, len: usize) -> Result<(), Error> {
    let mut l = [0u8; 5];
    let n = ser_length(len as u32, &mut l);
    append(b, &l[..n])
}

fn confirm(ui: &mut impl Ui, parts: &[&str]) -> Result<(), Error> {
    match ui.confirm(parts) {
        true => Ok(()),
        false => Err(Error::ActionCancelled),
    }
}

fn expect_input(tx: &TransactionType) -> Result<&TxInputType, Error> {
    tx.inputs.first().ok_or(Error::Data("Expected input"))
}

fn expect_output(tx: &TransactionType) -> Result<&TxOutputType, Error> {
    tx.outputs.first().ok_or(Error::Data("Expected output"))
}

/// Previous transaction hash in serialisation (little-endian) order
fn reversed_hash(input: &TxInputType) -> Result<[u8; 32], Error> {
    if input.prev_hash.len() != 32 {
        return Err(Error::Data("Invalid prev_hash"));
    }

    let mut h = [0u8; 32];
    h.copy_from_slice(&input.prev_hash);
    h.reverse();
    Ok(h)
}

/// Estimated legacy transaction size in kilobytes (rounded up)
pub fn estimate_size_kb(inputs: u32, outputs: u32) -> u64 {
    let size = 10 + 149 * inputs as u64 + 35 * outputs as u64;
    (size + 999) / 1000
}

impl SigningSession {
    /// Start a signing session, returning the session and first request
    pub fn init(
        inputs_count: u32,
        outputs_count: u32,
        coin: &'static CoinInfo,
        root: HDNode,
        version: u32,
        lock_time: u32,
    ) -> (Self, TxRequest) {
        #[cfg(feature = "log")]
        log::debug!(
            "sign tx: {} inputs, {} outputs ({})",
            inputs_count,
            outputs_count,
            coin.name
        );

        let s = Self {
            coin,
            root,
            inputs_count,
            outputs_count,
            version,
            lock_time,
            stage: Stage::Inputs,
            index: 0,
            signing: 0,
            check: Sha256::new(),
            check_digest: [0u8; 32],
            outputs_check: Sha256::new(),
            outputs_digest: [0u8; 32],
            recheck: Sha256::new(),
            sighash: Sha256::new(),
            to_spend: 0,
            spending: 0,
            change_spend: 0,
            signing_input: None,
        };

        (s, TxRequest::new(RequestType::TxInput, 0))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// Consume a host acknowledgement, returning the next request
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn step(&mut self, ui: &mut impl Ui, tx: &TransactionType) -> Result<TxRequest, Error> {
        match self.stage {
            Stage::Inputs => self.phase1_input(expect_input(tx)?),
            Stage::Outputs => self.phase1_output(ui, expect_output(tx)?),
            Stage::SignInputs => self.phase2_input(expect_input(tx)?),
            Stage::SignOutputs => self.phase2_output(ui, expect_output(tx)?),
            Stage::SerializeOutputs => self.phase3_output(expect_output(tx)?),
            Stage::Finished => Err(Error::Unexpected("Not in Signing mode")),
        }
    }

    fn phase1_input(&mut self, input: &TxInputType) -> Result<TxRequest, Error> {
        if input.script_type() != InputScriptType::SpendAddress {
            return Err(Error::Data("Unsupported input script type"));
        }
        reversed_hash(input)?;
        let amount = input.amount.ok_or(Error::Data("Input amount required"))?;

        hash_message(&mut self.check, input)?;

        self.to_spend = self
            .to_spend
            .checked_add(amount)
            .ok_or(Error::Data("Value overflow"))?;

        self.index += 1;
        if self.index < self.inputs_count {
            return Ok(TxRequest::new(RequestType::TxInput, self.index));
        }

        self.stage = Stage::Outputs;
        self.index = 0;
        Ok(TxRequest::new(RequestType::TxOutput, 0))
    }

    fn phase1_output(&mut self, ui: &mut impl Ui, output: &TxOutputType) -> Result<TxRequest, Error> {
        let _script = self.compile_output(output, Some(&mut *ui))?;

        hash_message(&mut self.check, output)?;
        hash_message(&mut self.outputs_check, output)?;

        self.spending = self
            .spending
            .checked_add(output.amount)
            .ok_or(Error::Data("Value overflow"))?;
        if !output.address_n.is_empty() {
            self.change_spend += output.amount;
        }

        self.index += 1;
        if self.index < self.outputs_count {
            return Ok(TxRequest::new(RequestType::TxOutput, self.index));
        }

        self.check_digest = self.check.finalize_reset().into();
        self.outputs_digest = self.outputs_check.finalize_reset().into();

        self.confirm_totals(ui)?;

        self.start_signing_input(0);
        Ok(TxRequest::new(RequestType::TxInput, 0))
    }

    /// Check funds and fee, then request final confirmation
    fn confirm_totals(&mut self, ui: &mut impl Ui) -> Result<(), Error> {
        if self.to_spend < self.spending {
            return Err(Error::NotEnoughFunds);
        }

        let fee = self.to_spend - self.spending;
        let max_fee = self
            .coin
            .maxfee_kb
            .saturating_mul(estimate_size_kb(self.inputs_count, self.outputs_count));

        let mut fee_buff = [0u8; 24];
        let fee_str = fmt_amount(fee, self.coin, &mut fee_buff);

        if fee > max_fee {
            confirm(
                ui,
                &["Fee ", fee_str, " ", self.coin.shortcut, " is unexpectedly high. Send anyway?"],
            )?;
        }

        let mut out_buff = [0u8; 24];
        let out_str = fmt_amount(self.to_spend - self.change_spend, self.coin, &mut out_buff);

        confirm(
            ui,
            &[
                "Really send ",
                out_str,
                " ",
                self.coin.shortcut,
                " from your wallet? Fee included: ",
                fee_str,
            ],
        )
    }

    fn start_signing_input(&mut self, i: u32) {
        self.stage = Stage::SignInputs;
        self.signing = i;
        self.index = 0;
        self.recheck = Sha256::new();
        self.sighash = Sha256::new();
        self.signing_input = None;
    }

    fn phase2_input(&mut self, input: &TxInputType) -> Result<TxRequest, Error> {
        hash_message(&mut self.recheck, input)?;

        if self.index == 0 {
            self.sighash.update(self.version.to_le_bytes());
            hash_length(&mut self.sighash, self.inputs_count);
        }

        self.hash_outpoint(input)?;

        if self.index == self.signing {
            let node = self.derive_node(&input.address_n)?;
            let script_code = p2pkh_script(&hash160(&node.public_key));

            hash_length(&mut self.sighash, script_code.len() as u32);
            self.sighash.update(script_code);

            self.signing_input = Some(SigningInput {
                address_n: input.address_n.clone(),
                prev_hash: reversed_hash(input)?,
                prev_index: input.prev_index,
                sequence: input.sequence(),
            });
        } else {
            hash_length(&mut self.sighash, 0);
        }

        self.sighash.update(input.sequence().to_le_bytes());

        self.index += 1;
        if self.index < self.inputs_count {
            return Ok(TxRequest::new(RequestType::TxInput, self.index));
        }

        self.stage = Stage::SignOutputs;
        self.index = 0;
        Ok(TxRequest::new(RequestType::TxOutput, 0))
    }

    fn phase2_output(&mut self, ui: &mut impl Ui, output: &TxOutputType) -> Result<TxRequest, Error> {
        hash_message(&mut self.recheck, output)?;

        let script = self.compile_output(output, None)?;

        if self.index == 0 {
            hash_length(&mut self.sighash, self.outputs_count);
        }
        self.sighash.update(output.amount.to_le_bytes());
        hash_length(&mut self.sighash, script.len() as u32);
        self.sighash.update(&script);

        self.index += 1;
        if self.index < self.outputs_count {
            return Ok(TxRequest::new(RequestType::TxOutput, self.index));
        }

        let recheck: [u8; 32] = self.recheck.finalize_reset().into();
        if recheck != self.check_digest {
            return Err(Error::Process("Transaction has changed during signing"));
        }

        ui.show_progress(
            "Signing transaction",
            (self.signing + 1) * 1000 / self.inputs_count,
        );

        let serialized = self.sign_input()?;

        if self.signing + 1 < self.inputs_count {
            let next = self.signing + 1;
            let mut r = TxRequest::new(RequestType::TxInput, 0);
            r.serialized = Some(serialized);
            self.start_signing_input(next);
            return Ok(r);
        }

        self.stage = Stage::SerializeOutputs;
        self.index = 0;
        self.recheck = Sha256::new();

        let mut r = TxRequest::new(RequestType::TxOutput, 0);
        r.serialized = Some(serialized);
        Ok(r)
    }

    /// Sign the current input, returning its signature and serialised form
    fn sign_input(&mut self) -> Result<TxRequestSerializedType, Error> {
        let input = self
            .signing_input
            .take()
            .ok_or(Error::Process("Failed to compile input"))?;
        let node = self.derive_node(&input.address_n)?;

        // Finalise preimage and double hash
        self.sighash.update(self.lock_time.to_le_bytes());
        self.sighash.update(SIGHASH_ALL);
        let first = self.sighash.finalize_reset();
        let digest: [u8; 32] = Sha256::digest(first).into();

        let (sig, _) = node
            .sign_digest(&digest)
            .map_err(|_| Error::Process("Signing failed"))?;
        let der = sig.to_der();

        let mut signature = Bytes::<MAX_DER_SIGNATURE_LEN>::new();
        append(&mut signature, der.as_bytes())?;
        append(&mut signature, &[SIGHASH_ALL[0]])?;

        let mut s = Serialized::new();
        if self.signing == 0 {
            append(&mut s, &self.version.to_le_bytes())?;
            append_length(&mut s, self.inputs_count as usize)?;
        }

        append(&mut s, &input.prev_hash)?;
        append(&mut s, &input.prev_index.to_le_bytes())?;

        // scriptSig: <sig || sighash> <pubkey>
        let script_len = 1 + signature.len() + 1 + node.public_key.len();
        append_length(&mut s, script_len)?;
        append(&mut s, &[signature.len() as u8])?;
        append(&mut s, &signature)?;
        append(&mut s, &[node.public_key.len() as u8])?;
        append(&mut s, &node.public_key)?;

        append(&mut s, &input.sequence.to_le_bytes())?;

        #[cfg(feature = "log")]
        log::debug!("signed input {}", self.signing);

        Ok(TxRequestSerializedType {
            signature_index: Some(self.signing),
            signature: Some(signature),
            serialized_tx: Some(s),
        })
    }

    fn phase3_output(&mut self, output: &TxOutputType) -> Result<TxRequest, Error> {
        hash_message(&mut self.recheck, output)?;

        let script = self.compile_output(output, None)?;

        let mut s = Serialized::new();
        if self.index == 0 {
            append_length(&mut s, self.outputs_count as usize)?;
        }
        append(&mut s, &output.amount.to_le_bytes())?;
        append_length(&mut s, script.len())?;
        append(&mut s, &script)?;

        self.index += 1;

        let mut r = match self.index < self.outputs_count {
            true => TxRequest::new(RequestType::TxOutput, self.index),
            false => {
                let recheck: [u8; 32] = self.recheck.finalize_reset().into();
                if recheck != self.outputs_digest {
                    return Err(Error::Process("Transaction has changed during signing"));
                }

                append(&mut s, &self.lock_time.to_le_bytes())?;
                self.stage = Stage::Finished;

                TxRequest::finished()
            }
        };

        r.serialized = Some(TxRequestSerializedType {
            signature_index: None,
            signature: None,
            serialized_tx: Some(s),
        });

        Ok(r)
    }

    /// Hash the previous outpoint (reversed hash and index)
    fn hash_outpoint(&mut self, input: &TxInputType) -> Result<(), Error> {
        self.sighash.update(reversed_hash(input)?);
        self.sighash.update(input.prev_index.to_le_bytes());
        Ok(())
    }

    fn derive_node(&self, path: &[u32]) -> Result<HDNode, Error> {
        self.root
            .derive_path(path)
            .map_err(|_| Error::Process("Failed to derive private key"))
    }

    /// Compile an output to its script, confirming external outputs where
    /// a [`Ui`] is provided
    fn compile_output(
        &self,
        output: &TxOutputType,
        ui: Option<&mut dyn UiConfirm>,
    ) -> Result<Script, Error> {
        if output.script_type == OutputScriptType::PayToOpReturn {
            if output.amount != 0 {
                return Err(Error::Data("OP_RETURN output with non-zero amount"));
            }

            let data = output.op_return_data.as_deref().unwrap_or(&[]);
            return op_return_script(data).map_err(|_| Error::Data("Invalid OP_RETURN data"));
        }

        if !matches!(
            output.script_type,
            OutputScriptType::PayToAddress | OutputScriptType::PayToScriptHash
        ) {
            return Err(Error::Data("Unsupported output script type"));
        }

        // Change outputs pay back to a derived key and are not confirmed
        if !output.address_n.is_empty() {
            let node = self.derive_node(&output.address_n)?;

            let mut s = Script::new();
            s.extend_from_slice(&p2pkh_script(&hash160(&node.public_key)))
                .map_err(|_| Error::Process("Failed to compile output"))?;
            return Ok(s);
        }

        let address = output
            .address
            .as_deref()
            .ok_or(Error::Data("Missing output address"))?;
        let decoded = decode_address(address, self.coin).map_err(|_| Error::Data("Invalid address"))?;

        if let Some(ui) = ui {
            let mut amount_buff = [0u8; 24];
            let amount = fmt_amount(output.amount, self.coin, &mut amount_buff);

            if !ui.confirm_parts(&[
                "Confirm sending ",
                amount,
                " ",
                self.coin.shortcut,
                " to ",
                address,
            ]) {
                return Err(Error::ActionCancelled);
            }
        }

        Ok(address_script(&decoded))
    }
}

/// Object-safe confirmation view over a [`Ui`]
trait UiConfirm {
    fn confirm_parts(&mut self, parts: &[&str]) -> bool;
}

impl<U: Ui> UiConfirm for U {
    fn confirm_parts(&mut self, parts: &[&str]) -> bool {
        self.confirm(parts)
    }
}
