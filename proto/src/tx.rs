// Copyright (c) 2023 The hwcoin Developers

//! Transaction signing messages
//!
//! Signing is driven by the device: [`SignTx`] opens a session and is
//! answered with a [`TxRequest`] naming the next input or output required,
//! each [`TxAck`] supplies that item and is answered with the following
//! request. Signatures and serialised transaction fragments are streamed
//! back in [`TxRequest::serialized`] until a [`RequestType::TxFinished`]
//! request closes the session.

use crate::codec::Bytes;
use crate::types::{
    CoinName, RequestType, TransactionType, TxRequestDetailsType, TxRequestSerializedType,
    MAX_DER_SIGNATURE_LEN,
};

message! {
    /// Start a transaction signing session
    pub struct SignTx {
        1 Required Varint outputs_count: u32,
        2 Required Varint inputs_count: u32,
        3 Optional String coin_name: Option<CoinName>,
        4 Optional Varint version: Option<u32>,
        5 Optional Varint lock_time: Option<u32>,
    }
}

impl SignTx {
    pub fn version(&self) -> u32 {
        self.version.unwrap_or(1)
    }

    pub fn lock_time(&self) -> u32 {
        self.lock_time.unwrap_or(0)
    }
}

message! {
    /// Device request for transaction data
    pub struct TxRequest {
        1 Optional Varint request_type: Option<RequestType>,
        2 Optional Message details: Option<TxRequestDetailsType>,
        3 Optional Message serialized: Option<TxRequestSerializedType>,
    }
}

impl TxRequest {
    /// Create a request for the item at `index`
    pub fn new(request_type: RequestType, index: u32) -> Self {
        Self {
            request_type: Some(request_type),
            details: Some(TxRequestDetailsType {
                request_index: Some(index),
                tx_hash: None,
            }),
            serialized: None,
        }
    }

    /// Create a terminal request
    pub fn finished() -> Self {
        Self {
            request_type: Some(RequestType::TxFinished),
            details: None,
            serialized: None,
        }
    }

    /// Index of the requested item, if any
    pub fn request_index(&self) -> Option<u32> {
        self.details.as_ref().and_then(|d| d.request_index)
    }

    /// Signature carried by this request, if any
    pub fn signature(&self) -> Option<(u32, &Bytes<MAX_DER_SIGNATURE_LEN>)> {
        let s = self.serialized.as_ref()?;
        match (s.signature_index, s.signature.as_ref()) {
            (Some(i), Some(sig)) => Some((i, sig)),
            _ => None,
        }
    }

    /// Serialised transaction fragment carried by this request, if any
    pub fn serialized_tx(&self) -> Option<&[u8]> {
        self.serialized
            .as_ref()
            .and_then(|s| s.serialized_tx.as_deref())
    }
}

message! {
    /// Host acknowledgement supplying the requested transaction data
    pub struct TxAck {
        1 Optional Message tx: Option<TransactionType>,
    }
}
