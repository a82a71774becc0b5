// Copyright (c) 2023 The hwcoin Developers

use hwcoin_proto::{
    codec::decode, ApplyFlags, ApplySettings, BackupDevice, Cancel, ChangePin, ClearSession,
    EntropyAck, GetAddress, GetECDHSessionKey, GetEntropy, GetFeatures, GetPublicKey, Initialize,
    Message, MessageType, Ping, ResetDevice, SignIdentity, SignMessage, SignTx, TxAck,
    VerifyMessage, WipeDevice,
};

use super::Error;

/// Helper for decoding request payloads to events
fn decode_event<M>(buff: &[u8]) -> Result<Event, Error>
where
    M: Message,
    Event: From<M>,
{
    decode::<M>(buff).map(Event::from).map_err(Error::from)
}

macro_rules! events {
    ($($name:ident),* $(,)?) => {
        /// [`Engine`][super::Engine] input events, decoded from inbound frames
        #[derive(Clone, PartialEq, Debug)]
        #[allow(clippy::large_enum_variant)]
        pub enum Event {
            None,
            $(
                $name($name),
            )*
        }

        $(
            impl From<$name> for Event {
                fn from(m: $name) -> Self {
                    Event::$name(m)
                }
            }
        )*

        impl Event {
            /// Parse an inbound frame (message type and payload) to an engine event
            #[cfg_attr(feature = "noinline", inline(never))]
            pub fn parse(msg_type: u16, buff: &[u8]) -> Result<Self, Error> {
                let t = MessageType::try_from(msg_type).map_err(|_| Error::UnknownMessage)?;

                match t {
                    $(
                        MessageType::$name => decode_event::<$name>(buff),
                    )*
                    _ => Err(Error::UnknownMessage),
                }
            }

            /// Wire message type for this event
            pub fn message_type(&self) -> Option<MessageType> {
                match self {
                    Event::None => None,
                    $(
                        Event::$name(_) => Some(MessageType::$name),
                    )*
                }
            }
        }
    };
}

events!(
    Initialize,
    GetFeatures,
    Ping,
    ChangePin,
    WipeDevice,
    GetEntropy,
    GetPublicKey,
    ResetDevice,
    EntropyAck,
    BackupDevice,
    SignTx,
    TxAck,
    Cancel,
    ClearSession,
    ApplySettings,
    ApplyFlags,
    GetAddress,
    SignMessage,
    VerifyMessage,
    SignIdentity,
    GetECDHSessionKey,
);
