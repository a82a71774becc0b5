// Copyright (c) 2023 The hwcoin Developers

use hwcoin_proto::{
    frame::{write_frame, WriteError},
    Address, ECDHSessionKey, Entropy, EntropyRequest, Failure, Features, MessageId,
    MessageSignature, MessageType, PublicKey, SignedIdentity, Success, TxRequest,
};

use super::Error;

macro_rules! outputs {
    ($($name:ident),* $(,)?) => {
        /// [`Engine`][super::Engine] outputs (in response to events), written as outbound frames
        #[derive(Clone, PartialEq, Debug)]
        #[allow(clippy::large_enum_variant)]
        pub enum Output {
            None,
            $(
                $name($name),
            )*
        }

        $(
            impl From<$name> for Output {
                fn from(m: $name) -> Self {
                    Output::$name(m)
                }
            }
        )*

        impl Output {
            /// Wire message type for this output
            pub fn message_type(&self) -> Option<MessageType> {
                match self {
                    Output::None => None,
                    $(
                        Output::$name(_) => Some(<$name as MessageId>::MESSAGE_TYPE),
                    )*
                }
            }

            /// Write an [`Output`] as a framed message, passing each packet to `flush`.
            ///
            /// Returns the payload length, zero for [`Output::None`].
            #[cfg_attr(feature = "noinline", inline(never))]
            pub fn write<F, E>(
                &self,
                chunk_size: usize,
                report_id: bool,
                flush: F,
            ) -> Result<usize, WriteError<E>>
            where
                F: FnMut(&[u8]) -> Result<(), E>,
            {
                match self {
                    Output::None => Ok(0),
                    $(
                        Output::$name(m) => write_frame(
                            <$name as MessageId>::MESSAGE_TYPE.into(),
                            m,
                            chunk_size,
                            report_id,
                            flush,
                        ),
                    )*
                }
            }
        }
    };
}

outputs!(
    Success,
    Failure,
    Features,
    Entropy,
    PublicKey,
    Address,
    EntropyRequest,
    MessageSignature,
    SignedIdentity,
    ECDHSessionKey,
    TxRequest,
);

impl Output {
    /// Create a [`Success`] output with the provided message
    pub fn success(message: &str) -> Self {
        Output::Success(Success::new(message))
    }

    /// Check whether this output is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Output::Failure(_))
    }
}

impl From<Error> for Output {
    fn from(e: Error) -> Self {
        Output::Failure(Failure::new(e.failure_type(), e.as_str()))
    }
}
