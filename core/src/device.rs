// Copyright (c) 2023 The hwcoin Developers

//! Device main loop, binding an [`Engine`] to a [`Channel`]

use rand_core::CryptoRngCore;

use crate::{
    channel::{Channel, ChannelError, Transport},
    consts::Config,
    engine::{Engine, Error, Output},
    storage::Storage,
    ui::{Clock, Ui},
};

/// Result of a single [`Device::poll`] iteration
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Poll {
    /// No message pending
    Idle,
    /// A message was received and a response sent
    Handled,
    /// A partial message timed out and was dropped
    Timeout,
    /// No traffic within the poweroff timeout
    PowerOff,
}

/// Device context, owns the engine and the message channel
pub struct Device<S: Storage, U: Ui, T: Transport, C: Clock, RNG: CryptoRngCore> {
    engine: Engine<S, U, RNG>,
    channel: Channel<T, C>,
    poweroff_timeout_ms: u64,
    last_activity: u64,
}

impl<S, U, T, C, RNG> Device<S, U, T, C, RNG>
where
    S: Storage,
    U: Ui,
    T: Transport,
    C: Clock,
    RNG: CryptoRngCore,
{
    pub fn new(engine: Engine<S, U, RNG>, channel: Channel<T, C>, config: &Config) -> Self {
        let last_activity = channel.clock().now_ms();

        Self {
            engine,
            channel,
            poweroff_timeout_ms: config.poweroff_timeout_ms,
            last_activity,
        }
    }

    pub fn engine(&mut self) -> &mut Engine<S, U, RNG> {
        &mut self.engine
    }

    pub fn channel(&mut self) -> &mut Channel<T, C> {
        &mut self.channel
    }

    /// Run one iteration of the device loop: receive a message, pass it
    /// to the engine and send the response.
    ///
    /// Transport failures are returned to the caller.
    pub fn poll(&mut self) -> Result<Poll, ChannelError> {
        let output = match self.channel.receive() {
            Ok(Some((msg_type, payload))) => {
                #[cfg(feature = "log")]
                log::debug!("rx message {} ({} bytes)", msg_type, payload.len());

                self.engine.handle_frame(msg_type, payload)
            }
            Ok(None) => {
                let idle = self
                    .channel
                    .clock()
                    .now_ms()
                    .saturating_sub(self.last_activity);

                return match idle >= self.poweroff_timeout_ms {
                    true => Ok(Poll::PowerOff),
                    false => Ok(Poll::Idle),
                };
            }
            Err(ChannelError::TooLarge { msg_type: _t, len: _len }) => {
                #[cfg(feature = "log")]
                log::warn!("rejecting message {} ({} bytes)", _t, _len);

                // Remaining chunks are dropped by the reassembler as non-header chunks
                Output::from(Error::Data("Message too big"))
            }
            Err(ChannelError::Timeout) => {
                self.touch();
                return Ok(Poll::Timeout);
            }
            Err(e) => return Err(e),
        };

        self.channel.send(&output)?;
        self.touch();

        Ok(Poll::Handled)
    }

    fn touch(&mut self) {
        self.last_activity = self.channel.clock().now_ms();
    }
}
