//! SETUP transaction decoder
//!
//! The [`SetupDecoder`] watches token and data packets for a SETUP transaction:
//! a SETUP token, followed by an 8-byte DATA0 packet [USB2, 8.5.3]. When it
//! sees one, it
//!
//! 1. decodes the data into a [`SetupPacket`], and
//! 2. requests an ACK once the interpacket delay allows it.
//!
//! The decoder doesn't time the interpacket delay itself. Instead, it starts an
//! external [`InterpacketTimer`] when a data packet arrives, and waits for its
//! `tx_allowed` output. Use [`StandaloneSetupDecoder`] if you'd rather not wire
//! that up yourself.
//!
//! # Malformed transactions
//!
//! Malformed transactions are dropped without a handshake, and the decoder goes
//! back to waiting for the next SETUP token. This happens when
//!
//! - another token arrives before the data packet, or
//! - the data packet doesn't carry exactly 8 bytes.

use crate::{
    interface::{DataPacket, TokenDetectorInterface},
    setup::{SetupPacket, SETUP_PACKET_LEN},
    timer::InterpacketTimer,
    Speed,
};

/// The PID of a SETUP token.
pub const SETUP_PID: u8 = 0b1101;

/// Decoder states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    /// Waiting for a SETUP token.
    #[default]
    Idle,
    /// Saw a SETUP token. Waiting for the data packet.
    ReadData,
    /// Received a SETUP packet. Waiting for the interpacket delay before we ACK.
    InterpacketDelay,
}

/// Decoder inputs for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderInputs {
    /// Token detector snapshot.
    pub tokenizer: TokenDetectorInterface,
    /// Data packet deserializer output.
    pub data: DataPacket,
    /// Interpacket timer output.
    pub tx_allowed: bool,
}

/// Decoder outputs for a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderOutputs {
    /// The most recent SETUP packet. Registered.
    ///
    /// `setup.received` pulses on the tick after the data packet was accepted.
    pub setup: SetupPacket,
    /// Request an ACK handshake.
    pub ack: bool,
    /// Start the interpacket timer. Follows every new data packet.
    pub timer_start: bool,
}

/// Detects and decodes SETUP transactions.
///
/// Call [`step()`](SetupDecoder::step) once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupDecoder {
    speed: Speed,
    state: State,
    packet: SetupPacket,
}

impl SetupDecoder {
    /// Create a decoder for a device operating at `speed`.
    pub const fn new(speed: Speed) -> Self {
        SetupDecoder {
            speed,
            state: State::Idle,
            packet: SetupPacket {
                received: false,
                recipient: 0,
                kind: 0,
                is_in_request: false,
                request: 0,
                value: 0,
                index: 0,
                length: 0,
            },
        }
    }

    /// Returns the device's operating speed.
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Set the device's operating speed.
    ///
    /// Call this after speed negotiation. It takes effect on the next `step()`.
    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the registered SETUP packet.
    pub fn packet(&self) -> &SetupPacket {
        &self.packet
    }

    /// Advance the decoder by one tick.
    pub fn step(&mut self, inputs: &DecoderInputs) -> DecoderOutputs {
        let DecoderInputs {
            tokenizer,
            data,
            tx_allowed,
        } = *inputs;

        let mut ack = false;
        let mut packet = SetupPacket {
            received: false,
            ..self.packet
        };

        let state = match self.state {
            State::Idle if tokenizer.new_token && tokenizer.pid == SETUP_PID => {
                debug!("SETUP token");
                State::ReadData
            }
            State::Idle => State::Idle,

            // A data packet takes precedence over a token that shows up in the
            // same tick.
            State::ReadData if data.new_packet => {
                if data.length == SETUP_PACKET_LEN {
                    packet = SetupPacket {
                        received: true,
                        ..SetupPacket::parse(&data.payload)
                    };
                    // A high speed device waits 8 bit times before responding [USB2, 7.1.18.2].
                    // One tick is 8 HS bit times, and it's already passed.
                    if tx_allowed || self.speed == Speed::High {
                        debug!("SETUP ACK");
                        ack = true;
                        State::Idle
                    } else {
                        State::InterpacketDelay
                    }
                } else {
                    debug!("SETUP DATA LENGTH {}", data.length);
                    State::Idle
                }
            }
            State::ReadData if tokenizer.new_token => {
                warn!("SETUP aborted by PID {}", tokenizer.pid);
                State::Idle
            }
            State::ReadData => State::ReadData,

            State::InterpacketDelay if tx_allowed => {
                debug!("SETUP ACK");
                ack = true;
                State::Idle
            }
            State::InterpacketDelay => State::InterpacketDelay,
        };

        let outputs = DecoderOutputs {
            setup: self.packet,
            ack,
            timer_start: data.new_packet,
        };

        *self = SetupDecoder {
            speed: self.speed,
            state,
            packet,
        };

        outputs
    }
}

impl Default for SetupDecoder {
    fn default() -> Self {
        Self::new(Speed::default())
    }
}

/// A [`SetupDecoder`] with its own [`InterpacketTimer`].
///
/// The decoder starts the timer, and the timer's `tx_allowed` feeds back
/// into the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StandaloneSetupDecoder {
    decoder: SetupDecoder,
    timer: InterpacketTimer,
}

impl StandaloneSetupDecoder {
    /// Create a decoder and timer for a device operating at `speed`.
    pub const fn new(speed: Speed) -> Self {
        StandaloneSetupDecoder {
            decoder: SetupDecoder::new(speed),
            timer: InterpacketTimer::new(speed),
        }
    }

    /// Set the operating speed of both the decoder and the timer.
    pub fn set_speed(&mut self, speed: Speed) {
        self.decoder.set_speed(speed);
        self.timer.set_speed(speed);
    }

    /// Access the decoder.
    pub fn decoder(&self) -> &SetupDecoder {
        &self.decoder
    }

    /// Access the interpacket timer.
    ///
    /// Use this to adjust the minimum delay.
    pub fn timer_mut(&mut self) -> &mut InterpacketTimer {
        &mut self.timer
    }

    /// Advance the decoder and timer by one tick.
    pub fn step(&mut self, tokenizer: TokenDetectorInterface, data: DataPacket) -> DecoderOutputs {
        let tx_allowed = self.timer.outputs().tx_allowed;
        let outputs = self.decoder.step(&DecoderInputs {
            tokenizer,
            data,
            tx_allowed,
        });
        self.timer.step(outputs.timer_start);
        outputs
    }
}
