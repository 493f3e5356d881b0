//! Interfaces between the packet layer, the decoder, and request handlers
//!
//! Values in this module are plain snapshots of a bus for a single tick.
//! Strobes and pulses are `bool`s that are true for exactly one tick.
//!
//! A request handler sees the bus as two halves:
//!
//! - [`HandlerInputs`] carries everything broadcast from the control endpoint
//!   to the handlers. Every handler sees the same value.
//! - [`HandlerOutputs`] carries everything a handler drives back towards the
//!   control endpoint. The [multiplexer](crate::mux) combines these.

use crate::setup::{SetupPacket, SETUP_PACKET_LEN};

/// Snapshot of the token detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenDetectorInterface {
    /// The 4-bit PID of the most recent token packet.
    pub pid: u8,
    /// Pulsed when a new token packet was just detected.
    pub new_token: bool,
}

impl TokenDetectorInterface {
    /// A token with `pid` was detected this tick.
    pub const fn new_token(pid: u8) -> Self {
        TokenDetectorInterface {
            pid: pid & 0xF,
            new_token: true,
        }
    }

    /// No new token; `pid` still reflects the last token seen.
    pub const fn idle(pid: u8) -> Self {
        TokenDetectorInterface {
            pid: pid & 0xF,
            new_token: false,
        }
    }
}

/// A completed data packet, as presented by the data packet deserializer.
///
/// The deserializer is sized for SETUP data; it keeps at most
/// [`SETUP_PACKET_LEN`] payload bytes, but always reports the true length.
/// It only pulses `new_packet` for packets with a valid data CRC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DataPacket {
    /// Pulsed when a packet has just been received.
    pub new_packet: bool,
    /// Number of payload bytes in the packet, excluding PID and CRC.
    pub length: usize,
    /// The first payload bytes of the packet.
    pub payload: [u8; SETUP_PACKET_LEN],
}

impl DataPacket {
    /// No packet this tick.
    pub const fn none() -> Self {
        DataPacket {
            new_packet: false,
            length: 0,
            payload: [0; SETUP_PACKET_LEN],
        }
    }

    /// A packet carrying `data` was just received.
    pub fn received(data: &[u8]) -> Self {
        let mut payload = [0; SETUP_PACKET_LEN];
        let size = data.len().min(SETUP_PACKET_LEN);
        payload[..size].copy_from_slice(&data[..size]);
        DataPacket {
            new_packet: true,
            length: data.len(),
            payload,
        }
    }
}

/// Connection to the interpacket timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterpacketTimerInterface {
    /// Driven by the decoder; pulsed to start timing a receive-to-transmit gap.
    pub start: bool,
    /// Driven by the timer; the required gap has elapsed and we may transmit.
    pub tx_allowed: bool,
    /// Driven by the timer; the response window has closed.
    pub tx_timeout: bool,
}

bitflags::bitflags! {
    /// Handshake packets.
    ///
    /// Used in both directions. When a handler drives these, they're requests
    /// to generate a handshake. When the bus drives these, they're handshakes
    /// detected from the host.
    ///
    /// At most one handshake should be set in any tick.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Handshakes: u8 {
        const ACK = 1 << 0;
        const NAK = 1 << 1;
        const STALL = 1 << 2;
    }
}

impl Handshakes {
    /// Indicates if ACK is set.
    pub const fn is_ack(&self) -> bool {
        self.contains(Handshakes::ACK)
    }
    /// Indicates if NAK is set.
    pub const fn is_nak(&self) -> bool {
        self.contains(Handshakes::NAK)
    }
    /// Indicates if STALL is set.
    pub const fn is_stall(&self) -> bool {
        self.contains(Handshakes::STALL)
    }
    /// Indicates if more than one handshake is set.
    ///
    /// There's no precedence between handshakes. A conflicting set
    /// can't be put on the wire.
    pub const fn is_conflicting(&self) -> bool {
        self.bits().count_ones() > 1
    }
}

/// One beat of the receive stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RxStream {
    /// `payload` carries a received byte.
    pub valid: bool,
    /// The packet started this tick.
    pub next: bool,
    /// A packet is being received.
    pub active: bool,
    /// The received byte.
    pub payload: u8,
}

/// One beat of the transmit stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxStream {
    /// `payload` carries a byte to send, or this beat is a zero-length packet.
    pub valid: bool,
    /// This is the first byte of a packet.
    pub first: bool,
    /// This is the last byte of a packet.
    pub last: bool,
    /// The byte to send.
    pub payload: u8,
}

impl TxStream {
    /// A zero-length packet.
    ///
    /// A beat that's `valid` and `last`, but not `first`, carries no data.
    pub const fn zlp() -> Self {
        TxStream {
            valid: true,
            first: false,
            last: true,
            payload: 0,
        }
    }

    /// Indicates if this beat is a zero-length packet.
    pub const fn is_zlp(&self) -> bool {
        self.valid && self.last && !self.first
    }
}

/// Everything broadcast from the control endpoint to a request handler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerInputs {
    /// The most recent SETUP packet.
    pub setup: SetupPacket,
    /// Information about any incoming token packets.
    pub tokenizer: TokenDetectorInterface,
    /// Pulsed when a data-stage IN token arrived, and the interpacket delay passed.
    pub data_requested: bool,
    /// Pulsed when the host requested our status stage response.
    pub status_requested: bool,
    /// The number of the active configuration.
    pub active_config: u8,
    /// The receive stream for any data packets.
    pub rx: RxStream,
    /// The control endpoint expects a data packet.
    pub rx_expected: bool,
    /// Pulsed once an interpacket delay passed after a complete receipt.
    pub rx_ready_for_response: bool,
    /// Pulsed when the most recent data packet was corrupted, and should be dropped.
    pub rx_invalid: bool,
    /// The transmitter accepted the current `tx` beat.
    pub tx_ready: bool,
    /// Handshakes detected from the host.
    pub handshakes_in: Handshakes,
}

/// Everything a request handler drives towards the control endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandlerOutputs {
    /// Strobe; the device address should change to `new_address`.
    pub address_changed: bool,
    /// The new device address. Only the low 7 bits are meaningful; the
    /// multiplexer clears bit 7.
    pub new_address: u8,
    /// Strobe; the device configuration should change to `new_config`.
    pub config_changed: bool,
    /// The configuration value to apply.
    pub new_config: u8,
    /// Packets generated by the handler.
    pub tx: TxStream,
    /// The DATA PID toggle for the packet in `tx`. `true` is DATA1.
    pub tx_data_pid: bool,
    /// Handshake generation requests.
    pub handshakes_out: Handshakes,
}

impl HandlerOutputs {
    /// Outputs that drive nothing.
    pub const fn idle() -> Self {
        HandlerOutputs {
            address_changed: false,
            new_address: 0,
            config_changed: false,
            new_config: 0,
            tx: TxStream {
                valid: false,
                first: false,
                last: false,
                payload: 0,
            },
            tx_data_pid: true,
            handshakes_out: Handshakes::empty(),
        }
    }

    /// Outputs that only request `handshake`.
    pub const fn handshake(handshake: Handshakes) -> Self {
        let mut outputs = Self::idle();
        outputs.handshakes_out = handshake;
        outputs
    }
}

impl Default for HandlerOutputs {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataPacket, HandlerOutputs, Handshakes, TokenDetectorInterface, TxStream};

    #[test]
    fn data_packet_truncates_payload() {
        let packet = DataPacket::received(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert!(packet.new_packet);
        assert_eq!(packet.length, 10);
        assert_eq!(packet.payload, [1, 2, 3, 4, 5, 6, 7, 8]);

        let packet = DataPacket::received(&[1, 2, 3]);
        assert_eq!(packet.length, 3);
        assert_eq!(packet.payload, [1, 2, 3, 0, 0, 0, 0, 0]);

        assert!(!DataPacket::none().new_packet);
    }

    #[test]
    fn token_pid_is_four_bits() {
        let token = TokenDetectorInterface::new_token(0b0010_1101);
        assert_eq!(token.pid, 0b1101);
        assert!(token.new_token);
        assert!(!TokenDetectorInterface::idle(0b1101).new_token);
    }

    #[test]
    fn handshake_conflicts() {
        assert!(!Handshakes::empty().is_conflicting());
        assert!(!Handshakes::STALL.is_conflicting());
        assert!((Handshakes::ACK | Handshakes::STALL).is_conflicting());
        assert!(Handshakes::all().is_conflicting());
    }

    #[test]
    fn zlp() {
        let zlp = TxStream::zlp();
        assert!(zlp.is_zlp());
        assert!(!TxStream::default().is_zlp());
        assert!(!TxStream {
            first: true,
            ..zlp
        }
        .is_zlp());
    }

    #[test]
    fn idle_outputs() {
        let idle = HandlerOutputs::default();
        assert_eq!(idle, HandlerOutputs::idle());
        assert!(idle.tx_data_pid);
        assert!(idle.handshakes_out.is_empty());
        assert!(!idle.tx.valid);
    }
}
