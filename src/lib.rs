//! A USB 2.0 control endpoint front end
//!
//! `usb-setup-mux` models the part of a USB device controller that sits
//! between the packet layer and the control request handlers. It
//!
//! - detects SETUP transactions, and decodes their 8-byte data stage into a
//!   [`SetupPacket`](setup::SetupPacket),
//! - waits out the speed-dependent interpacket delay before it requests an
//!   ACK, and
//! - shares one control endpoint across any number of request handlers with
//!   the [`RequestHandlerMultiplexer`](mux::RequestHandlerMultiplexer).
//!
//! # Timing model
//!
//! Every component is a synchronous machine with a `step()` method. Call
//! `step()` once per bus tick (one ULPI clock). Outputs marked *registered*
//! show the state committed by the previous `step()`; all other outputs are
//! computed from the inputs of the current `step()`.
//!
//! # Example
//!
//! Decode a SETUP transaction, and hand it to a handler that stalls vendor
//! requests.
//!
//! ```
//! use usb_setup_mux::{
//!     decoder::StandaloneSetupDecoder,
//!     handler::StallOnlyHandler,
//!     interface::{DataPacket, HandlerInputs, TokenDetectorInterface},
//!     mux::RequestHandlerMultiplexer,
//!     setup::SetupPacket,
//!     Speed,
//! };
//! use usb_device::control::RequestType;
//!
//! let mut decoder = StandaloneSetupDecoder::new(Speed::High);
//! let mut stall_vendor =
//!     StallOnlyHandler::new(|setup: &SetupPacket| setup.request_type() == RequestType::Vendor);
//!
//! let mut mux: RequestHandlerMultiplexer = RequestHandlerMultiplexer::new();
//! mux.attach(&mut stall_vendor).unwrap();
//!
//! decoder.step(TokenDetectorInterface::new_token(0b1101), DataPacket::none());
//! let out = decoder.step(
//!     TokenDetectorInterface::idle(0b1101),
//!     DataPacket::received(&[0b0_10_00010, 12, 0xcd, 0xab, 0x23, 0x01, 0x78, 0x56]),
//! );
//! assert!(out.ack);
//!
//! // The packet is registered; it shows up on the next tick.
//! let out = decoder.step(TokenDetectorInterface::idle(0b1101), DataPacket::none());
//! assert!(out.setup.received);
//!
//! let shared = HandlerInputs {
//!     setup: out.setup,
//!     status_requested: true,
//!     ..HandlerInputs::default()
//! };
//! assert!(mux.step(&shared).handshakes_out.is_stall());
//! ```

#![no_std]

#[macro_use]
mod log;

pub mod decoder;
pub mod handler;
pub mod interface;
pub mod mux;
pub mod setup;
pub mod timer;

/// USB low / full / high speed setting.
///
/// This is the speed negotiated on the link. The numeric values match
/// the 2-bit encoding used by the packet layer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u8)]
pub enum Speed {
    /// High speed (480 Mbit/s).
    ///
    /// A high speed device only needs one bus turnaround before it
    /// responds, and that's covered by processing delays.
    #[default]
    High = 0,
    /// Full speed (12 Mbit/s).
    Full = 1,
    /// Low speed (1.5 Mbit/s).
    Low = 2,
}

impl Speed {
    /// Decode the 2-bit speed encoding.
    ///
    /// Returns `None` for the reserved encoding `3`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Speed::High),
            1 => Some(Speed::Full),
            2 => Some(Speed::Low),
            _ => None,
        }
    }
}
