//! Request handlers
//!
//! A request handler implements [`RequestHandler`]. Each tick it sees the
//! broadcast [`HandlerInputs`], and drives its own [`HandlerOutputs`]. The
//! [multiplexer](crate::mux) combines all handler outputs into the outputs of
//! the control endpoint.
//!
//! Handlers are expected to stay idle unless they own the current request.
//! An idle handler returns [`HandlerOutputs::idle()`].

use crate::{
    interface::{HandlerInputs, HandlerOutputs, Handshakes, TxStream},
    setup::SetupPacket,
};

/// A control request handler
pub trait RequestHandler {
    /// Advance the handler by one tick.
    fn step(&mut self, interface: &HandlerInputs) -> HandlerOutputs;
}

/// Outputs that send a zero-length packet, as DATA1.
///
/// This is the usual answer to an IN status stage.
pub const fn send_zlp() -> HandlerOutputs {
    let mut outputs = HandlerOutputs::idle();
    outputs.tx = TxStream::zlp();
    outputs
}

/// A handler that only stalls requests.
///
/// When the host requests a data or status stage, the handler stalls it if
/// `condition` holds for the current SETUP packet. It's typically attached
/// last, as a catch-all for requests that no other handler supports.
///
/// ```
/// use usb_setup_mux::{
///     handler::{RequestHandler, StallOnlyHandler},
///     interface::HandlerInputs,
///     setup::SetupPacket,
/// };
///
/// let mut handler = StallOnlyHandler::new(|setup: &SetupPacket| setup.request == 0x42);
///
/// let mut inputs = HandlerInputs::default();
/// inputs.setup.request = 0x42;
/// assert!(!handler.step(&inputs).handshakes_out.is_stall());
///
/// inputs.data_requested = true;
/// assert!(handler.step(&inputs).handshakes_out.is_stall());
/// ```
pub struct StallOnlyHandler<F> {
    condition: F,
}

impl<F> StallOnlyHandler<F>
where
    F: Fn(&SetupPacket) -> bool,
{
    /// Create a handler that stalls whenever `condition` returns `true`.
    pub const fn new(condition: F) -> Self {
        StallOnlyHandler { condition }
    }
}

impl<F> RequestHandler for StallOnlyHandler<F>
where
    F: Fn(&SetupPacket) -> bool,
{
    fn step(&mut self, interface: &HandlerInputs) -> HandlerOutputs {
        let responding = interface.data_requested || interface.status_requested;
        if responding && (self.condition)(&interface.setup) {
            HandlerOutputs::handshake(Handshakes::STALL)
        } else {
            HandlerOutputs::idle()
        }
    }
}

impl<F> core::fmt::Debug for StallOnlyHandler<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StallOnlyHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{send_zlp, RequestHandler, StallOnlyHandler};
    use crate::{
        interface::{HandlerInputs, HandlerOutputs},
        setup::SetupPacket,
    };
    use usb_device::control::{Request, RequestType};

    fn stall_standard() -> StallOnlyHandler<impl Fn(&SetupPacket) -> bool> {
        StallOnlyHandler::new(|setup: &SetupPacket| setup.request_type() == RequestType::Standard)
    }

    #[test]
    fn stalls_only_when_requested() {
        let mut handler = stall_standard();
        let inputs = HandlerInputs::default();
        assert_eq!(handler.step(&inputs), HandlerOutputs::idle());

        let inputs = HandlerInputs {
            data_requested: true,
            ..HandlerInputs::default()
        };
        assert!(handler.step(&inputs).handshakes_out.is_stall());

        let inputs = HandlerInputs {
            status_requested: true,
            ..HandlerInputs::default()
        };
        let outputs = handler.step(&inputs);
        assert!(outputs.handshakes_out.is_stall());
        assert!(!outputs.handshakes_out.is_conflicting());
        assert!(!outputs.tx.valid);
        assert!(!outputs.address_changed);
        assert!(!outputs.config_changed);
    }

    #[test]
    fn condition_not_met() {
        let mut handler = stall_standard();
        let mut inputs = HandlerInputs {
            data_requested: true,
            status_requested: true,
            ..HandlerInputs::default()
        };
        inputs.setup = SetupPacket::parse(&[0b0_01_00001, 0x0A, 0, 0, 0, 0, 1, 0]);
        assert_eq!(handler.step(&inputs), HandlerOutputs::idle());
    }

    #[test]
    fn condition_sees_broadcast_setup() {
        let mut handler = StallOnlyHandler::new(|setup: &SetupPacket| {
            Request::from(*setup).request == Request::SET_FEATURE && setup.value == 2
        });
        let mut inputs = HandlerInputs {
            status_requested: true,
            ..HandlerInputs::default()
        };

        inputs.setup = SetupPacket::parse(&[0x00, 0x03, 0x02, 0x00, 0, 0, 0, 0]);
        assert!(handler.step(&inputs).handshakes_out.is_stall());

        inputs.setup = SetupPacket::parse(&[0x00, 0x03, 0x01, 0x00, 0, 0, 0, 0]);
        assert!(!handler.step(&inputs).handshakes_out.is_stall());
    }

    #[test]
    fn zlp_outputs() {
        let outputs = send_zlp();
        assert!(outputs.tx.is_zlp());
        assert!(outputs.tx_data_pid);
        assert!(outputs.handshakes_out.is_empty());
    }
}
