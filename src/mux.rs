//! Request handler multiplexer
//!
//! The [`RequestHandlerMultiplexer`] shares one control endpoint across many
//! [request handlers](crate::handler). Each tick it
//!
//! - broadcasts the same [`HandlerInputs`] to every attached handler, then
//! - combines the handlers' [`HandlerOutputs`] into one set of outputs.
//!
//! # Arbitration
//!
//! The multiplexer doesn't resolve contention. It expects that only one handler
//! responds to any given request, and combines outputs as follows.
//!
//! | Outputs                                   | Combined by                         |
//! |-------------------------------------------|-------------------------------------|
//! | `address_changed`, `new_address[6:0]`     | first attached handler that strobes |
//! | `config_changed`, `new_config`            | first attached handler that strobes |
//! | `tx.valid`, `tx.first`, `tx.last`         | OR of all handlers                  |
//! | `tx.payload`, `tx_data_pid`               | handler driving `tx.valid`          |
//! | `handshakes_out`                          | OR of all handlers                  |
//!
//! If two handlers request different handshakes in the same tick, the combined
//! handshake is meaningless. Debug builds panic when that happens.

use crate::{
    handler::RequestHandler,
    interface::{HandlerInputs, HandlerOutputs},
};

/// The default number of handlers that a multiplexer can hold.
pub const DEFAULT_CAPACITY: usize = 16;

/// Errors when attaching a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachError {
    /// The multiplexer can't hold any more handlers.
    Full,
}

impl core::fmt::Display for AttachError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AttachError::Full => f.write_str("request handler multiplexer is full"),
        }
    }
}

/// Multiplexes many request handlers onto one control endpoint.
///
/// Handlers are attached once, in priority order, and stay attached for the
/// life of the multiplexer. `COUNT` is the maximum number of handlers. If you
/// keep handlers somewhere else, use [`arbitrate()`] directly.
///
/// ```
/// use usb_setup_mux::{
///     handler::StallOnlyHandler,
///     interface::HandlerInputs,
///     mux::RequestHandlerMultiplexer,
///     setup::SetupPacket,
/// };
///
/// let mut stall_all = StallOnlyHandler::new(|_: &SetupPacket| true);
///
/// let mut mux = RequestHandlerMultiplexer::<4>::new();
/// assert_eq!(mux.attach(&mut stall_all), Ok(0));
///
/// let shared = HandlerInputs {
///     data_requested: true,
///     ..HandlerInputs::default()
/// };
/// assert!(mux.step(&shared).handshakes_out.is_stall());
/// ```
pub struct RequestHandlerMultiplexer<'a, const COUNT: usize = DEFAULT_CAPACITY> {
    handlers: [Option<&'a mut dyn RequestHandler>; COUNT],
    len: usize,
}

impl<'a, const COUNT: usize> RequestHandlerMultiplexer<'a, COUNT> {
    /// Create a multiplexer without any handlers.
    pub fn new() -> Self {
        RequestHandlerMultiplexer {
            handlers: core::array::from_fn(|_| None),
            len: 0,
        }
    }

    /// Attach a handler.
    ///
    /// Handlers attached earlier take priority over handlers attached later.
    /// Returns the handler's position, or an error if there's no more room.
    pub fn attach(&mut self, handler: &'a mut dyn RequestHandler) -> Result<usize, AttachError> {
        let index = self.len;
        let slot = self.handlers.get_mut(index).ok_or(AttachError::Full)?;
        *slot = Some(handler);
        self.len += 1;
        debug!("ATTACH HANDLER {}", index);
        Ok(index)
    }

    /// Returns the number of attached handlers.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Indicates if there are no attached handlers.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the maximum number of handlers.
    pub const fn capacity(&self) -> usize {
        COUNT
    }

    /// Step every handler with the `shared` inputs, and combine their outputs.
    pub fn step(&mut self, shared: &HandlerInputs) -> HandlerOutputs {
        let mut outputs = [HandlerOutputs::idle(); COUNT];
        for (handler, output) in self.handlers.iter_mut().flatten().zip(outputs.iter_mut()) {
            *output = handler.step(shared);
        }
        arbitrate(&outputs[..self.len])
    }
}

impl<const COUNT: usize> Default for RequestHandlerMultiplexer<'_, COUNT> {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine handler outputs into the outputs of the control endpoint.
///
/// `outputs` must be in priority order. See the module documentation for the
/// arbitration rules.
///
/// # Panics
///
/// In debug builds, panics if the handlers request more than one kind of
/// handshake.
pub fn arbitrate(outputs: &[HandlerOutputs]) -> HandlerOutputs {
    let mut shared = HandlerOutputs::idle();

    if let Some(winner) = outputs.iter().find(|output| output.address_changed) {
        shared.address_changed = true;
        shared.new_address = winner.new_address & 0x7F;
    }

    if let Some(winner) = outputs.iter().find(|output| output.config_changed) {
        shared.config_changed = true;
        shared.new_config = winner.new_config;
    }

    let mut transmitters = 0usize;
    for output in outputs {
        shared.tx.valid |= output.tx.valid;
        shared.tx.first |= output.tx.first;
        shared.tx.last |= output.tx.last;
        if output.tx.valid {
            transmitters += 1;
            shared.tx.payload = output.tx.payload;
            shared.tx_data_pid = output.tx_data_pid;
        }

        shared.handshakes_out |= output.handshakes_out;
    }

    if transmitters > 1 {
        warn!("{} handlers transmitting", transmitters);
    }

    if shared.handshakes_out.is_conflicting() {
        warn!("Conflicting handshakes {:?}", shared.handshakes_out);
    }
    debug_assert!(
        !shared.handshakes_out.is_conflicting(),
        "Handlers requested conflicting handshakes"
    );

    shared
}
