//! Logging interface, contingent on the hidden `__log` feature
//!
//! Only enable `__log` when debugging. The decoder and the multiplexer
//! run once per bus tick, so anything slower than a trace buffer will
//! distort timing.

macro_rules! debug {
    ($($args:tt)*) => {
        #[cfg(feature = "__log")]
        ::__log::debug!($($args)*)
    };
}

macro_rules! warn {
    ($($args:tt)*) => {
        #[cfg(feature = "__log")]
        ::__log::warn!($($args)*)
    };
}
