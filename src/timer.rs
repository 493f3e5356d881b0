//! Interpacket timer.
//!
//! After a device receives a packet, it must wait a minimum bus idle time
//! before it transmits, and it must start transmitting before the host
//! gives up on it [USB2, 7.1.18]. The [`InterpacketTimer`] counts those
//! windows in ULPI clock ticks (60MHz).
//!
//! | Speed | Bit time   | `tx_allowed` after | `tx_timeout` after |
//! |-------|------------|--------------------|--------------------|
//! | High  | 1/8 tick   | 1 tick             | 24 ticks           |
//! | Full  | 5 ticks    | 10 ticks           | 32 ticks           |
//! | Low   | 40 ticks   | 80 ticks           | 260 ticks          |
//!
//! # Example
//!
//! ```
//! use usb_setup_mux::{timer::InterpacketTimer, Speed};
//!
//! let mut timer = InterpacketTimer::new(Speed::Full);
//! timer.set_delay(3); // Allow transmit three ticks after start
//!
//! assert!(!timer.step(true).tx_allowed);
//! assert!(!timer.step(false).tx_allowed);
//! assert!(!timer.step(false).tx_allowed);
//! assert!(timer.step(false).tx_allowed);
//! assert!(!timer.step(false).tx_allowed); // Only pulsed
//! ```

use crate::{interface::InterpacketTimerInterface, Speed};

/// Returns the minimum receive-to-transmit delay, in ticks, for `speed`.
pub const fn rx_to_tx_delay(speed: Speed) -> u16 {
    match speed {
        Speed::High => 1,
        Speed::Full => 10,
        Speed::Low => 80,
    }
}

/// Returns the maximum receive-to-transmit delay, in ticks, for `speed`.
pub const fn rx_to_tx_timeout(speed: Speed) -> u16 {
    match speed {
        Speed::High => 24,
        Speed::Full => 32,
        Speed::Low => 260,
    }
}

/// Counts interpacket delays.
///
/// The delay and the timeout window are latched when the count starts.
/// Changing the speed or the delay only affects the next count.
///
/// See the module-level documentation for an example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpacketTimer {
    speed: Speed,
    delay: u16,
    /// The running count, or `None` if the timer isn't running.
    count: Option<Count>,
}

/// A count in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Count {
    /// Ticks since start.
    elapsed: u16,
    delay: u16,
    timeout: u16,
}

impl InterpacketTimer {
    /// Create a stopped timer that counts delays for `speed`.
    pub const fn new(speed: Speed) -> Self {
        InterpacketTimer {
            speed,
            delay: rx_to_tx_delay(speed),
            count: None,
        }
    }

    /// Returns the speed used for the timeout window.
    pub fn speed(&self) -> Speed {
        self.speed
    }

    /// Change the link speed.
    ///
    /// This also restores the minimum delay for the new speed. A running count
    /// keeps the delay and timeout it started with.
    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
        self.delay = rx_to_tx_delay(speed);
    }

    /// Set the minimum delay, in ticks, before `tx_allowed` pulses.
    ///
    /// `ticks` saturates to the timeout window for the current speed. A value of `0`
    /// results in a one tick delay. Takes effect on the next start.
    pub fn set_delay(&mut self, ticks: u16) {
        self.delay = ticks.max(1).min(rx_to_tx_timeout(self.speed));
    }

    /// Returns the minimum delay.
    pub fn delay(&self) -> u16 {
        self.delay
    }

    /// Indicates if the timer is counting.
    pub fn is_running(&self) -> bool {
        self.count.is_some()
    }

    /// Returns the registered timer outputs without advancing the timer.
    pub fn outputs(&self) -> InterpacketTimerInterface {
        InterpacketTimerInterface {
            start: false,
            tx_allowed: self.count.is_some_and(|count| count.elapsed == count.delay),
            tx_timeout: self.count.is_some_and(|count| count.elapsed == count.timeout),
        }
    }

    /// Advance the timer by one tick.
    ///
    /// Outputs reflect the count before this tick. If `start` is set, the count
    /// restarts; `tx_allowed` follows `delay()` ticks later.
    pub fn step(&mut self, start: bool) -> InterpacketTimerInterface {
        let outputs = InterpacketTimerInterface {
            start,
            ..self.outputs()
        };

        self.count = if start {
            Some(Count {
                elapsed: 1,
                delay: self.delay,
                timeout: rx_to_tx_timeout(self.speed),
            })
        } else {
            match self.count {
                Some(count) if count.elapsed < count.timeout => Some(Count {
                    elapsed: count.elapsed + 1,
                    ..count
                }),
                _ => None,
            }
        };

        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::{rx_to_tx_delay, rx_to_tx_timeout, InterpacketTimer};
    use crate::Speed;

    /// Returns the tick (counted from start) of the first output that
    /// matches `predicate`.
    fn first_tick(
        timer: &mut InterpacketTimer,
        predicate: impl Fn(&crate::interface::InterpacketTimerInterface) -> bool,
    ) -> Option<u16> {
        timer.step(true);
        (1..=1000).find(|_| predicate(&timer.step(false)))
    }

    #[test]
    fn stopped_by_default() {
        let mut timer = InterpacketTimer::new(Speed::Full);
        assert!(!timer.is_running());
        for _ in 0..100 {
            let outputs = timer.step(false);
            assert!(!outputs.tx_allowed);
            assert!(!outputs.tx_timeout);
        }
    }

    #[test]
    fn tx_allowed_per_speed() {
        for speed in [Speed::High, Speed::Full, Speed::Low] {
            let mut timer = InterpacketTimer::new(speed);
            assert_eq!(
                first_tick(&mut timer, |o| o.tx_allowed),
                Some(rx_to_tx_delay(speed))
            );
        }
    }

    #[test]
    fn timeout_stops_timer() {
        for speed in [Speed::High, Speed::Full, Speed::Low] {
            let mut timer = InterpacketTimer::new(speed);
            assert_eq!(
                first_tick(&mut timer, |o| o.tx_timeout),
                Some(rx_to_tx_timeout(speed))
            );
            assert!(!timer.is_running());
            assert!(!timer.step(false).tx_timeout);
        }
    }

    #[test]
    fn restart() {
        let mut timer = InterpacketTimer::new(Speed::Full);
        timer.step(true);
        for _ in 0..5 {
            assert!(!timer.step(false).tx_allowed);
        }
        // Restarting pushes out the deadline.
        timer.step(true);
        for _ in 1..rx_to_tx_delay(Speed::Full) {
            assert!(!timer.step(false).tx_allowed);
        }
        assert!(timer.step(false).tx_allowed);
    }

    #[test]
    fn set_delay() {
        let mut timer = InterpacketTimer::new(Speed::Full);
        timer.set_delay(0);
        assert_eq!(timer.delay(), 1);
        timer.set_delay(u16::MAX);
        assert_eq!(timer.delay(), rx_to_tx_timeout(Speed::Full));
        timer.set_delay(17);
        assert_eq!(first_tick(&mut timer, |o| o.tx_allowed), Some(17));

        timer.set_speed(Speed::Low);
        assert_eq!(timer.delay(), rx_to_tx_delay(Speed::Low));
    }

    #[test]
    fn reconfigure_while_running() {
        let mut timer = InterpacketTimer::new(Speed::Full);
        timer.step(true);
        for _ in 0..5 {
            assert!(!timer.step(false).tx_allowed);
        }

        // The running count keeps its delay and timeout.
        timer.set_delay(3);
        timer.set_speed(Speed::High);
        for _ in 6..rx_to_tx_delay(Speed::Full) {
            assert!(!timer.step(false).tx_allowed);
        }
        assert!(timer.step(false).tx_allowed);
        for _ in (rx_to_tx_delay(Speed::Full) + 1)..rx_to_tx_timeout(Speed::Full) {
            assert!(!timer.step(false).tx_timeout);
        }
        assert!(timer.step(false).tx_timeout);
        assert!(!timer.is_running());

        // The next count uses the new settings.
        assert_eq!(
            first_tick(&mut timer, |o| o.tx_allowed),
            Some(rx_to_tx_delay(Speed::High))
        );
    }
}
