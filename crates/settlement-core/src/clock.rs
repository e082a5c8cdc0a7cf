//! The tick clock: the single source of truth for the game loop's
//! monotonic tick counter and wall-clock timestamp.
//!
//! Unlike an in-memory simulation clock, every tick here is stamped with
//! the wall-clock time it ran at, since outbound events carry a real
//! `timestamp` field consumed by the browser client.

use chrono::{DateTime, Utc};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// The game loop's tick clock.
///
/// The clock advances once per economic tick. `now()` is read fresh on
/// every advance so per-tick timestamps reflect actual wall-clock time
/// rather than a fixed simulated rate, even if a tick runs late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    /// Current tick number (0-indexed, incremented at the start of each
    /// tick).
    tick: u64,
}

impl TickClock {
    /// Create a new clock starting at tick 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// Create a clock resuming from a known tick number (process restart).
    #[must_use]
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance the clock by one tick, stamping it with `now`. Returns the
    /// new tick number and its timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would
    /// exceed `u64::MAX`.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<(u64, DateTime<Utc>), ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok((self.tick, now))
    }

    /// Return the current tick number.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_tick_zero() {
        assert_eq!(TickClock::new().tick(), 0);
    }

    #[test]
    fn clock_advances_and_stamps_the_given_time() {
        let mut clock = TickClock::new();
        let now = Utc::now();
        let (tick, stamped) = clock.advance(now).unwrap();
        assert_eq!(tick, 1);
        assert_eq!(stamped, now);
        assert_eq!(clock.tick(), 1);
    }

    #[test]
    fn from_tick_resumes_at_the_given_count() {
        let clock = TickClock::from_tick(500);
        assert_eq!(clock.tick(), 500);
    }

    #[test]
    fn advance_overflows_at_u64_max() {
        let mut clock = TickClock::from_tick(u64::MAX);
        let result = clock.advance(Utc::now());
        assert!(matches!(result, Err(ClockError::TickOverflow)));
    }
}
