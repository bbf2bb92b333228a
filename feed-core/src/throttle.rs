//! Scroll throttle with a leading edge and a single trailing flush.
//!
//! The first tick after a quiet interval fires immediately. Ticks inside the
//! interval are coalesced: the first of them schedules one trailing flush at
//! the end of the interval, the rest are dropped. The flush recomputes with
//! whatever scroll position is current by then, so the final position is
//! always rendered.
//!
//! Time is passed in by the caller; the async driver owns the clock.

use crate::error::{CoreError, Result};
use std::time::Duration;
use tokio::time::Instant;

/// What the caller should do with a scroll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Recompute now
    Fire,
    /// Recompute at the given deadline (first coalesced tick in the interval)
    Schedule(Instant),
    /// A flush is already scheduled; nothing to do
    Coalesced,
}

#[derive(Debug, Clone)]
pub struct ScrollThrottle {
    interval: Duration,
    last_fired: Option<Instant>,
    trailing: Option<Instant>,
}

impl ScrollThrottle {
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CoreError::ZeroThrottleInterval);
        }
        Ok(Self {
            interval,
            last_fired: None,
            trailing: None,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Deadline of the pending trailing flush, if any.
    pub fn pending_flush(&self) -> Option<Instant> {
        self.trailing
    }

    /// Register a scroll tick observed at `now`.
    pub fn hit(&mut self, now: Instant) -> Tick {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                if self.trailing.is_some() {
                    Tick::Coalesced
                } else {
                    let deadline = last + self.interval;
                    self.trailing = Some(deadline);
                    Tick::Schedule(deadline)
                }
            }
            _ => {
                self.last_fired = Some(now);
                self.trailing = None;
                Tick::Fire
            }
        }
    }

    /// Run the trailing flush. Returns `true` if a recomputation is owed.
    pub fn flush(&mut self, now: Instant) -> bool {
        if self.trailing.take().is_some() {
            self.last_fired = Some(now);
            true
        } else {
            false
        }
    }

    /// Forget history, e.g. when a new list replaces the old one.
    pub fn reset(&mut self) {
        self.last_fired = None;
        self.trailing = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_two_recomputations() {
        let mut throttle = ScrollThrottle::new(INTERVAL).unwrap();
        let start = Instant::now();
        let mut recomputes = 0;
        let mut deadline = None;

        // 50 ticks within 100 ms
        for i in 0..50u64 {
            let now = start + Duration::from_millis(i * 2);
            match throttle.hit(now) {
                Tick::Fire => recomputes += 1,
                Tick::Schedule(at) => deadline = Some(at),
                Tick::Coalesced => {}
            }
        }

        let deadline = deadline.unwrap();
        assert_eq!(deadline, start + INTERVAL);
        if throttle.flush(deadline) {
            recomputes += 1;
        }

        assert_eq!(recomputes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_ticks_all_fire() {
        let mut throttle = ScrollThrottle::new(INTERVAL).unwrap();
        let start = Instant::now();
        for i in 0..5u64 {
            assert_eq!(throttle.hit(start + INTERVAL * i as u32), Tick::Fire);
        }
        assert!(throttle.pending_flush().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_pending_is_noop() {
        let mut throttle = ScrollThrottle::new(INTERVAL).unwrap();
        let now = Instant::now();
        assert_eq!(throttle.hit(now), Tick::Fire);
        assert!(!throttle.flush(now + INTERVAL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_restarts_interval() {
        let mut throttle = ScrollThrottle::new(INTERVAL).unwrap();
        let start = Instant::now();
        throttle.hit(start);
        throttle.hit(start + Duration::from_millis(10));
        assert!(throttle.flush(start + INTERVAL));

        // inside the interval opened by the flush
        let tick = throttle.hit(start + INTERVAL + Duration::from_millis(20));
        assert_eq!(tick, Tick::Schedule(start + INTERVAL * 2));
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(
            ScrollThrottle::new(Duration::ZERO).unwrap_err(),
            CoreError::ZeroThrottleInterval
        );
    }
}
