//! Tick clock and per-call-site rate limiting.
//!
//! The host advances [`FieldClock`] once per tick; systems never read wall
//! time directly, which keeps every cadence deterministic under test.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Default, Resource)]
pub struct FieldClock {
    now: u64,
    ticks: u64,
}

impl FieldClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Moves the clock forward by `elapsed_ms` and counts one tick.
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.now = self.now.saturating_add(elapsed_ms);
        self.ticks += 1;
    }
}

/// Every independently rate-limited call the unit makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallSite {
    LocationPush,
    OfferDiscovery,
    /// Registry scan for rides assigned directly to an idle unit.
    AssignmentWatch,
    AcceptanceWatch,
    StatusWatch,
    MovementStep,
    AcceptSubmit,
    PickupSubmit,
    CompleteSubmit,
}

/// Remembers when each call-site last fired. A call issued before its
/// interval elapses is skipped, never queued.
#[derive(Debug, Default, Resource)]
pub struct CallThrottle {
    last_call: HashMap<CallSite, u64>,
}

impl CallThrottle {
    /// Returns the time since the previous permitted call (or
    /// `min_interval_ms` for the first one) and records `now`, or `None` if
    /// the call-site is still cooling down.
    pub fn try_acquire(&mut self, site: CallSite, now: u64, min_interval_ms: u64) -> Option<u64> {
        let elapsed = match self.last_call.get(&site) {
            Some(&last) => {
                let since = now.saturating_sub(last);
                if since < min_interval_ms {
                    return None;
                }
                since
            }
            None => min_interval_ms,
        };
        self.last_call.insert(site, now);
        Some(elapsed)
    }

    pub fn last_call(&self, site: CallSite) -> Option<u64> {
        self.last_call.get(&site).copied()
    }

    /// Forgets a call-site so the next call fires immediately.
    pub fn reset(&mut self, site: CallSite) {
        self.last_call.remove(&site);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_and_counts_ticks() {
        let mut clock = FieldClock::default();
        clock.advance(100);
        clock.advance(250);
        assert_eq!(clock.now(), 350);
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn throttle_skips_calls_inside_interval() {
        let mut throttle = CallThrottle::default();
        assert_eq!(throttle.try_acquire(CallSite::StatusWatch, 0, 1500), Some(1500));
        assert_eq!(throttle.try_acquire(CallSite::StatusWatch, 1000, 1500), None);
        assert_eq!(throttle.try_acquire(CallSite::StatusWatch, 1499, 1500), None);
        assert_eq!(throttle.try_acquire(CallSite::StatusWatch, 1600, 1500), Some(1600));
        assert_eq!(throttle.last_call(CallSite::StatusWatch), Some(1600));
    }

    #[test]
    fn call_sites_are_independent() {
        let mut throttle = CallThrottle::default();
        assert!(throttle.try_acquire(CallSite::AcceptanceWatch, 0, 2000).is_some());
        assert!(throttle.try_acquire(CallSite::StatusWatch, 100, 1500).is_some());
        assert!(throttle.try_acquire(CallSite::AcceptanceWatch, 100, 2000).is_none());

        throttle.reset(CallSite::AcceptanceWatch);
        assert!(throttle.try_acquire(CallSite::AcceptanceWatch, 200, 2000).is_some());
    }
}
