// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Absolute host clock.
//!
//! Both processes stamp the handshake record with the same system-wide
//! monotonic clock, so ticks are comparable across the segment.

use std::sync::atomic::{AtomicU64, Ordering};

use nix::time::{clock_gettime, ClockId};

/// Source of absolute host time in ticks.
pub trait Clock: Send {
    fn now(&self) -> u64;

    /// Tick rate used to derive the ticks-per-frame calibration.
    fn ticks_per_second(&self) -> f64;
}

/// `CLOCK_MONOTONIC` in nanoseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64,
            // CLOCK_MONOTONIC cannot fail on supported targets.
            Err(_) => 0,
        }
    }

    fn ticks_per_second(&self) -> f64 {
        1_000_000_000.0
    }
}

/// Manually advanced clock for deterministic tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: AtomicU64,
    rate: f64,
}

impl ManualClock {
    /// A clock ticking `rate` times per second, starting at zero.
    pub fn new(rate: f64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            rate,
        }
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::Release);
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn ticks_per_second(&self) -> f64 {
        self.rate
    }
}

impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }

    fn ticks_per_second(&self) -> f64 {
        (**self).ticks_per_second()
    }
}

/// Host clock ticks per audio frame.
pub fn ticks_per_frame(ticks_per_second: f64, sample_rate: u32) -> f64 {
    ticks_per_second / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(a > 0);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(48_000.0);
        assert_eq!(clock.now(), 0);
        clock.advance(256);
        clock.advance(256);
        assert_eq!(clock.now(), 512);
        clock.set(10);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_ticks_per_frame() {
        assert_eq!(ticks_per_frame(48_000.0, 48_000), 1.0);
        let ns = ticks_per_frame(1_000_000_000.0, 48_000);
        assert!((ns - 20_833.333).abs() < 0.01);
    }
}
