// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Producer/consumer drift monitor.
//!
//! Purely diagnostic. A warning is raised when the consumer runs half a ring
//! ahead of the host, or when the host callback stalls for two block periods.
//! The latch holds until the consumer falls back under half a ring.

use crate::shm::RING_CAPACITY;

/// One desynchronization excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftWarning {
    pub frame: u64,
    /// Consumer write counter minus host frame number.
    pub diff: i64,
    /// Frames elapsed on the host clock since the previous check.
    pub interval: u64,
}

#[derive(Debug)]
pub struct DriftMonitor {
    ticks_per_frame: f64,
    threshold: i64,
    last_check: Option<u64>,
    warning_latched: bool,
}

impl DriftMonitor {
    pub fn new(ticks_per_frame: f64) -> Self {
        Self {
            ticks_per_frame,
            threshold: (RING_CAPACITY / 2) as i64,
            last_check: None,
            warning_latched: false,
        }
    }

    pub fn is_latched(&self) -> bool {
        self.warning_latched
    }

    /// Observe one block. Returns a warning only on the first block of an
    /// excursion.
    pub fn check(
        &mut self,
        frame_number: u64,
        consumer_frame: u64,
        now: u64,
        block_frames: usize,
    ) -> Option<DriftWarning> {
        let diff = consumer_frame as i64 - frame_number as i64;
        // The first check after construction has no reference point.
        let interval = match self.last_check {
            Some(last) => (now.saturating_sub(last) as f64 / self.ticks_per_frame) as u64,
            None => 0,
        };

        self.last_check = Some(now);

        if !self.warning_latched {
            if diff >= self.threshold || interval >= 2 * block_frames as u64 {
                self.warning_latched = true;
                return Some(DriftWarning {
                    frame: frame_number,
                    diff,
                    interval,
                });
            }
        } else if diff < self.threshold {
            self.warning_latched = false;
        }
        None
    }
}
