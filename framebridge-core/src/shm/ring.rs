// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Block transport into and out of the sample rings.
//!
//! Offsets are derived from the absolute frame counter. All modulo
//! arithmetic goes through [`ring_offset`], so wraparound at the capacity
//! boundary is handled in exactly one place.

use crate::shm::layout::{SampleRing, RING_CAPACITY};

/// Ring slot for an absolute (possibly negative) frame number.
#[inline]
pub fn ring_offset(frame: i64) -> usize {
    frame.rem_euclid(RING_CAPACITY as i64) as usize
}

/// Copy one host channel into its interleaved ring lane starting at `start_frame`.
pub fn scatter_channel(ring: &SampleRing, start_frame: i64, channel: usize, input: &[f32]) {
    for (i, &sample) in input.iter().enumerate() {
        ring.store(ring_offset(start_frame + i as i64), channel, sample);
    }
}

/// Copy one ring lane starting at `start_frame` into a host channel.
pub fn gather_channel(ring: &SampleRing, start_frame: i64, channel: usize, output: &mut [f32]) {
    for (i, sample) in output.iter_mut().enumerate() {
        *sample = ring.load(ring_offset(start_frame + i as i64), channel);
    }
}

/// Zero `frames` ring frames starting at `start_frame` so a lagging consumer
/// cannot make the host replay stale audio.
pub fn clear_frames(ring: &SampleRing, start_frame: i64, frames: usize) {
    for i in 0..frames {
        ring.clear_frame(ring_offset(start_frame + i as i64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::SharedChannel;

    #[test]
    fn test_ring_offset_wraps() {
        assert_eq!(ring_offset(0), 0);
        assert_eq!(ring_offset(RING_CAPACITY as i64), 0);
        assert_eq!(ring_offset(RING_CAPACITY as i64 + 100), 100);
        assert_eq!(ring_offset(-1), RING_CAPACITY - 1);
        assert_eq!(ring_offset(-256), RING_CAPACITY - 256);
    }

    #[test]
    fn test_scatter_straddles_capacity_boundary() {
        let channel = SharedChannel::in_process();
        let ring = channel.down(0);
        let start = RING_CAPACITY as i64 - 2;

        scatter_channel(ring, start, 1, &[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(ring.load(RING_CAPACITY - 2, 1), 1.0);
        assert_eq!(ring.load(RING_CAPACITY - 1, 1), 2.0);
        assert_eq!(ring.load(0, 1), 3.0);
        assert_eq!(ring.load(1, 1), 4.0);
        // Left lane untouched.
        assert_eq!(ring.load(0, 0), 0.0);
    }

    #[test]
    fn test_gather_then_clear() {
        let channel = SharedChannel::in_process();
        let ring = channel.up(1);
        ring.store(10, 0, 0.5);
        ring.store(11, 0, -0.5);

        let mut out = [9.0f32; 2];
        gather_channel(ring, 10, 0, &mut out);
        assert_eq!(out, [0.5, -0.5]);

        clear_frames(ring, 10, 2);
        gather_channel(ring, 10, 0, &mut out);
        assert_eq!(out, [0.0, 0.0]);
    }
}
