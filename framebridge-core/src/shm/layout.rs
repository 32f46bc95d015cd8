// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Logical layout of the bridge segment.
//!
//! A control header followed by the down (host → consumer) and up
//! (consumer → host) ring buffers. Every field is an atomic so both
//! processes can hold shared references to the same bytes; an all-zero
//! segment is a valid, idle layout.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Ring length in frames. Shared with the consumer at build time.
pub const RING_CAPACITY: usize = 4096;

/// Stereo streams flowing host → consumer.
pub const NUM_INPUT_STREAMS: usize = 2;

/// Stereo streams flowing consumer → host.
pub const NUM_OUTPUT_STREAMS: usize = 2;

/// Interleaved channels per stream.
pub const CHANNELS_PER_STREAM: usize = 2;

pub const NUM_INPUT_CHANNELS: usize = NUM_INPUT_STREAMS * CHANNELS_PER_STREAM;
pub const NUM_OUTPUT_CHANNELS: usize = NUM_OUTPUT_STREAMS * CHANNELS_PER_STREAM;

/// Driver status published by the consumer side.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    NotStarted = 0,
    Started = 1,
    Stopped = 2,
}

impl DriverStatus {
    /// Unknown codes are treated as not started.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Started,
            2 => Self::Stopped,
            _ => Self::NotStarted,
        }
    }
}

/// Control scalars at the head of the segment.
///
/// Ordering: every cross-process write is `Release`, every read `Acquire`,
/// except the handshake payload which is guarded by `handshake_seq`
/// (see [`crate::sync::HandshakeRecord`]).
#[repr(C)]
pub struct ControlBlock {
    /// Heartbeat period in frames.
    pub(crate) buffer_size: AtomicU32,
    pub(crate) sync_mode: AtomicU32,
    pub(crate) driver_status: AtomicU32,
    /// Incremented once per activation.
    pub(crate) seed: AtomicU32,
    /// Odd while the handshake record is being written.
    pub(crate) handshake_seq: AtomicU64,
    pub(crate) zero_host_time: AtomicU64,
    pub(crate) timestamp_count: AtomicU64,
    /// Frames the consumer has written into each up ring.
    pub(crate) write_frame: [AtomicU64; NUM_OUTPUT_STREAMS],
    /// Frames the consumer has read from each down ring. Written by the
    /// consumer process only; kept so both sides agree on the layout.
    #[allow(dead_code)]
    pub(crate) read_frame: [AtomicU64; NUM_INPUT_STREAMS],
}

impl ControlBlock {
    pub fn driver_status(&self) -> DriverStatus {
        DriverStatus::from_code(self.driver_status.load(Ordering::Acquire))
    }

    pub fn set_driver_status(&self, status: DriverStatus) {
        self.driver_status.store(status as u32, Ordering::Release);
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size.load(Ordering::Acquire)
    }

    pub(crate) fn set_buffer_size(&self, frames: u32) {
        self.buffer_size.store(frames, Ordering::Release);
    }

    pub fn sync_mode(&self) -> bool {
        self.sync_mode.load(Ordering::Acquire) == 1
    }

    pub(crate) fn set_sync_mode(&self, enabled: bool) {
        self.sync_mode.store(enabled as u32, Ordering::Release);
    }

    /// Consumer's write progress on an up stream.
    pub fn consumer_write_frame(&self, stream: usize) -> u64 {
        self.write_frame[stream].load(Ordering::Acquire)
    }

    pub fn set_consumer_write_frame(&self, stream: usize, frame: u64) {
        self.write_frame[stream].store(frame, Ordering::Release);
    }
}

/// One stereo ring: `RING_CAPACITY` interleaved frames of `f32` bits.
///
/// Samples are accessed with `Relaxed`; visibility across processes comes
/// from the frame counters in [`ControlBlock`].
#[repr(C)]
pub struct SampleRing {
    samples: [AtomicU32; RING_CAPACITY * CHANNELS_PER_STREAM],
}

impl SampleRing {
    #[inline]
    fn slot(offset: usize, channel: usize) -> usize {
        offset * CHANNELS_PER_STREAM + channel
    }

    #[inline]
    pub fn load(&self, offset: usize, channel: usize) -> f32 {
        f32::from_bits(self.samples[Self::slot(offset, channel)].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, offset: usize, channel: usize, value: f32) {
        self.samples[Self::slot(offset, channel)].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Zero one frame on every channel.
    #[inline]
    pub fn clear_frame(&self, offset: usize) {
        for channel in 0..CHANNELS_PER_STREAM {
            self.samples[Self::slot(offset, channel)].store(0, Ordering::Relaxed);
        }
    }
}

/// The whole segment.
#[repr(C)]
pub struct ChannelLayout {
    pub control: ControlBlock,
    down: [SampleRing; NUM_INPUT_STREAMS],
    up: [SampleRing; NUM_OUTPUT_STREAMS],
}

impl ChannelLayout {
    /// Bytes the segment must span.
    pub const SIZE: usize = std::mem::size_of::<ChannelLayout>();

    /// Ring carrying host input to the consumer.
    pub fn down(&self, stream: usize) -> &SampleRing {
        &self.down[stream]
    }

    /// Ring carrying consumer output back to the host.
    pub fn up(&self, stream: usize) -> &SampleRing {
        &self.up[stream]
    }
}
