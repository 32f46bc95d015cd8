// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame clock synchronization with the consumer process.
//!
//! The handshake record (epoch host time, timestamp index, sync flag, seed)
//! is published under a sequence counter: the writer makes it odd, stores
//! the payload, then makes it even with `Release`. Readers retry until they
//! see the same even sequence before and after reading the payload, so they
//! never observe a torn record or a new seed next to a stale index.

use std::sync::atomic::{fence, Ordering};

use crate::shm::ControlBlock;
use crate::types::FramesPerBuffer;

/// Attempts before a reader gives up on a record that keeps changing.
const MAX_READ_RETRIES: usize = 64;

/// Consistent copy of the handshake record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeSnapshot {
    pub zero_host_time: u64,
    pub timestamp_index: u64,
    pub sync_mode: bool,
    pub seed: u32,
}

/// Sequence-guarded view of the handshake fields in the control block.
///
/// Only the block driver writes; any number of readers may poll.
#[derive(Clone, Copy)]
pub struct HandshakeRecord<'a> {
    control: &'a ControlBlock,
}

impl<'a> HandshakeRecord<'a> {
    pub fn new(control: &'a ControlBlock) -> Self {
        Self { control }
    }

    fn write(&self, update: impl FnOnce(&ControlBlock)) {
        let seq = self.control.handshake_seq.load(Ordering::Relaxed);
        self.control
            .handshake_seq
            .store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        update(self.control);

        self.control
            .handshake_seq
            .store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Start a new epoch: raise the sync flag, rewind the timestamp index
    /// and bump the seed so the consumer resets its own epoch.
    pub fn begin_epoch(&self) -> u32 {
        let seed = self.control.seed.load(Ordering::Relaxed).wrapping_add(1);
        self.write(|control| {
            control.sync_mode.store(1, Ordering::Relaxed);
            control.timestamp_count.store(0, Ordering::Relaxed);
            control.seed.store(seed, Ordering::Relaxed);
        });
        seed
    }

    /// Heartbeat: block boundary `timestamp_index` happened at `host_time`.
    pub fn publish(&self, host_time: u64, timestamp_index: u64) {
        self.write(|control| {
            control.zero_host_time.store(host_time, Ordering::Relaxed);
            control
                .timestamp_count
                .store(timestamp_index, Ordering::Relaxed);
        });
    }

    /// Read a consistent snapshot, or `None` if the writer kept interfering.
    pub fn read(&self) -> Option<HandshakeSnapshot> {
        for _ in 0..MAX_READ_RETRIES {
            let before = self.control.handshake_seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }

            let snapshot = HandshakeSnapshot {
                zero_host_time: self.control.zero_host_time.load(Ordering::Relaxed),
                timestamp_index: self.control.timestamp_count.load(Ordering::Relaxed),
                sync_mode: self.control.sync_mode.load(Ordering::Relaxed) == 1,
                seed: self.control.seed.load(Ordering::Relaxed),
            };

            fence(Ordering::Acquire);
            let after = self.control.handshake_seq.load(Ordering::Relaxed);
            if before == after {
                return Some(snapshot);
            }
        }
        None
    }
}

/// Result of a heartbeat at a buffer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub host_time: u64,
    pub timestamp_index: u64,
    /// False when sync mode is off and the record was left untouched.
    pub published: bool,
}

/// Drives the handshake record from the block driver's frame counter.
#[derive(Debug)]
pub struct FrameClock {
    frames_per_buffer: FramesPerBuffer,
    sync_mode: bool,
    last_index: Option<u64>,
}

impl FrameClock {
    pub fn new(frames_per_buffer: FramesPerBuffer, sync_mode: bool) -> Self {
        Self {
            frames_per_buffer,
            sync_mode,
            last_index: None,
        }
    }

    pub fn sync_mode(&self) -> bool {
        self.sync_mode
    }

    /// Construction-time control scalars: heartbeat period, sync flag down.
    pub fn install(&self, control: &ControlBlock) {
        control.set_buffer_size(self.frames_per_buffer.value());
        control.set_sync_mode(false);
    }

    /// Activation transition. Returns the new seed when sync mode is on.
    pub fn activate(&mut self, control: &ControlBlock) -> Option<u32> {
        self.last_index = None;
        if !self.sync_mode {
            return None;
        }
        Some(HandshakeRecord::new(control).begin_epoch())
    }

    /// Publish the epoch time when `frame_number` sits on a buffer boundary.
    pub fn heartbeat(
        &mut self,
        control: &ControlBlock,
        frame_number: u64,
        now: u64,
    ) -> Option<Heartbeat> {
        let period = self.frames_per_buffer.as_u64();
        if frame_number % period != 0 {
            return None;
        }

        let timestamp_index = frame_number / period;
        // Same boundary again: the frame counter did not move.
        if self.last_index == Some(timestamp_index) {
            return None;
        }
        debug_assert!(self.last_index.map_or(true, |last| timestamp_index > last));
        self.last_index = Some(timestamp_index);

        let published = control.sync_mode();
        if published {
            HandshakeRecord::new(control).publish(now, timestamp_index);
        }

        Some(Heartbeat {
            host_time: now,
            timestamp_index,
            published,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::SharedChannel;

    fn fpb(frames: u32) -> FramesPerBuffer {
        FramesPerBuffer::new(frames).unwrap()
    }

    #[test]
    fn test_install_writes_buffer_size() {
        let channel = SharedChannel::in_process();
        FrameClock::new(fpb(512), true).install(&channel.control);
        assert_eq!(channel.control.buffer_size(), 512);
        assert!(!channel.control.sync_mode());
    }

    #[test]
    fn test_activation_bumps_seed_once() {
        let channel = SharedChannel::in_process();
        let record = HandshakeRecord::new(&channel.control);
        let mut clock = FrameClock::new(fpb(512), true);

        assert_eq!(clock.activate(&channel.control), Some(1));
        let snap = record.read().unwrap();
        assert_eq!(snap.seed, 1);
        assert!(snap.sync_mode);
        assert_eq!(snap.timestamp_index, 0);

        assert_eq!(clock.activate(&channel.control), Some(2));
        assert_eq!(record.read().unwrap().seed, 2);
    }

    #[test]
    fn test_free_running_leaves_record_alone() {
        let channel = SharedChannel::in_process();
        let mut clock = FrameClock::new(fpb(512), false);
        clock.install(&channel.control);

        assert_eq!(clock.activate(&channel.control), None);
        let beat = clock.heartbeat(&channel.control, 0, 1234).unwrap();
        assert!(!beat.published);

        let snap = HandshakeRecord::new(&channel.control).read().unwrap();
        assert_eq!(snap.seed, 0);
        assert_eq!(snap.zero_host_time, 0);
    }

    #[test]
    fn test_heartbeat_only_on_boundaries() {
        let channel = SharedChannel::in_process();
        let mut clock = FrameClock::new(fpb(512), true);
        clock.activate(&channel.control);

        assert!(clock.heartbeat(&channel.control, 256, 10).is_none());
        let beat = clock.heartbeat(&channel.control, 1024, 20).unwrap();
        assert_eq!(beat.timestamp_index, 2);
        assert!(beat.published);

        let snap = HandshakeRecord::new(&channel.control).read().unwrap();
        assert_eq!(snap.zero_host_time, 20);
        assert_eq!(snap.timestamp_index, 2);
    }

    #[test]
    fn test_repeated_boundary_is_skipped() {
        let channel = SharedChannel::in_process();
        let mut clock = FrameClock::new(fpb(512), true);
        clock.activate(&channel.control);

        assert!(clock.heartbeat(&channel.control, 512, 10).is_some());
        assert!(clock.heartbeat(&channel.control, 512, 11).is_none());

        let snap = HandshakeRecord::new(&channel.control).read().unwrap();
        assert_eq!(snap.zero_host_time, 10);
        assert_eq!(snap.timestamp_index, 1);
    }

    #[test]
    fn test_reader_rejects_write_in_progress() {
        let channel = SharedChannel::in_process();
        channel.control.handshake_seq.store(3, Ordering::Release);
        assert!(HandshakeRecord::new(&channel.control).read().is_none());
    }

    #[test]
    fn test_concurrent_reader_never_sees_torn_record() {
        use std::sync::Arc;

        let channel = Arc::new(SharedChannel::in_process());
        let writer_channel = Arc::clone(&channel);

        // Writer keeps host_time == index * 7 so a torn read is detectable.
        let writer = std::thread::spawn(move || {
            let record = HandshakeRecord::new(&writer_channel.control);
            for index in 1..20_000u64 {
                record.publish(index * 7, index);
            }
        });

        let record = HandshakeRecord::new(&channel.control);
        let mut last = 0;
        while !writer.is_finished() {
            if let Some(snap) = record.read() {
                assert_eq!(snap.zero_host_time, snap.timestamp_index * 7);
                assert!(snap.timestamp_index >= last);
                last = snap.timestamp_index;
            }
        }
        writer.join().unwrap();
    }
}
