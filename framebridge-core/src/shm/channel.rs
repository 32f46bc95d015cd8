// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Typed view over the bridge segment.

use std::alloc::{self, Layout};
use std::ops::Deref;
use std::ptr::NonNull;

use crate::error::SharedMemoryError;
use crate::shm::layout::ChannelLayout;
use crate::shm::region::SharedMemoryRegion;
use crate::types::SegmentId;

enum Backing {
    Mapped(SharedMemoryRegion),
    Heap,
}

/// Owns the memory behind a [`ChannelLayout`] and derefs to it.
///
/// Either a mapped POSIX segment shared with the consumer process, or a
/// zeroed heap allocation for in-process use (tests, benches, dummy runs).
pub struct SharedChannel {
    layout: NonNull<ChannelLayout>,
    backing: Backing,
}

// SAFETY: ChannelLayout is made only of atomics and the backing memory lives
// as long as the SharedChannel.
unsafe impl Send for SharedChannel {}
unsafe impl Sync for SharedChannel {}

impl SharedChannel {
    /// Attach the segment identified by `id`, creating it if needed.
    pub fn attach(id: SegmentId) -> Result<Self, SharedMemoryError> {
        let region = SharedMemoryRegion::open_or_create(id, ChannelLayout::SIZE)?;

        if region.as_ptr() as usize % std::mem::align_of::<ChannelLayout>() != 0 {
            return Err(SharedMemoryError::MapFailed {
                reason: "mapping is not aligned for the channel layout".to_string(),
            });
        }

        let layout = NonNull::new(region.as_ptr() as *mut ChannelLayout).ok_or_else(|| {
            SharedMemoryError::MapFailed {
                reason: "null mapping".to_string(),
            }
        })?;

        Ok(Self {
            layout,
            backing: Backing::Mapped(region),
        })
    }

    /// A private, zeroed layout in this process.
    pub fn in_process() -> Self {
        let mem_layout = Layout::new::<ChannelLayout>();
        // SAFETY: ChannelLayout has non-zero size; all-zero bytes are a valid
        // value for a struct of atomics.
        let ptr = unsafe { alloc::alloc_zeroed(mem_layout) } as *mut ChannelLayout;
        let Some(layout) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(mem_layout);
        };

        Self {
            layout,
            backing: Backing::Heap,
        }
    }

    /// Segment id when backed by shared memory.
    pub fn segment_id(&self) -> Option<SegmentId> {
        match &self.backing {
            Backing::Mapped(region) => Some(region.id()),
            Backing::Heap => None,
        }
    }
}

impl Deref for SharedChannel {
    type Target = ChannelLayout;

    fn deref(&self) -> &ChannelLayout {
        // SAFETY: layout points to live memory of the right size and alignment
        unsafe { self.layout.as_ref() }
    }
}

impl Drop for SharedChannel {
    fn drop(&mut self) {
        if let Backing::Heap = self.backing {
            // SAFETY: allocated in in_process with the same layout
            unsafe {
                alloc::dealloc(
                    self.layout.as_ptr() as *mut u8,
                    Layout::new::<ChannelLayout>(),
                )
            };
        }
        // Mapped regions unmap themselves.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shm::DriverStatus;

    #[test]
    fn test_in_process_starts_idle() {
        let channel = SharedChannel::in_process();
        assert_eq!(channel.control.driver_status(), DriverStatus::NotStarted);
        assert_eq!(channel.up(0).load(0, 0), 0.0);
        assert!(channel.segment_id().is_none());
    }

    #[test]
    fn test_attach_is_visible_to_second_view() {
        let id = SegmentId::new(std::process::id().wrapping_mul(16).wrapping_add(9));
        let producer = SharedChannel::attach(id).unwrap();
        let consumer = SharedChannel::attach(id).unwrap();

        consumer.control.set_driver_status(DriverStatus::Started);
        assert_eq!(producer.control.driver_status(), DriverStatus::Started);

        producer.down(1).store(7, 1, 0.25);
        assert_eq!(consumer.down(1).load(7, 1), 0.25);
        assert_eq!(producer.segment_id(), Some(id));
    }
}
