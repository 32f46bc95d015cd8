// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared memory transport.
//!
//! Layout of the segment shared with the consumer process, the POSIX
//! mapping behind it, and the ring offset arithmetic for block transport.

mod channel;
mod layout;
mod region;
pub mod ring;

pub use channel::SharedChannel;
pub use layout::{
    ChannelLayout, ControlBlock, DriverStatus, SampleRing, CHANNELS_PER_STREAM,
    NUM_INPUT_CHANNELS, NUM_INPUT_STREAMS, NUM_OUTPUT_CHANNELS, NUM_OUTPUT_STREAMS,
    RING_CAPACITY,
};
pub use region::SharedMemoryRegion;
