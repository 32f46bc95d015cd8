// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;
use crate::shm::RING_CAPACITY;

/// Upper bound on virtual MIDI ports per direction.
pub const MAX_MIDI_PORTS: usize = 256;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 384_000;

/// Numeric id of a shared memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(u32);

impl SegmentId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// POSIX shared memory object name for this segment.
    pub fn shm_name(&self) -> String {
        format!("/framebridge.{}", self.0)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Frames between two synchronization heartbeats.
/// Must be a power of two, divide the ring capacity, and fit twice in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FramesPerBuffer(u32);

impl FramesPerBuffer {
    pub fn new(frames: u32) -> Result<Self, HardValidationError> {
        let invalid = |reason: String| HardValidationError::InvalidFieldValue {
            field: "frames_per_buffer",
            value: frames.to_string(),
            reason,
        };

        if frames == 0 || !frames.is_power_of_two() {
            return Err(invalid("must be a non-zero power of two".to_string()));
        }
        if frames as usize > RING_CAPACITY / 2 {
            return Err(invalid(format!(
                "must be at most half the ring capacity ({} frames)",
                RING_CAPACITY / 2
            )));
        }
        Ok(Self(frames))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }
}

impl Default for FramesPerBuffer {
    fn default() -> Self {
        Self(512)
    }
}

impl TryFrom<u32> for FramesPerBuffer {
    type Error = HardValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FramesPerBuffer> for u32 {
    fn from(frames: FramesPerBuffer) -> Self {
        frames.0
    }
}

/// Validated audio sample rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SampleRate(u32);

impl SampleRate {
    pub fn new(hz: u32) -> Result<Self, HardValidationError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&hz) {
            return Err(HardValidationError::InvalidFieldValue {
                field: "sample_rate",
                value: hz.to_string(),
                reason: format!("must be between {} and {}", MIN_SAMPLE_RATE, MAX_SAMPLE_RATE),
            });
        }
        Ok(Self(hz))
    }

    pub fn hz(&self) -> u32 {
        self.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self(48_000)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = HardValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.0
    }
}

/// Heartbeats between two free-running status records. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct StatusInterval(u64);

impl StatusInterval {
    pub fn new(heartbeats: u64) -> Result<Self, HardValidationError> {
        if heartbeats == 0 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "status_interval",
                value: heartbeats.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Self(heartbeats))
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// True on the first heartbeat of every interval.
    pub fn is_due(&self, count: u64) -> bool {
        count % self.0 == 0
    }
}

impl Default for StatusInterval {
    fn default() -> Self {
        Self(100)
    }
}

impl TryFrom<u64> for StatusInterval {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatusInterval> for u64 {
    fn from(interval: StatusInterval) -> Self {
        interval.0
    }
}

/// Number of MIDI relay ports for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortCount {
    /// Match the number of system raw-MIDI ports the host reports.
    #[default]
    Auto,
    Fixed(usize),
}

impl PortCount {
    /// Negative values mean auto-discover, as on the command line.
    pub fn from_signed(
        direction: &'static str,
        count: i64,
    ) -> Result<Self, HardValidationError> {
        if count < 0 {
            return Ok(Self::Auto);
        }
        let count = count as usize;
        if count > MAX_MIDI_PORTS {
            return Err(HardValidationError::TooManyMidiPorts {
                direction,
                count,
                max: MAX_MIDI_PORTS,
            });
        }
        Ok(Self::Fixed(count))
    }

    /// Explicit counts are used verbatim, `Auto` takes the discovered count.
    pub fn resolve(&self, discovered: impl FnOnce() -> usize) -> usize {
        match self {
            Self::Fixed(n) => *n,
            Self::Auto => discovered().min(MAX_MIDI_PORTS),
        }
    }
}

impl fmt::Display for PortCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_per_buffer_valid() {
        assert!(FramesPerBuffer::new(64).is_ok());
        assert!(FramesPerBuffer::new(512).is_ok());
        assert!(FramesPerBuffer::new((RING_CAPACITY / 2) as u32).is_ok());
    }

    #[test]
    fn test_frames_per_buffer_invalid() {
        assert!(FramesPerBuffer::new(0).is_err());
        assert!(FramesPerBuffer::new(300).is_err());
        assert!(FramesPerBuffer::new(RING_CAPACITY as u32).is_err());
    }

    #[test]
    fn test_sample_rate_bounds() {
        assert!(SampleRate::new(44_100).is_ok());
        assert!(SampleRate::new(0).is_err());
        assert!(SampleRate::new(1_000_000).is_err());
    }

    #[test]
    fn test_status_interval_rejects_zero() {
        assert!(StatusInterval::new(0).is_err());
        assert!(StatusInterval::try_from(0u64).is_err());

        let every_third = StatusInterval::new(3).unwrap();
        let due: Vec<u64> = (0..7).filter(|&n| every_third.is_due(n)).collect();
        assert_eq!(due, vec![0, 3, 6]);
        assert_eq!(StatusInterval::default().get(), 100);
    }

    #[test]
    fn test_port_count_from_signed() {
        assert_eq!(PortCount::from_signed("inputs", -1).unwrap(), PortCount::Auto);
        assert_eq!(
            PortCount::from_signed("inputs", 0).unwrap(),
            PortCount::Fixed(0)
        );
        assert!(PortCount::from_signed("inputs", 257).is_err());
    }

    #[test]
    fn test_port_count_resolve() {
        assert_eq!(PortCount::Fixed(3).resolve(|| 8), 3);
        assert_eq!(PortCount::Auto.resolve(|| 8), 8);
        assert_eq!(PortCount::Fixed(0).resolve(|| 8), 0);
    }

    #[test]
    fn test_segment_shm_name() {
        assert_eq!(SegmentId::new(0).shm_name(), "/framebridge.0");
    }
}
