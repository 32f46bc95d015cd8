// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Block driver: the real-time entry point, called once per host block.
//!
//! Lifecycle: Inactive → Activating → Active. Activation happens on the
//! first block after the consumer publishes `DriverStatus::Started`; there
//! is no way back to Inactive short of a restart. While the consumer is not
//! started every output port gets silence and the rings are left alone.
//!
//! Nothing on this path allocates, blocks or logs. Anomalies become
//! [`Diagnostic`] records and the block always completes.

use std::sync::Arc;

use crate::clock::{ticks_per_frame, Clock};
use crate::config::BridgeConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::drift::DriftMonitor;
use crate::host::{Control, ProcessScope};
use crate::shm::ring::{clear_frames, gather_channel, scatter_channel};
use crate::shm::{
    DriverStatus, SharedChannel, CHANNELS_PER_STREAM, NUM_INPUT_STREAMS, NUM_OUTPUT_CHANNELS,
    NUM_OUTPUT_STREAMS,
};
use crate::sync::{FrameClock, HandshakeRecord};
use crate::types::StatusInterval;

/// Activation state of the block driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Inactive,
    Activating,
    Active,
}

impl DriverState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Activating => "Activating",
            Self::Active => "Active",
        }
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub struct BlockDriver<C: Clock> {
    channel: Arc<SharedChannel>,
    clock: C,
    state: DriverState,
    /// Frames processed since the last activation.
    frame_number: u64,
    /// Free-running status counter, reset on activation.
    ncalls: u64,
    frame_clock: FrameClock,
    drift: DriftMonitor,
    verbose: bool,
    status_interval: StatusInterval,
}

impl<C: Clock> BlockDriver<C> {
    pub fn new(config: &BridgeConfig, channel: Arc<SharedChannel>, clock: C) -> Self {
        let frame_clock = FrameClock::new(config.frames_per_buffer, config.sync_mode);
        frame_clock.install(&channel.control);

        let drift = DriftMonitor::new(ticks_per_frame(
            clock.ticks_per_second(),
            config.sample_rate.hz(),
        ));

        Self {
            channel,
            clock,
            state: DriverState::Inactive,
            frame_number: 0,
            ncalls: 0,
            frame_clock,
            drift,
            verbose: config.verbose,
            status_interval: config.status_interval,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn is_drift_latched(&self) -> bool {
        self.drift.is_latched()
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn channel(&self) -> &Arc<SharedChannel> {
        &self.channel
    }

    fn activate(&mut self, diagnostics: &mut DiagnosticSink) {
        self.state = DriverState::Activating;
        self.ncalls = 0;
        self.frame_number = 0;

        let seed = self.frame_clock.activate(&self.channel.control);
        let zero_host_time = HandshakeRecord::new(&self.channel.control)
            .read()
            .map_or(0, |snapshot| snapshot.zero_host_time);

        self.state = DriverState::Active;
        diagnostics.emit(Diagnostic::Activated {
            sync_mode: self.frame_clock.sync_mode(),
            seed,
            zero_host_time,
        });
    }

    /// Run one block. Always returns `Control::Continue`.
    pub fn process(
        &mut self,
        scope: &mut dyn ProcessScope,
        diagnostics: &mut DiagnosticSink,
    ) -> Control {
        let frames = scope.frames();
        let control = &self.channel.control;

        if control.driver_status() != DriverStatus::Started {
            for channel in 0..NUM_OUTPUT_CHANNELS {
                scope.audio_output(channel).fill(0.0);
            }
            return Control::Continue;
        }

        // Nothing to move and the frame clock would not advance.
        if frames == 0 {
            return Control::Continue;
        }

        let consumer_frame = control.consumer_write_frame(0);
        if let Some(warning) =
            self.drift
                .check(self.frame_number, consumer_frame, self.clock.now(), frames)
        {
            diagnostics.emit(Diagnostic::Drift(warning));
        }

        if self.state != DriverState::Active {
            self.activate(diagnostics);
        }

        let control = &self.channel.control;
        if let Some(beat) = self
            .frame_clock
            .heartbeat(control, self.frame_number, self.clock.now())
        {
            if !self.frame_clock.sync_mode() && self.verbose {
                if self.status_interval.is_due(self.ncalls) {
                    diagnostics.emit(Diagnostic::Heartbeat {
                        frame: self.frame_number,
                        host_time: beat.host_time,
                        timestamp_index: beat.timestamp_index,
                    });
                }
                self.ncalls += 1;
            }
        }

        let start = self.frame_number as i64;
        for stream in 0..NUM_INPUT_STREAMS {
            let ring = self.channel.down(stream);
            for lane in 0..CHANNELS_PER_STREAM {
                let input = scope.audio_input(stream * CHANNELS_PER_STREAM + lane);
                let len = frames.min(input.len());
                scatter_channel(ring, start, lane, &input[..len]);
            }
        }

        // One block behind the scatter offset to give the consumer headroom.
        let lagged = start - frames as i64;
        for stream in 0..NUM_OUTPUT_STREAMS {
            let ring = self.channel.up(stream);
            for lane in 0..CHANNELS_PER_STREAM {
                let output = scope.audio_output(stream * CHANNELS_PER_STREAM + lane);
                let len = frames.min(output.len());
                gather_channel(ring, lagged, lane, &mut output[..len]);
            }
            clear_frames(ring, lagged, frames);
        }

        self.frame_number += frames as u64;
        Control::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::diagnostics;
    use crate::host::OwnedScope;
    use crate::shm::{NUM_INPUT_CHANNELS, RING_CAPACITY};

    const BLOCK: usize = 256;

    fn driver(config: &BridgeConfig) -> (BlockDriver<Arc<ManualClock>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(config.sample_rate.hz() as f64));
        let channel = Arc::new(SharedChannel::in_process());
        (
            BlockDriver::new(config, channel, Arc::clone(&clock)),
            clock,
        )
    }

    #[test]
    fn test_idle_outputs_silence_and_stays_inactive() {
        let config = BridgeConfig::default();
        let (mut driver, _clock) = driver(&config);
        let (mut sink, mut drain) = diagnostics::channel("test", 16);
        let mut scope = OwnedScope::new(BLOCK);

        for channel in 0..NUM_INPUT_CHANNELS {
            scope.input_mut(channel).fill(0.5);
        }
        // Leftovers from a previous block must be overwritten.
        for channel in 0..NUM_OUTPUT_CHANNELS {
            scope.audio_output(channel).fill(1.0);
        }
        driver.channel().up(0).store(0, 0, 0.9);

        assert_eq!(driver.process(&mut scope, &mut sink), Control::Continue);

        for channel in 0..NUM_OUTPUT_CHANNELS {
            assert!(scope.output(channel).iter().all(|&s| s == 0.0));
        }
        assert_eq!(driver.state(), DriverState::Inactive);
        assert_eq!(driver.frame_number(), 0);
        // Rings untouched while idle.
        assert_eq!(driver.channel().down(0).load(0, 0), 0.0);
        assert_eq!(driver.channel().up(0).load(0, 0), 0.9);
        assert!(drain.pop().is_none());
    }

    #[test]
    fn test_activation_resets_frame_number() {
        let config = BridgeConfig::default();
        let (mut driver, _clock) = driver(&config);
        let (mut sink, mut drain) = diagnostics::channel("test", 16);
        let mut scope = OwnedScope::new(BLOCK);

        driver.frame_number = 12_345;
        driver
            .channel()
            .control
            .set_driver_status(DriverStatus::Started);
        driver.process(&mut scope, &mut sink);

        assert_eq!(driver.state(), DriverState::Active);
        assert_eq!(driver.frame_number(), BLOCK as u64);

        let activated = std::iter::from_fn(|| drain.pop())
            .find(|d| matches!(d, Diagnostic::Activated { .. }));
        assert_eq!(
            activated,
            Some(Diagnostic::Activated {
                sync_mode: true,
                seed: Some(1),
                zero_host_time: 0,
            })
        );
    }

    #[test]
    fn test_free_running_status_is_rate_limited() {
        let config = BridgeConfig {
            sync_mode: false,
            verbose: true,
            status_interval: StatusInterval::new(4).unwrap(),
            ..BridgeConfig::default()
        };
        let (mut driver, clock) = driver(&config);
        let (mut sink, mut drain) = diagnostics::channel("test", 64);
        let mut scope = OwnedScope::new(512);
        driver
            .channel()
            .control
            .set_driver_status(DriverStatus::Started);

        // 512-frame blocks hit a boundary every block.
        for _ in 0..8 {
            clock.advance(512);
            driver.process(&mut scope, &mut sink);
        }

        let heartbeats: Vec<u64> = std::iter::from_fn(|| drain.pop())
            .filter_map(|d| match d {
                Diagnostic::Heartbeat { timestamp_index, .. } => Some(timestamp_index),
                _ => None,
            })
            .collect();
        assert_eq!(heartbeats, vec![0, 4]);
        assert!(!driver.channel().control.sync_mode());
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let config = BridgeConfig {
            sync_mode: false,
            verbose: true,
            status_interval: StatusInterval::new(1).unwrap(),
            ..BridgeConfig::default()
        };
        let (mut driver, clock) = driver(&config);
        let (mut sink, mut drain) = diagnostics::channel("test", 16);
        let mut empty = OwnedScope::new(0);
        driver
            .channel()
            .control
            .set_driver_status(DriverStatus::Started);

        for _ in 0..3 {
            clock.advance(BLOCK as u64);
            assert_eq!(driver.process(&mut empty, &mut sink), Control::Continue);
        }
        assert_eq!(driver.frame_number(), 0);
        assert!(!driver.is_drift_latched());
        assert!(drain.pop().is_none());

        // A real block afterwards activates normally.
        let mut scope = OwnedScope::new(BLOCK);
        driver.process(&mut scope, &mut sink);
        assert_eq!(driver.state(), DriverState::Active);
        assert_eq!(driver.frame_number(), BLOCK as u64);
    }

    #[test]
    fn test_consumer_running_ahead_raises_one_warning() {
        let config = BridgeConfig::default();
        let (mut driver, clock) = driver(&config);
        let (mut sink, mut drain) = diagnostics::channel("test", 64);
        let mut scope = OwnedScope::new(BLOCK);
        let control = &driver.channel().control;
        control.set_driver_status(DriverStatus::Started);
        control.set_consumer_write_frame(0, RING_CAPACITY as u64);

        for _ in 0..4 {
            clock.advance(BLOCK as u64);
            driver.process(&mut scope, &mut sink);
        }

        let drift = std::iter::from_fn(|| drain.pop())
            .filter(|d| matches!(d, Diagnostic::Drift(_)))
            .count();
        assert_eq!(drift, 1);
        assert!(driver.is_drift_latched());
    }
}
