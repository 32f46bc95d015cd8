// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Timer-driven stand-in for an audio server.
//!
//! Drives a [`BlockProcessor`] from its own thread at the configured sample
//! rate with silent inputs. Outputs are discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use framebridge_core::host::{OwnedScope, PortDirection, PortDiscovery, PortNames};
use framebridge_core::{BlockProcessor, Control, SampleRate};

use super::HostError;

pub struct DummyHost {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// A dummy host has no system MIDI ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyDiscovery;

impl PortDiscovery for DummyDiscovery {
    fn system_midi_ports(&self, _direction: PortDirection) -> usize {
        0
    }
}

impl DummyHost {
    /// Register `ports` and start calling `processor` every block.
    pub fn start<P>(
        mut processor: P,
        ports: &PortNames,
        block_frames: usize,
        sample_rate: SampleRate,
    ) -> Result<Self, HostError>
    where
        P: BlockProcessor + 'static,
    {
        for name in ports
            .audio_in
            .iter()
            .chain(&ports.audio_out)
            .chain(&ports.event_in)
            .chain(&ports.event_out)
        {
            tracing::debug!(port = %name, "Registered port");
        }

        let period =
            Duration::from_secs_f64(block_frames as f64 / f64::from(sample_rate.hz()));
        let mut scope =
            OwnedScope::with_event_ports(block_frames, ports.event_in.len(), ports.event_out.len());

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let thread = std::thread::Builder::new()
            .name("framebridge-rt".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                while flag.load(Ordering::Acquire) {
                    if processor.process(&mut scope) == Control::Quit {
                        break;
                    }

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        std::thread::sleep(deadline - now);
                    } else {
                        // Fell behind; resynchronise instead of bursting.
                        deadline = now;
                    }
                }
            })
            .map_err(|source| HostError::Spawn { source })?;

        tracing::info!(
            block_frames,
            period_us = period.as_micros() as u64,
            "Dummy host started"
        );

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the block thread and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Dummy host thread panicked");
            }
        }
    }
}

impl Drop for DummyHost {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use framebridge_core::ProcessScope;

    use super::*;

    struct Counter {
        blocks: Arc<AtomicUsize>,
        quit_after: usize,
    }

    impl BlockProcessor for Counter {
        fn process(&mut self, scope: &mut dyn ProcessScope) -> Control {
            assert_eq!(scope.frames(), 64);
            let n = self.blocks.fetch_add(1, Ordering::AcqRel) + 1;
            if n >= self.quit_after {
                Control::Quit
            } else {
                Control::Continue
            }
        }
    }

    #[test]
    fn test_runs_until_quit() {
        let blocks = Arc::new(AtomicUsize::new(0));
        let counter = Counter {
            blocks: Arc::clone(&blocks),
            quit_after: 3,
        };
        let rate = SampleRate::new(96_000).unwrap();
        let mut host = DummyHost::start(counter, &PortNames::new(0, 0), 64, rate).unwrap();

        let give_up = Instant::now() + Duration::from_secs(5);
        while host.is_running() && Instant::now() < give_up {
            std::thread::sleep(Duration::from_millis(1));
        }
        host.stop();
        assert_eq!(blocks.load(Ordering::Acquire), 3);
    }

    #[test]
    fn test_no_system_ports() {
        assert_eq!(DummyDiscovery.system_midi_ports(PortDirection::Capture), 0);
        assert_eq!(DummyDiscovery.system_midi_ports(PortDirection::Playback), 0);
    }
}
