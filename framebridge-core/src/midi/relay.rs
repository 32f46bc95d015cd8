// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-block MIDI relay between host ports and virtual ports.
//!
//! Two independent fan-outs, each port bound 1:1:
//! host capture port `n` → virtual output `n`, and
//! virtual input `n` → host playback port `n`.

use smallvec::SmallVec;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::RelayError;
use crate::host::{PortDirection, PortDiscovery, ProcessScope};
use crate::types::PortCount;

/// Raw MIDI message bytes; short messages stay inline.
pub type MidiBytes = SmallVec<[u8; 16]>;

/// Externally visible port the bridge sends host events to.
pub trait VirtualOutput: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), RelayError>;
}

/// Externally visible port the bridge pulls events from.
///
/// `next_message` must not block: it is polled on the real-time thread.
pub trait VirtualInput: Send {
    fn next_message(&mut self) -> Option<MidiBytes>;
}

/// Number of virtual outputs and inputs to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPorts {
    pub outputs: usize,
    pub inputs: usize,
}

impl RelayPorts {
    /// Resolve requested counts, asking the host about `Auto` directions.
    ///
    /// Virtual outputs mirror system capture ports; virtual inputs mirror
    /// system playback ports.
    pub fn resolve(
        outputs: PortCount,
        inputs: PortCount,
        discovery: &dyn PortDiscovery,
    ) -> Self {
        Self {
            outputs: outputs.resolve(|| discovery.system_midi_ports(PortDirection::Capture)),
            inputs: inputs.resolve(|| discovery.system_midi_ports(PortDirection::Playback)),
        }
    }
}

pub struct MidiRelay {
    outputs: Vec<Box<dyn VirtualOutput>>,
    inputs: Vec<Box<dyn VirtualInput>>,
}

impl MidiRelay {
    pub fn new(outputs: Vec<Box<dyn VirtualOutput>>, inputs: Vec<Box<dyn VirtualInput>>) -> Self {
        Self { outputs, inputs }
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Pump both directions for one block.
    pub fn process(&mut self, scope: &mut dyn ProcessScope, diagnostics: &mut DiagnosticSink) {
        for (port, output) in self.outputs.iter_mut().enumerate() {
            for index in 0..scope.capture_event_count(port) {
                let message = scope.capture_event(port, index);
                if message.is_empty() {
                    continue;
                }
                if output.send(message).is_err() {
                    diagnostics.emit(Diagnostic::VirtualSendFailed {
                        port,
                        len: message.len(),
                    });
                }
            }
        }

        for (port, input) in self.inputs.iter_mut().enumerate() {
            scope.clear_playback(port);
            while let Some(message) = input.next_message() {
                if message.is_empty() {
                    continue;
                }
                if !scope.write_playback(port, 0, &message) {
                    diagnostics.emit(Diagnostic::EventBufferFull {
                        port,
                        len: message.len(),
                    });
                }
            }
        }
    }
}
