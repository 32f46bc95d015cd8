// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Narrow interface to the host audio server.
//!
//! The host owns the real-time thread and the port buffers. It registers one
//! callback that hands a [`ProcessScope`] to a [`BlockProcessor`] once per
//! block; nothing else about the host API leaks into the bridge.

use smallvec::SmallVec;

use crate::shm::{NUM_INPUT_CHANNELS, NUM_OUTPUT_CHANNELS};

/// What the host should do after a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Per-block access to the host's port buffers.
///
/// Audio slices are `frames()` long. MIDI methods default to a host with no
/// event ports.
pub trait ProcessScope {
    fn frames(&self) -> usize;

    fn audio_input(&self, channel: usize) -> &[f32];

    fn audio_output(&mut self, channel: usize) -> &mut [f32];

    /// Events queued on host capture port `port` this block.
    fn capture_event_count(&self, _port: usize) -> usize {
        0
    }

    /// Raw bytes of capture event `index`, in arrival order.
    fn capture_event(&self, _port: usize, _index: usize) -> &[u8] {
        &[]
    }

    fn clear_playback(&mut self, _port: usize) {}

    /// Write one event into a playback port at `time` frames into the block.
    /// Returns false when the host buffer has no room.
    fn write_playback(&mut self, _port: usize, _time: u32, _message: &[u8]) -> bool {
        false
    }
}

/// "Process one block of F frames."
pub trait BlockProcessor: Send {
    fn process(&mut self, scope: &mut dyn ProcessScope) -> Control;
}

/// Direction of a system MIDI port, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// Physical sources the host captures from.
    Capture,
    /// Physical sinks the host plays back to.
    Playback,
}

/// Host query for existing raw-MIDI system ports.
///
/// Called at construction only; implementations may block.
pub trait PortDiscovery {
    fn system_midi_ports(&self, direction: PortDirection) -> usize;
}

/// Owned names of every port the bridge registers with the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNames {
    pub audio_in: Vec<String>,
    pub audio_out: Vec<String>,
    /// Host ports feeding the virtual outputs.
    pub event_in: Vec<String>,
    /// Host ports fed by the virtual inputs.
    pub event_out: Vec<String>,
}

impl PortNames {
    pub fn new(virtual_outputs: usize, virtual_inputs: usize) -> Self {
        let numbered = |prefix: &str, count: usize| -> Vec<String> {
            (1..=count).map(|n| format!("{}_{}", prefix, n)).collect()
        };

        Self {
            audio_in: numbered("input", NUM_INPUT_CHANNELS),
            audio_out: numbered("output", NUM_OUTPUT_CHANNELS),
            event_in: numbered("event_in", virtual_outputs),
            event_out: numbered("event_out", virtual_inputs),
        }
    }
}

/// Name of the `n`-th (0-based) virtual MIDI port of a client.
pub fn virtual_port_name(client_name: &str, n: usize) -> String {
    format!("{} {}", client_name, n + 1)
}

/// Host-side MIDI playback buffer with a fixed byte budget.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    capacity: usize,
    used: usize,
    events: Vec<(u32, SmallVec<[u8; 16]>)>,
}

impl EventBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            used: 0,
            events: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.used = 0;
        self.events.clear();
    }

    pub fn write(&mut self, time: u32, message: &[u8]) -> bool {
        if self.used + message.len() > self.capacity {
            return false;
        }
        self.used += message.len();
        self.events.push((time, SmallVec::from_slice(message)));
        true
    }

    pub fn events(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.events.iter().map(|(time, bytes)| (*time, bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// A [`ProcessScope`] over buffers it owns.
///
/// Used by the dummy host, the benches and the tests.
#[derive(Debug, Clone)]
pub struct OwnedScope {
    frames: usize,
    inputs: Vec<Vec<f32>>,
    outputs: Vec<Vec<f32>>,
    captures: Vec<Vec<Vec<u8>>>,
    playbacks: Vec<EventBuffer>,
}

/// Playback buffer budget per port, in bytes.
pub const DEFAULT_EVENT_BUFFER_BYTES: usize = 4096;

impl OwnedScope {
    pub fn new(frames: usize) -> Self {
        Self::with_event_ports(frames, 0, 0)
    }

    pub fn with_event_ports(frames: usize, capture_ports: usize, playback_ports: usize) -> Self {
        Self {
            frames,
            inputs: vec![vec![0.0; frames]; NUM_INPUT_CHANNELS],
            outputs: vec![vec![0.0; frames]; NUM_OUTPUT_CHANNELS],
            captures: vec![Vec::new(); capture_ports],
            playbacks: vec![EventBuffer::with_capacity(DEFAULT_EVENT_BUFFER_BYTES); playback_ports],
        }
    }

    pub fn input_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.inputs[channel]
    }

    pub fn output(&self, channel: usize) -> &[f32] {
        &self.outputs[channel]
    }

    /// Replace the events queued on a capture port.
    pub fn set_capture_events(&mut self, port: usize, events: Vec<Vec<u8>>) {
        self.captures[port] = events;
    }

    pub fn playback(&self, port: usize) -> &EventBuffer {
        &self.playbacks[port]
    }

    pub fn playback_mut(&mut self, port: usize) -> &mut EventBuffer {
        &mut self.playbacks[port]
    }
}

impl ProcessScope for OwnedScope {
    fn frames(&self) -> usize {
        self.frames
    }

    fn audio_input(&self, channel: usize) -> &[f32] {
        &self.inputs[channel]
    }

    fn audio_output(&mut self, channel: usize) -> &mut [f32] {
        &mut self.outputs[channel]
    }

    fn capture_event_count(&self, port: usize) -> usize {
        self.captures.get(port).map_or(0, Vec::len)
    }

    fn capture_event(&self, port: usize, index: usize) -> &[u8] {
        &self.captures[port][index]
    }

    fn clear_playback(&mut self, port: usize) {
        if let Some(buffer) = self.playbacks.get_mut(port) {
            buffer.clear();
        }
    }

    fn write_playback(&mut self, port: usize, time: u32, message: &[u8]) -> bool {
        self.playbacks
            .get_mut(port)
            .is_some_and(|buffer| buffer.write(time, message))
    }
}
