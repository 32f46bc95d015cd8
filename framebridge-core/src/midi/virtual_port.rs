// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Virtual MIDI ports backed by `midir`.
//!
//! Incoming messages arrive on midir's own thread; they are parked in a
//! bounded SPSC queue so the real-time poll never blocks.

use midir::os::unix::{VirtualInput as _, VirtualOutput as _};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::error::RelayError;
use crate::host::{virtual_port_name, PortDirection, PortDiscovery};
use crate::midi::relay::{MidiBytes, MidiRelay, RelayPorts, VirtualInput, VirtualOutput};

/// Messages buffered per virtual input between two blocks.
const INPUT_QUEUE_DEPTH: usize = 1024;

pub struct MidirVirtualOutput {
    port: usize,
    connection: MidiOutputConnection,
}

impl MidirVirtualOutput {
    pub fn open(client_name: &str, port: usize) -> Result<Self, RelayError> {
        let name = virtual_port_name(client_name, port);
        let open_failed = |reason: String| RelayError::PortOpenFailed {
            name: name.clone(),
            reason,
        };

        let output = MidiOutput::new(client_name).map_err(|e| open_failed(e.to_string()))?;
        let connection = output
            .create_virtual(&name)
            .map_err(|e| open_failed(e.to_string()))?;

        tracing::debug!(port = %name, "Opened virtual MIDI output");
        Ok(Self { port, connection })
    }
}

impl VirtualOutput for MidirVirtualOutput {
    fn send(&mut self, message: &[u8]) -> Result<(), RelayError> {
        self.connection
            .send(message)
            .map_err(|e| RelayError::SendFailed {
                port: self.port,
                len: message.len(),
                reason: e.to_string(),
            })
    }
}

pub struct MidirVirtualInput {
    queue: HeapCons<MidiBytes>,
    _connection: MidiInputConnection<HeapProd<MidiBytes>>,
}

impl MidirVirtualInput {
    pub fn open(client_name: &str, port: usize) -> Result<Self, RelayError> {
        let name = virtual_port_name(client_name, port);
        let open_failed = |reason: String| RelayError::PortOpenFailed {
            name: name.clone(),
            reason,
        };

        let mut input = MidiInput::new(client_name).map_err(|e| open_failed(e.to_string()))?;
        // Pass sysex, timing and active sensing through untouched.
        input.ignore(Ignore::None);

        let (producer, queue) = HeapRb::<MidiBytes>::new(INPUT_QUEUE_DEPTH).split();
        let connection = input
            .create_virtual(
                &name,
                |_stamp, message, producer: &mut HeapProd<MidiBytes>| {
                    // Overflow drops the newest message.
                    let _ = producer.try_push(MidiBytes::from_slice(message));
                },
                producer,
            )
            .map_err(|e| open_failed(e.to_string()))?;

        tracing::debug!(port = %name, "Opened virtual MIDI input");
        Ok(Self {
            queue,
            _connection: connection,
        })
    }
}

impl VirtualInput for MidirVirtualInput {
    fn next_message(&mut self) -> Option<MidiBytes> {
        self.queue.try_pop()
    }
}

/// Counts the MIDI endpoints the system MIDI API currently exposes.
///
/// This is every endpoint midir can see (on Linux, all ALSA sequencer
/// ports, including other applications' virtual ports), not only the raw
/// hardware ports an audio server would report. Hosts that know their own
/// raw-MIDI ports should supply their own [`PortDiscovery`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MidirDiscovery;

impl PortDiscovery for MidirDiscovery {
    fn system_midi_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::Capture => MidiInput::new("framebridge-discovery")
                .map(|input| input.port_count())
                .unwrap_or(0),
            PortDirection::Playback => MidiOutput::new("framebridge-discovery")
                .map(|output| output.port_count())
                .unwrap_or(0),
        }
    }
}

/// Open every virtual port for a relay. Any failure aborts construction.
pub fn open_relay(client_name: &str, ports: RelayPorts) -> Result<MidiRelay, RelayError> {
    let mut outputs: Vec<Box<dyn VirtualOutput>> = Vec::with_capacity(ports.outputs);
    for port in 0..ports.outputs {
        outputs.push(Box::new(MidirVirtualOutput::open(client_name, port)?));
    }

    let mut inputs: Vec<Box<dyn VirtualInput>> = Vec::with_capacity(ports.inputs);
    for port in 0..ports.inputs {
        inputs.push(Box::new(MidirVirtualInput::open(client_name, port)?));
    }

    tracing::info!(
        client = client_name,
        outputs = ports.outputs,
        inputs = ports.inputs,
        "MIDI relay ports opened"
    );
    Ok(MidiRelay::new(outputs, inputs))
}
