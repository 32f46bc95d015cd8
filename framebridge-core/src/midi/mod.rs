// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! MIDI relay between host event ports and virtual ports.

mod relay;
#[cfg(feature = "midi")]
mod virtual_port;

pub use relay::{MidiBytes, MidiRelay, RelayPorts, VirtualInput, VirtualOutput};
#[cfg(feature = "midi")]
pub use virtual_port::{open_relay, MidirDiscovery, MidirVirtualInput, MidirVirtualOutput};
