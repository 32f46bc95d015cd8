// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! One bridge instance: block driver, optional MIDI relay and the
//! real-time half of its diagnostics queue, bundled as a [`BlockProcessor`].

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::BridgeConfig;
use crate::diagnostics::{self, DiagnosticDrain, DiagnosticSink, DEFAULT_DIAGNOSTIC_CAPACITY};
use crate::driver::{BlockDriver, DriverState};
use crate::host::{BlockProcessor, Control, PortNames, ProcessScope};
use crate::midi::MidiRelay;
use crate::shm::SharedChannel;

pub struct Bridge<C: Clock> {
    driver: BlockDriver<C>,
    relay: Option<MidiRelay>,
    diagnostics: DiagnosticSink,
}

impl<C: Clock> Bridge<C> {
    /// Build a bridge without MIDI. The returned drain must be flushed off
    /// the real-time thread.
    pub fn new(
        config: &BridgeConfig,
        channel: Arc<SharedChannel>,
        clock: C,
    ) -> (Self, DiagnosticDrain) {
        let (sink, drain) =
            diagnostics::channel(config.client_name.clone(), DEFAULT_DIAGNOSTIC_CAPACITY);
        let bridge = Self {
            driver: BlockDriver::new(config, channel, clock),
            relay: None,
            diagnostics: sink,
        };
        (bridge, drain)
    }

    pub fn with_relay(mut self, relay: MidiRelay) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Host ports this bridge needs registered.
    pub fn port_names(&self) -> PortNames {
        match &self.relay {
            Some(relay) => PortNames::new(relay.output_count(), relay.input_count()),
            None => PortNames::new(0, 0),
        }
    }

    pub fn state(&self) -> DriverState {
        self.driver.state()
    }

    pub fn frame_number(&self) -> u64 {
        self.driver.frame_number()
    }

    pub fn channel(&self) -> &Arc<SharedChannel> {
        self.driver.channel()
    }
}

impl<C: Clock> BlockProcessor for Bridge<C> {
    fn process(&mut self, scope: &mut dyn ProcessScope) -> Control {
        // MIDI flows even while the consumer is not started.
        if let Some(relay) = self.relay.as_mut() {
            relay.process(scope, &mut self.diagnostics);
        }
        self.driver.process(scope, &mut self.diagnostics)
    }
}
