// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! FrameBridge CLI
//!
//! Attaches the shared segment, builds the bridge and drives it from the
//! built-in dummy host until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use framebridge_core::midi::RelayPorts;
use framebridge_core::{
    Bridge, BridgeConfig, ConfigLoader, MonotonicClock, PortCount, SegmentId, SharedChannel,
};

mod host;

use host::DummyHost;

/// How often the diagnostics drain runs.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// FrameBridge - shared-memory audio bridge to an external engine
#[derive(Parser)]
#[command(name = "framebridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging and free-running status
    #[arg(short, long)]
    pub verbose: bool,

    /// Virtual MIDI inputs (negative = match system playback ports)
    #[arg(short = 'i', long, allow_negative_numbers = true)]
    pub midi_inputs: Option<i64>,

    /// Virtual MIDI outputs (negative = match system capture ports)
    #[arg(short = 'o', long, allow_negative_numbers = true)]
    pub midi_outputs: Option<i64>,

    /// Shared segment id
    #[arg(long)]
    pub id: Option<u32>,
}

impl Cli {
    fn resolve_config(&self) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_file(path)?,
            None => BridgeConfig::default(),
        };

        if self.verbose {
            config.verbose = true;
        }
        if let Some(n) = self.midi_inputs {
            config.midi_inputs = PortCount::from_signed("midi_inputs", n)?;
        }
        if let Some(n) = self.midi_outputs {
            config.midi_outputs = PortCount::from_signed("midi_outputs", n)?;
        }
        if let Some(id) = self.id {
            config.segment_id = SegmentId::new(id);
        }

        Ok(config.with_env())
    }
}

/// Verbose configs log at `debug` so heartbeat status records show up.
fn log_level(config: &BridgeConfig) -> &'static str {
    if config.verbose {
        "debug"
    } else {
        "info"
    }
}

#[cfg(feature = "midi")]
fn attach_relay(
    bridge: Bridge<MonotonicClock>,
    config: &BridgeConfig,
) -> Result<Bridge<MonotonicClock>, Box<dyn std::error::Error>> {
    use framebridge_core::midi::{open_relay, MidirDiscovery};

    let ports = RelayPorts::resolve(config.midi_outputs, config.midi_inputs, &MidirDiscovery);
    if ports.outputs == 0 && ports.inputs == 0 {
        return Ok(bridge);
    }
    let relay = open_relay(&config.client_name, ports)?;
    Ok(bridge.with_relay(relay))
}

#[cfg(not(feature = "midi"))]
fn attach_relay(
    bridge: Bridge<MonotonicClock>,
    config: &BridgeConfig,
) -> Result<Bridge<MonotonicClock>, Box<dyn std::error::Error>> {
    let ports = RelayPorts::resolve(config.midi_outputs, config.midi_inputs, &host::DummyDiscovery);
    if ports.outputs > 0 || ports.inputs > 0 {
        tracing::warn!(
            outputs = ports.outputs,
            inputs = ports.inputs,
            "MIDI ports requested but built without the `midi` feature"
        );
    }
    Ok(bridge)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = cli.resolve_config()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(&config)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        segment = %config.segment_id,
        client = %config.client_name,
        frames_per_buffer = config.frames_per_buffer.value(),
        sync_mode = config.sync_mode,
        sample_rate = %config.sample_rate,
        "Configuration validated successfully"
    );

    // No retry: without the segment there is nothing to bridge.
    let channel = match SharedChannel::attach(config.segment_id) {
        Ok(channel) => Arc::new(channel),
        Err(e) => {
            tracing::error!(segment = %config.segment_id, error = %e, "Failed to attach shared memory");
            std::process::exit(1);
        }
    };

    let (bridge, mut drain) = Bridge::new(&config, channel, MonotonicClock);
    let bridge = attach_relay(bridge, &config)?;
    let ports = bridge.port_names();
    tracing::info!(
        audio_in = ports.audio_in.len(),
        audio_out = ports.audio_out.len(),
        event_in = ports.event_in.len(),
        event_out = ports.event_out.len(),
        "Bridge ports"
    );

    let mut host = DummyHost::start(
        bridge,
        &ports,
        config.dummy_block_frames,
        config.sample_rate,
    )?;

    let drain_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(DRAIN_INTERVAL);
        loop {
            interval.tick().await;
            drain.flush();
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    host.stop();
    drain_task.abort();
    Ok(())
}
