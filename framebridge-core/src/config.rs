// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict validation.
//!
//! Validates the bridge configuration before anything is attached.
//! Any invalid field results in a HardValidationError that prevents startup.

use std::path::Path;

use serde::Deserialize;

use crate::error::{BridgeError, BridgeResult, HardValidationError};
use crate::shm::RING_CAPACITY;
use crate::types::{FramesPerBuffer, PortCount, SampleRate, SegmentId, StatusInterval};

/// Environment variable that turns verbose diagnostics on.
pub const DEBUG_ENV: &str = "FRAMEBRIDGE_DEBUG";

/// Port count as written in YAML: a number (negative = auto) or `auto`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPortCount {
    Count(i64),
    Keyword(String),
}

impl Default for RawPortCount {
    fn default() -> Self {
        Self::Count(-1)
    }
}

/// Raw configuration as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBridgeConfig {
    #[serde(default)]
    segment_id: u32,
    #[serde(default = "default_client_name")]
    client_name: String,
    #[serde(default = "default_frames_per_buffer")]
    frames_per_buffer: u32,
    #[serde(default = "default_sync_mode")]
    sync_mode: bool,
    #[serde(default = "default_sample_rate")]
    sample_rate: u32,
    #[serde(default)]
    verbose: bool,
    #[serde(default)]
    midi_inputs: RawPortCount,
    #[serde(default)]
    midi_outputs: RawPortCount,
    #[serde(default = "default_status_interval")]
    status_interval: u64,
    #[serde(default = "default_dummy_block_frames")]
    dummy_block_frames: usize,
}

fn default_client_name() -> String {
    "FrameBridge #1".to_string()
}

fn default_frames_per_buffer() -> u32 {
    512
}

fn default_sync_mode() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_status_interval() -> u64 {
    100 // heartbeats between free-running status lines
}

fn default_dummy_block_frames() -> usize {
    256
}

/// Validated bridge configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub segment_id: SegmentId,
    /// Host client name, also the prefix of virtual MIDI port names.
    pub client_name: String,
    pub frames_per_buffer: FramesPerBuffer,
    pub sync_mode: bool,
    pub sample_rate: SampleRate,
    pub verbose: bool,
    /// Virtual inputs (external → host).
    pub midi_inputs: PortCount,
    /// Virtual outputs (host → external).
    pub midi_outputs: PortCount,
    pub status_interval: StatusInterval,
    /// Block size used by the built-in dummy host.
    pub dummy_block_frames: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            segment_id: SegmentId::new(0),
            client_name: default_client_name(),
            frames_per_buffer: FramesPerBuffer::default(),
            sync_mode: default_sync_mode(),
            sample_rate: SampleRate::default(),
            verbose: false,
            midi_inputs: PortCount::Auto,
            midi_outputs: PortCount::Auto,
            status_interval: StatusInterval::default(),
            dummy_block_frames: default_dummy_block_frames(),
        }
    }
}

impl BridgeConfig {
    /// Apply `FRAMEBRIDGE_DEBUG`. Read once, when the bridge is built.
    pub fn with_env(mut self) -> Self {
        if std::env::var_os(DEBUG_ENV).is_some() {
            self.verbose = true;
        }
        self
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    pub fn load_file(path: impl AsRef<Path>) -> BridgeResult<BridgeConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> BridgeResult<BridgeConfig> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(BridgeConfig::default());
        }

        let raw: RawBridgeConfig =
            serde_yaml::from_str(content).map_err(|e| BridgeError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Ok(Self::validate(raw)?)
    }

    fn validate(raw: RawBridgeConfig) -> Result<BridgeConfig, HardValidationError> {
        if raw.client_name.trim().is_empty() {
            return Err(HardValidationError::InvalidFieldValue {
                field: "client_name",
                value: raw.client_name,
                reason: "Client name cannot be empty".to_string(),
            });
        }

        let frames_per_buffer = FramesPerBuffer::new(raw.frames_per_buffer)?;
        let sample_rate = SampleRate::new(raw.sample_rate)?;
        let status_interval = StatusInterval::new(raw.status_interval)?;

        if raw.dummy_block_frames == 0 || raw.dummy_block_frames > RING_CAPACITY / 2 {
            return Err(HardValidationError::InvalidFieldValue {
                field: "dummy_block_frames",
                value: raw.dummy_block_frames.to_string(),
                reason: format!("Must be between 1 and {}", RING_CAPACITY / 2),
            });
        }

        Ok(BridgeConfig {
            segment_id: SegmentId::new(raw.segment_id),
            client_name: raw.client_name,
            frames_per_buffer,
            sync_mode: raw.sync_mode,
            sample_rate,
            verbose: raw.verbose,
            midi_inputs: Self::validate_port_count("midi_inputs", raw.midi_inputs)?,
            midi_outputs: Self::validate_port_count("midi_outputs", raw.midi_outputs)?,
            status_interval,
            dummy_block_frames: raw.dummy_block_frames,
        })
    }

    fn validate_port_count(
        field: &'static str,
        raw: RawPortCount,
    ) -> Result<PortCount, HardValidationError> {
        match raw {
            RawPortCount::Count(n) => PortCount::from_signed(field, n),
            RawPortCount::Keyword(word) if word.eq_ignore_ascii_case("auto") => Ok(PortCount::Auto),
            RawPortCount::Keyword(word) => Err(HardValidationError::InvalidFieldValue {
                field,
                value: word,
                reason: "Expected a port count or 'auto'".to_string(),
            }),
        }
    }
}
