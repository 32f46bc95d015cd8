// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for FrameBridge.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`.
//! None of these ever cross the real-time callback boundary: the block driver
//! absorbs anomalies and reports them as diagnostics instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SegmentId;

/// Top-level error type for the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Memory Errors - No Fallback Transport
    // =========================================================================
    #[error("Shared memory error: {0}")]
    SharedMemory(#[from] SharedMemoryError),

    // =========================================================================
    // MIDI Relay Errors
    // =========================================================================
    #[error("MIDI relay error: {0}")]
    Relay(#[from] RelayError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors prevent the bridge from starting.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Too many MIDI ports requested for {direction}: {count} (max: {max})")]
    TooManyMidiPorts {
        direction: &'static str,
        count: usize,
        max: usize,
    },
}

/// Shared memory errors. Attach failures are fatal to the daemon.
#[derive(Debug, Error)]
pub enum SharedMemoryError {
    #[error("Failed to attach shared memory segment {id}: {reason}")]
    AttachFailed { id: SegmentId, reason: String },

    #[error("Failed to map shared memory: {reason}")]
    MapFailed { reason: String },

    #[error("Segment {id} has size {actual} bytes, layout requires {expected}")]
    SizeMismatch {
        id: SegmentId,
        expected: usize,
        actual: usize,
    },
}

/// MIDI relay errors. Recoverable: the relay keeps draining.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to open virtual port '{name}': {reason}")]
    PortOpenFailed { name: String, reason: String },

    #[error("Failed to send {len} bytes on virtual port {port}: {reason}")]
    SendFailed {
        port: usize,
        len: usize,
        reason: String,
    },
}

/// Result type alias using BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;
