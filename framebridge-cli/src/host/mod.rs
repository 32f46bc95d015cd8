// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Host backends the daemon can drive the bridge from.

mod dummy;

pub use dummy::{DummyDiscovery, DummyHost};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to spawn host thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}
