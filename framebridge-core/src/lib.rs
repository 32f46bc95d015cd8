//! FrameBridge Core Library
//!
//! Real-time bridge between a host audio server and an external engine
//! process. Provides the shared-memory ring transport, frame clock
//! handshake, drift monitor, block driver and MIDI relay.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod drift;
pub mod driver;
pub mod error;
pub mod host;
pub mod midi;
pub mod shm;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use bridge::Bridge;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{BridgeConfig, ConfigLoader};
pub use diagnostics::{Diagnostic, DiagnosticDrain, DiagnosticSink};
pub use driver::{BlockDriver, DriverState};
pub use error::{BridgeError, BridgeResult, HardValidationError, RelayError, SharedMemoryError};
pub use host::{BlockProcessor, Control, OwnedScope, PortDiscovery, PortNames, ProcessScope};
pub use shm::{DriverStatus, SharedChannel};
pub use types::{FramesPerBuffer, PortCount, SampleRate, SegmentId, StatusInterval};
