// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Out-of-band diagnostics for the real-time thread.
//!
//! The block driver never logs. It pushes small `Copy` records into a
//! bounded SPSC queue; a non-real-time task drains the queue into `tracing`.
//! A full queue drops the record and counts it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::drift::DriftWarning;

/// Default queue depth in records.
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 256;

/// One diagnostic record produced on the real-time path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    Activated {
        sync_mode: bool,
        seed: Option<u32>,
        zero_host_time: u64,
    },
    Drift(DriftWarning),
    /// Periodic free-running status.
    Heartbeat {
        frame: u64,
        host_time: u64,
        timestamp_index: u64,
    },
    EventBufferFull {
        port: usize,
        len: usize,
    },
    VirtualSendFailed {
        port: usize,
        len: usize,
    },
}

/// Real-time side of the diagnostics queue.
pub struct DiagnosticSink {
    producer: HeapProd<Diagnostic>,
    dropped: Arc<AtomicU64>,
}

impl DiagnosticSink {
    /// Never blocks, never allocates.
    #[inline]
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if self.producer.try_push(diagnostic).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Non-real-time side of the diagnostics queue.
pub struct DiagnosticDrain {
    consumer: HeapCons<Diagnostic>,
    dropped: Arc<AtomicU64>,
    instance: String,
}

impl DiagnosticDrain {
    pub fn pop(&mut self) -> Option<Diagnostic> {
        self.consumer.try_pop()
    }

    /// Records lost to a full queue since the last call.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Log everything queued so far. Returns the number of records logged.
    pub fn flush(&mut self) -> usize {
        let mut count = 0;
        while let Some(diagnostic) = self.consumer.try_pop() {
            log_diagnostic(&self.instance, &diagnostic);
            count += 1;
        }

        let dropped = self.take_dropped();
        if dropped > 0 {
            tracing::warn!(instance = %self.instance, dropped, "Diagnostics queue overflowed");
        }
        count
    }
}

/// Create a connected sink/drain pair for one bridge instance.
pub fn channel(instance: impl Into<String>, capacity: usize) -> (DiagnosticSink, DiagnosticDrain) {
    let (producer, consumer) = HeapRb::<Diagnostic>::new(capacity.max(1)).split();
    let dropped = Arc::new(AtomicU64::new(0));
    (
        DiagnosticSink {
            producer,
            dropped: Arc::clone(&dropped),
        },
        DiagnosticDrain {
            consumer,
            dropped,
            instance: instance.into(),
        },
    )
}

fn log_diagnostic(instance: &str, diagnostic: &Diagnostic) {
    match *diagnostic {
        Diagnostic::Activated {
            sync_mode,
            seed,
            zero_host_time,
        } => {
            tracing::info!(
                instance,
                sync_mode,
                seed = ?seed,
                zero_host_time,
                "Activated"
            );
        }
        Diagnostic::Drift(warning) => {
            tracing::warn!(
                instance,
                frame = warning.frame,
                diff = warning.diff,
                interval = warning.interval,
                "Miss synchronization detected"
            );
        }
        Diagnostic::Heartbeat {
            frame,
            host_time,
            timestamp_index,
        } => {
            tracing::debug!(
                instance,
                frame,
                host_time,
                timestamp_index,
                "Heartbeat"
            );
        }
        Diagnostic::EventBufferFull { port, len } => {
            tracing::warn!(instance, port, len, "Host event buffer full, message dropped");
        }
        Diagnostic::VirtualSendFailed { port, len } => {
            tracing::warn!(instance, port, len, "Virtual MIDI port send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_arrive_in_order() {
        let (mut sink, mut drain) = channel("test", 8);
        sink.emit(Diagnostic::EventBufferFull { port: 0, len: 3 });
        sink.emit(Diagnostic::VirtualSendFailed { port: 1, len: 2 });

        assert_eq!(
            drain.pop(),
            Some(Diagnostic::EventBufferFull { port: 0, len: 3 })
        );
        assert_eq!(
            drain.pop(),
            Some(Diagnostic::VirtualSendFailed { port: 1, len: 2 })
        );
        assert_eq!(drain.pop(), None);
    }

    #[test]
    fn test_full_queue_counts_drops() {
        let (mut sink, mut drain) = channel("test", 2);
        for port in 0..5 {
            sink.emit(Diagnostic::EventBufferFull { port, len: 1 });
        }
        assert_eq!(drain.take_dropped(), 3);
        assert_eq!(drain.take_dropped(), 0);
        assert_eq!(drain.flush(), 2);
    }
}
