//! Injected diagnostics sink.
//!
//! The client never logs through a global channel of its own choosing; it
//! reports to whatever `Diagnostics` it was given. `TracingDiagnostics` is the
//! default and forwards to `tracing`. `MemoryDiagnostics` keeps everything in
//! memory for assertions.

use std::sync::Mutex;

use crate::error::ApiError;
use crate::ndjson::DiscardedLine;

pub trait Diagnostics: Send + Sync {
    /// A non-blank NDJSON line was dropped from a result sequence.
    fn line_discarded(&self, operation: &str, line: &DiscardedLine);

    /// A whole call failed at the HTTP layer. Reported once, before the error
    /// is returned to the caller.
    fn transport_failed(&self, operation: &str, error: &ApiError);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn line_discarded(&self, operation: &str, line: &DiscardedLine) {
        tracing::warn!(
            operation,
            line_number = line.line_number,
            raw = %line.raw,
            error = %line.reason,
            "Discarding undecodable NDJSON line"
        );
    }

    fn transport_failed(&self, operation: &str, error: &ApiError) {
        tracing::error!(operation, error = %error, "Event store request failed");
    }
}

/// One captured diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    LineDiscarded {
        operation: String,
        line_number: usize,
        raw: String,
        reason: String,
    },
    TransportFailed {
        operation: String,
        error: String,
    },
}

#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in arrival order.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn transport_failures(&self) -> usize {
        self.lock()
            .iter()
            .filter(|d| matches!(d, Diagnostic::TransportFailed { .. }))
            .count()
    }

    pub fn discarded_lines(&self) -> usize {
        self.lock()
            .iter()
            .filter(|d| matches!(d, Diagnostic::LineDiscarded { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn line_discarded(&self, operation: &str, line: &DiscardedLine) {
        self.lock().push(Diagnostic::LineDiscarded {
            operation: operation.to_string(),
            line_number: line.line_number,
            raw: line.raw.clone(),
            reason: line.reason.to_string(),
        });
    }

    fn transport_failed(&self, operation: &str, error: &ApiError) {
        self.lock().push(Diagnostic::TransportFailed {
            operation: operation.to_string(),
            error: error.to_string(),
        });
    }
}
