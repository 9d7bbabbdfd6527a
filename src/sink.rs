//! Result sink boundary
//!
//! The engine's only outward-facing contract: a pre-session "is testing
//! enabled" flag and a fire-and-forget emission of the finished session
//! record. Persistence, retries, and display belong to the host application;
//! the engine never awaits an acknowledgment.

use crate::types::SessionRecord;

/// Host-owned collaborator receiving finished session results
pub trait ResultSink {
    /// Read once at session start. A stale read is acceptable.
    fn test_enabled(&self) -> bool {
        true
    }

    /// Called exactly once, after the 7th block's last trial resolves and the
    /// score is computed. Never called for an abandoned session.
    fn on_session_complete(&mut self, record: &SessionRecord);
}

/// Sink that discards results; useful for embedding and demos
#[derive(Debug, Default)]
pub struct NullSink;

impl ResultSink for NullSink {
    fn on_session_complete(&mut self, _record: &SessionRecord) {}
}

/// Sink that retains the emitted record in memory; useful for tests and for
/// callers that want the record back synchronously
#[derive(Debug, Default)]
pub struct MemorySink {
    record: Option<SessionRecord>,
    enabled: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            record: None,
            enabled: true,
        }
    }

    /// A sink whose enabled flag is off
    pub fn disabled() -> Self {
        Self {
            record: None,
            enabled: false,
        }
    }

    /// The emitted record, if the session completed
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    /// Consume the sink and return the emitted record
    pub fn into_record(self) -> Option<SessionRecord> {
        self.record
    }
}

impl ResultSink for MemorySink {
    fn test_enabled(&self) -> bool {
        self.enabled
    }

    fn on_session_complete(&mut self, record: &SessionRecord) {
        self.record = Some(record.clone());
    }
}
