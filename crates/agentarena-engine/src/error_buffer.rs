// crates/agentarena-engine/src/error_buffer.rs
// ============================================================================
// Module: Bounded Error Buffer
// Description: Admin-visible ring buffer of the last uncaught internal errors.
// Purpose: Give admin tooling visibility into internal failures as an
//          explicit singleton rather than ambient module state.
// Dependencies: none beyond std
// ============================================================================

//! ## Overview
//! A bounded deque of the most recent internal error descriptions, trimmed
//! from the front once it grows past [`ErrorBuffer::CAPACITY`]. An explicit
//! struct an embedder constructs and owns, rather than ambient module state.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded ring buffer of recent internal error descriptions.
///
/// # Invariants
/// - Never holds more than [`ErrorBuffer::CAPACITY`] entries; the oldest
///   entry is evicted first.
pub struct ErrorBuffer {
    /// Retained error descriptions, oldest first.
    entries: Mutex<VecDeque<String>>,
}

impl ErrorBuffer {
    /// Maximum number of retained entries.
    pub const CAPACITY: usize = 50;

    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(VecDeque::with_capacity(Self::CAPACITY)) }
    }

    /// Records a new internal error description, evicting the oldest entry
    /// if the buffer is already at capacity.
    pub fn record(&self, description: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() >= Self::CAPACITY {
            entries.pop_front();
        }
        entries.push_back(description.into());
    }

    /// Returns a snapshot of the currently retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.iter().cloned().collect()
    }
}

impl Default for ErrorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test assertions are permitted to unwrap directly.")]
mod tests {
    use super::*;

    #[test]
    fn records_and_snapshots_in_order() {
        let buf = ErrorBuffer::new();
        buf.record("first");
        buf.record("second");
        assert_eq!(buf.snapshot(), vec!["first".to_owned(), "second".to_owned()]);
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let buf = ErrorBuffer::new();
        for i in 0..ErrorBuffer::CAPACITY + 5 {
            buf.record(format!("err-{i}"));
        }
        let snapshot = buf.snapshot();
        assert_eq!(snapshot.len(), ErrorBuffer::CAPACITY);
        assert_eq!(snapshot.first().unwrap(), "err-5");
        assert_eq!(snapshot.last().unwrap(), &format!("err-{}", ErrorBuffer::CAPACITY + 4));
    }
}
