//! Input types accepted by the builder.

use crate::labels::Labels;

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry timestamp, Unix nanoseconds.
    pub timestamp: i64,
    /// Log line.
    pub line: String,
}

impl Entry {
    /// Creates an entry.
    pub fn new(timestamp: i64, line: impl Into<String>) -> Self {
        Self {
            timestamp,
            line: line.into(),
        }
    }
}

/// A labeled stream of entries, the unit of [`crate::Builder::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    /// Labels identifying the stream.
    pub labels: Labels,
    /// Entries of the stream.
    pub entries: Vec<Entry>,
}

impl Stream {
    /// Creates a stream.
    pub fn new(labels: Labels, entries: Vec<Entry>) -> Self {
        Self { labels, entries }
    }

    /// Estimated encoded size of the stream, used for size targets.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        const ROW_OVERHEAD: usize = 32;
        const ENTRY_OVERHEAD: usize = 16;

        let labels: usize = self
            .labels
            .iter()
            .map(|l| l.name.len() + l.value.len() + 4)
            .sum();
        let entries: usize = self
            .entries
            .iter()
            .map(|e| e.line.len() + ENTRY_OVERHEAD)
            .sum();
        ROW_OVERHEAD + labels + entries
    }
}
