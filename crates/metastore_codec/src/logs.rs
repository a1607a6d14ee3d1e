//! Logs sections: one row per entry, referencing its stream by id.

use crate::error::{CodecError, CodecResult};
use crate::object::{Section, SectionKind};
use crate::page::{encode_pages, split_pages, PageCursor};
use serde::{Deserialize, Serialize};

/// A decoded logs-section row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// Id of the owning stream, see [`crate::streams::StreamRow::id`].
    pub stream_id: u64,
    /// Entry timestamp, Unix nanoseconds.
    pub timestamp: i64,
    /// Log line.
    pub line: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogsPage {
    stream_id: Vec<u64>,
    timestamp: Vec<i64>,
    line: Vec<String>,
}

impl LogsPage {
    fn len(&self) -> usize {
        self.stream_id.len()
    }

    fn validate(&self) -> CodecResult<()> {
        let n = self.stream_id.len();
        if self.timestamp.len() != n || self.line.len() != n {
            return Err(CodecError::decoding_failed(
                "logs page has columns of differing lengths",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct LogsSectionBuilder {
    rows: Vec<LogRow>,
}

impl LogsSectionBuilder {
    pub(crate) fn push(&mut self, row: LogRow) {
        self.rows.push(row);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    pub(crate) fn encode(&mut self, target_page_size: usize) -> CodecResult<Vec<u8>> {
        let sizes: Vec<usize> = self.rows.iter().map(|r| r.line.len() + 16).collect();
        let pages: Vec<LogsPage> = split_pages(&sizes, target_page_size)
            .into_iter()
            .map(|range| {
                let mut page = LogsPage::default();
                for row in &self.rows[range] {
                    page.stream_id.push(row.stream_id);
                    page.timestamp.push(row.timestamp);
                    page.line.push(row.line.clone());
                }
                page
            })
            .collect();

        let payload = encode_pages(&pages, self.rows.len() as u64)?;
        self.clear();
        Ok(payload)
    }
}

/// Returns true if `section` is a logs section.
#[must_use]
pub fn check_section(section: &Section) -> bool {
    section.kind == SectionKind::Logs
}

/// An opened logs section.
#[derive(Debug, Clone)]
pub struct LogsSection {
    cursor: PageCursor,
}

impl LogsSection {
    /// Number of rows in the section.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.cursor.row_count()
    }
}

/// Opens a logs section for reading.
///
/// # Errors
///
/// Returns an error if `section` is not a logs section or its payload
/// header is malformed.
pub fn open(section: &Section) -> CodecResult<LogsSection> {
    if !check_section(section) {
        return Err(CodecError::SectionKindMismatch {
            expected: SectionKind::Logs.to_string(),
            actual: section.kind.to_string(),
        });
    }
    Ok(LogsSection {
        cursor: PageCursor::new(section.data.clone())?,
    })
}

/// Reads log rows in caller-sized batches.
#[derive(Debug)]
pub struct RowReader {
    cursor: PageCursor,
    page: LogsPage,
    next: usize,
}

impl RowReader {
    /// Creates a reader positioned at the first row of `section`.
    #[must_use]
    pub fn new(section: &LogsSection) -> Self {
        Self {
            cursor: section.cursor.clone(),
            page: LogsPage::default(),
            next: 0,
        }
    }

    /// Clears `batch` and fills it with up to `max_rows` rows.
    ///
    /// Returns the number of rows read; `0` means the section is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if a page fails to decode.
    pub fn read(&mut self, batch: &mut Vec<LogRow>, max_rows: usize) -> CodecResult<usize> {
        batch.clear();
        while batch.len() < max_rows {
            if self.next >= self.page.len() {
                match self.cursor.next_page::<LogsPage>()? {
                    Some(page) => {
                        page.validate()?;
                        self.page = page;
                        self.next = 0;
                        continue;
                    }
                    None => break,
                }
            }
            let i = self.next;
            batch.push(LogRow {
                stream_id: self.page.stream_id[i],
                timestamp: self.page.timestamp[i],
                line: std::mem::take(&mut self.page.line[i]),
            });
            self.next += 1;
        }
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn reads_back_rows() {
        let mut builder = LogsSectionBuilder::default();
        for i in 0..5 {
            builder.push(LogRow {
                stream_id: i % 2,
                timestamp: i as i64,
                line: format!("line {i}"),
            });
        }
        let section = Section {
            kind: SectionKind::Logs,
            data: Bytes::from(builder.encode(40).unwrap()),
        };
        assert!(builder.is_empty());

        let opened = open(&section).unwrap();
        assert_eq!(opened.row_count(), 5);

        let mut reader = RowReader::new(&opened);
        let mut batch = Vec::new();
        assert_eq!(reader.read(&mut batch, 10).unwrap(), 5);
        assert_eq!(batch[3].line, "line 3");
        assert_eq!(batch[3].stream_id, 1);
        assert_eq!(reader.read(&mut batch, 10).unwrap(), 0);
    }

    #[test]
    fn open_rejects_streams_section() {
        let section = Section {
            kind: SectionKind::Streams,
            data: Bytes::new(),
        };
        assert!(open(&section).is_err());
    }
}
