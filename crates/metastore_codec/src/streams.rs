//! Streams sections: one row per labeled stream.
//!
//! Columns are `id`, `labels` (text form), `min_time`, `max_time`, `rows`
//! and `uncompressed_size`, stored per page.

use crate::error::{CodecError, CodecResult};
use crate::labels::Labels;
use crate::object::{Section, SectionKind};
use crate::page::{encode_pages, split_pages, PageCursor};
use serde::{Deserialize, Serialize};

/// A decoded streams-section row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRow {
    /// Stream identifier, unique within the object.
    pub id: u64,
    /// Stream labels.
    pub labels: Labels,
    /// Smallest entry timestamp, Unix nanoseconds.
    pub min_time: i64,
    /// Largest entry timestamp, Unix nanoseconds.
    pub max_time: i64,
    /// Number of entries.
    pub rows: u64,
    /// Sum of entry line lengths.
    pub uncompressed_size: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StreamsPage {
    id: Vec<u64>,
    labels: Vec<String>,
    min_time: Vec<i64>,
    max_time: Vec<i64>,
    rows: Vec<u64>,
    uncompressed_size: Vec<u64>,
}

impl StreamsPage {
    fn len(&self) -> usize {
        self.id.len()
    }

    fn validate(&self) -> CodecResult<()> {
        let n = self.id.len();
        if [
            self.labels.len(),
            self.min_time.len(),
            self.max_time.len(),
            self.rows.len(),
            self.uncompressed_size.len(),
        ]
        .iter()
        .any(|len| *len != n)
        {
            return Err(CodecError::decoding_failed(
                "streams page has columns of differing lengths",
            ));
        }
        Ok(())
    }

    fn row(&self, i: usize) -> CodecResult<StreamRow> {
        Ok(StreamRow {
            id: self.id[i],
            labels: self.labels[i].parse()?,
            min_time: self.min_time[i],
            max_time: self.max_time[i],
            rows: self.rows[i],
            uncompressed_size: self.uncompressed_size[i],
        })
    }
}

/// Accumulates stream rows for the section currently being built.
#[derive(Debug, Default)]
pub(crate) struct StreamsSectionBuilder {
    rows: Vec<(StreamRow, usize)>,
    estimated_size: usize,
}

impl StreamsSectionBuilder {
    pub(crate) fn push(&mut self, row: StreamRow, estimated_size: usize) {
        self.estimated_size += estimated_size;
        self.rows.push((row, estimated_size));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn estimated_size(&self) -> usize {
        self.estimated_size
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
        self.estimated_size = 0;
    }

    /// Encodes the accumulated rows into a section payload and clears.
    pub(crate) fn encode(&mut self, target_page_size: usize) -> CodecResult<Vec<u8>> {
        let sizes: Vec<usize> = self.rows.iter().map(|(_, size)| *size).collect();
        let pages: Vec<StreamsPage> = split_pages(&sizes, target_page_size)
            .into_iter()
            .map(|range| {
                let mut page = StreamsPage::default();
                for (row, _) in &self.rows[range] {
                    page.id.push(row.id);
                    page.labels.push(row.labels.to_string());
                    page.min_time.push(row.min_time);
                    page.max_time.push(row.max_time);
                    page.rows.push(row.rows);
                    page.uncompressed_size.push(row.uncompressed_size);
                }
                page
            })
            .collect();

        let payload = encode_pages(&pages, self.rows.len() as u64)?;
        self.clear();
        Ok(payload)
    }
}

/// Returns true if `section` is a streams section.
#[must_use]
pub fn check_section(section: &Section) -> bool {
    section.kind == SectionKind::Streams
}

/// An opened streams section.
#[derive(Debug, Clone)]
pub struct StreamsSection {
    cursor: PageCursor,
}

impl StreamsSection {
    /// Number of rows in the section.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        self.cursor.row_count()
    }
}

/// Opens a streams section for reading.
///
/// # Errors
///
/// Returns an error if `section` is not a streams section or its payload
/// header is malformed.
pub fn open(section: &Section) -> CodecResult<StreamsSection> {
    if !check_section(section) {
        return Err(CodecError::SectionKindMismatch {
            expected: SectionKind::Streams.to_string(),
            actual: section.kind.to_string(),
        });
    }
    Ok(StreamsSection {
        cursor: PageCursor::new(section.data.clone())?,
    })
}

/// Reads stream rows in caller-sized batches.
///
/// Only the page containing the next row is held decoded.
#[derive(Debug)]
pub struct RowReader {
    cursor: PageCursor,
    page: StreamsPage,
    next: usize,
}

impl RowReader {
    /// Creates a reader positioned at the first row of `section`.
    #[must_use]
    pub fn new(section: &StreamsSection) -> Self {
        Self {
            cursor: section.cursor.clone(),
            page: StreamsPage::default(),
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
    /// Returns an error if a page or a row's labels fail to decode.
    pub fn read(&mut self, batch: &mut Vec<StreamRow>, max_rows: usize) -> CodecResult<usize> {
        batch.clear();
        while batch.len() < max_rows {
            if self.next >= self.page.len() {
                match self.cursor.next_page::<StreamsPage>()? {
                    Some(page) => {
                        page.validate()?;
                        self.page = page;
                        self.next = 0;
                        continue;
                    }
                    None => break,
                }
            }
            batch.push(self.page.row(self.next)?);
            self.next += 1;
        }
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;
    use bytes::Bytes;

    fn row(id: u64, path: &str) -> StreamRow {
        StreamRow {
            id,
            labels: Labels::new(vec![Label::new("__path__", path)]).unwrap(),
            min_time: id as i64,
            max_time: id as i64 + 10,
            rows: 1,
            uncompressed_size: 0,
        }
    }

    fn section_with(rows: &[StreamRow], page_size: usize) -> Section {
        let mut builder = StreamsSectionBuilder::default();
        for r in rows {
            builder.push(r.clone(), 10);
        }
        Section {
            kind: SectionKind::Streams,
            data: Bytes::from(builder.encode(page_size).unwrap()),
        }
    }

    #[test]
    fn reads_rows_across_pages_in_batches() {
        let rows: Vec<_> = (0..7).map(|i| row(i, &format!("obj-{i}"))).collect();
        let section = section_with(&rows, 20);

        let opened = open(&section).unwrap();
        assert_eq!(opened.row_count(), 7);

        let mut reader = RowReader::new(&opened);
        let mut batch = Vec::new();
        let mut seen = Vec::new();
        loop {
            let n = reader.read(&mut batch, 3).unwrap();
            if n == 0 {
                break;
            }
            assert!(n <= 3);
            seen.extend(batch.drain(..));
        }
        assert_eq!(seen, rows);
    }

    #[test]
    fn empty_section_reads_nothing() {
        let section = section_with(&[], 20);
        let mut reader = RowReader::new(&open(&section).unwrap());
        let mut batch = Vec::new();
        assert_eq!(reader.read(&mut batch, 100).unwrap(), 0);
    }

    #[test]
    fn open_rejects_other_kinds() {
        let section = Section {
            kind: SectionKind::Logs,
            data: Bytes::new(),
        };
        assert!(!check_section(&section));
        assert!(matches!(
            open(&section),
            Err(CodecError::SectionKindMismatch { .. })
        ));
    }

    #[test]
    fn ragged_columns_fail_to_decode() {
        let page = StreamsPage {
            id: vec![1, 2],
            labels: vec!["{}".into()],
            ..StreamsPage::default()
        };
        let section = Section {
            kind: SectionKind::Streams,
            data: Bytes::from(encode_pages(&[page], 2).unwrap()),
        };
        let mut reader = RowReader::new(&open(&section).unwrap());
        assert!(matches!(
            reader.read(&mut Vec::new(), 10),
            Err(CodecError::DecodingFailed { .. })
        ));
    }
}
