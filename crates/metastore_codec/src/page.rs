//! Paged section payloads.
//!
//! Section payloads are split into independently decodable pages so a
//! reader only ever holds one decoded page in memory:
//!
//! ```text
//! page_count (u32 LE) | row_count (u64 LE) | { page_len (u32 LE) | CBOR page }*
//! ```

use crate::error::{CodecError, CodecResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

const HEADER_SIZE: usize = 12;

/// Encodes already-split pages into a section payload.
pub(crate) fn encode_pages<P: Serialize>(pages: &[P], row_count: u64) -> CodecResult<Vec<u8>> {
    let page_count = u32::try_from(pages.len())
        .map_err(|_| CodecError::encoding_failed("too many pages in section"))?;

    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(&page_count.to_le_bytes());
    out.extend_from_slice(&row_count.to_le_bytes());

    let mut page_buf = Vec::new();
    for page in pages {
        page_buf.clear();
        ciborium::into_writer(page, &mut page_buf)
            .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        let len = u32::try_from(page_buf.len())
            .map_err(|_| CodecError::encoding_failed("page exceeds 4 GiB"))?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&page_buf);
    }
    Ok(out)
}

/// Lazily decodes the pages of a section payload, one at a time.
#[derive(Debug, Clone)]
pub(crate) struct PageCursor {
    data: Bytes,
    offset: usize,
    remaining: u32,
    row_count: u64,
}

impl PageCursor {
    /// Parses the payload header.
    pub(crate) fn new(data: Bytes) -> CodecResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(CodecError::decoding_failed("section payload too short"));
        }
        let remaining = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut rows = [0u8; 8];
        rows.copy_from_slice(&data[4..HEADER_SIZE]);

        Ok(Self {
            data,
            offset: HEADER_SIZE,
            remaining,
            row_count: u64::from_le_bytes(rows),
        })
    }

    /// Total rows across all pages, as recorded by the writer.
    pub(crate) fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Decodes the next page, or returns `None` once all pages are read.
    pub(crate) fn next_page<P: DeserializeOwned>(&mut self) -> CodecResult<Option<P>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let header_end = self.offset + 4;
        if header_end > self.data.len() {
            return Err(CodecError::decoding_failed("truncated page header"));
        }
        let len = u32::from_le_bytes([
            self.data[self.offset],
            self.data[self.offset + 1],
            self.data[self.offset + 2],
            self.data[self.offset + 3],
        ]) as usize;

        let end = header_end
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| CodecError::decoding_failed("truncated page"))?;

        let page = ciborium::from_reader(&self.data[header_end..end])
            .map_err(|e| CodecError::decoding_failed(e.to_string()))?;

        self.offset = end;
        self.remaining -= 1;
        Ok(Some(page))
    }
}

/// Splits `sizes.len()` rows into page ranges whose summed estimated size
/// stays within `target_page_size`. Every page holds at least one row.
pub(crate) fn split_pages(sizes: &[usize], target_page_size: usize) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut current = 0usize;

    for (i, size) in sizes.iter().enumerate() {
        if i > start && current + size > target_page_size {
            ranges.push(start..i);
            start = i;
            current = 0;
        }
        current += size;
    }
    if start < sizes.len() {
        ranges.push(start..sizes.len());
    }
    ranges
}
