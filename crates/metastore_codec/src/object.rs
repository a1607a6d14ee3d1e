//! Data object framing.
//!
//! ```text
//! "DOBJ" | version (u8) | section_count (u32 LE)
//! { kind (u8) | payload_len (u32 LE) | payload }*
//! crc32 (u32 LE) over everything before it
//! ```
//!
//! Sections are sliced out of the object bytes without copying.

use crate::error::{CodecError, CodecResult};
use bytes::Bytes;
use std::fmt;
use std::io::Write;

/// Magic bytes at the start of every data object.
pub const MAGIC: &[u8; 4] = b"DOBJ";

/// Current format version.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_SIZE: usize = 9;
const SECTION_HEADER_SIZE: usize = 5;
const TRAILER_SIZE: usize = 4;

/// The kind of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Stream metadata: one row per labeled stream.
    Streams,
    /// Log entries belonging to the streams.
    Logs,
    /// A kind written by a newer format; readers skip it.
    Unknown(u8),
}

impl SectionKind {
    /// Returns the on-disk tag.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Streams => 1,
            Self::Logs => 2,
            Self::Unknown(b) => b,
        }
    }

    /// Parses an on-disk tag.
    #[must_use]
    pub const fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::Streams,
            2 => Self::Logs,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streams => f.write_str("streams"),
            Self::Logs => f.write_str("logs"),
            Self::Unknown(b) => write!(f, "unknown({b})"),
        }
    }
}

/// One section of a data object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section kind.
    pub kind: SectionKind,
    /// Raw section payload.
    pub data: Bytes,
}

/// A decoded data object: a validated list of sections.
#[derive(Debug, Clone)]
pub struct Object {
    sections: Vec<Section>,
    size: usize,
}

impl Object {
    /// Parses and validates the framing of a data object.
    ///
    /// Section payloads are not decoded here; see [`crate::streams::open`]
    /// and [`crate::logs::open`].
    ///
    /// # Errors
    ///
    /// Returns an error if the magic, version, checksum or section table
    /// is invalid.
    pub fn from_bytes(data: Bytes) -> CodecResult<Self> {
        if data.len() < HEADER_SIZE + TRAILER_SIZE {
            return Err(CodecError::invalid_object(format!(
                "object too short: {} bytes",
                data.len()
            )));
        }
        if &data[..4] != MAGIC {
            return Err(CodecError::invalid_object("bad magic"));
        }
        if data[4] != FORMAT_VERSION {
            return Err(CodecError::invalid_object(format!(
                "unsupported format version {}",
                data[4]
            )));
        }

        let body_end = data.len() - TRAILER_SIZE;
        let expected = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let actual = compute_crc32(&data[..body_end]);
        if expected != actual {
            return Err(CodecError::ChecksumMismatch { expected, actual });
        }

        let section_count = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;
        let mut sections = Vec::with_capacity(section_count.min(1024));
        let mut offset = HEADER_SIZE;

        for index in 0..section_count {
            if offset + SECTION_HEADER_SIZE > body_end {
                return Err(CodecError::invalid_object(format!(
                    "truncated header for section {index}"
                )));
            }
            let kind = SectionKind::from_byte(data[offset]);
            let len = u32::from_le_bytes([
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
                data[offset + 4],
            ]) as usize;
            let start = offset + SECTION_HEADER_SIZE;
            let end = start
                .checked_add(len)
                .filter(|end| *end <= body_end)
                .ok_or_else(|| {
                    CodecError::invalid_object(format!("truncated payload for section {index}"))
                })?;

            sections.push(Section {
                kind,
                data: data.slice(start..end),
            });
            offset = end;
        }

        if offset != body_end {
            return Err(CodecError::invalid_object(format!(
                "{} trailing bytes after last section",
                body_end - offset
            )));
        }

        Ok(Self {
            sections,
            size: data.len(),
        })
    }

    /// Returns the sections in object order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Returns the encoded size of the object in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Writes framed sections to `w`, returning the number of bytes written.
pub(crate) fn write_object<W: Write>(
    w: &mut W,
    sections: &[(SectionKind, Vec<u8>)],
) -> CodecResult<u64> {
    let count = u32::try_from(sections.len())
        .map_err(|_| CodecError::encoding_failed("too many sections"))?;

    let body_len: usize = HEADER_SIZE
        + sections
            .iter()
            .map(|(_, payload)| SECTION_HEADER_SIZE + payload.len())
            .sum::<usize>();
    let mut body = Vec::with_capacity(body_len + TRAILER_SIZE);

    body.extend_from_slice(MAGIC);
    body.push(FORMAT_VERSION);
    body.extend_from_slice(&count.to_le_bytes());
    for (kind, payload) in sections {
        let len = u32::try_from(payload.len())
            .map_err(|_| CodecError::encoding_failed("section exceeds 4 GiB"))?;
        body.push(kind.as_byte());
        body.extend_from_slice(&len.to_le_bytes());
        body.extend_from_slice(payload);
    }

    let crc = compute_crc32(&body);
    body.extend_from_slice(&crc.to_le_bytes());

    w.write_all(&body)?;
    Ok(body.len() as u64)
}

/// Computes the IEEE CRC-32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(sections: &[(SectionKind, Vec<u8>)]) -> Bytes {
        let mut buf = Vec::new();
        write_object(&mut buf, sections).unwrap();
        Bytes::from(buf)
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn sections_survive_framing() {
        let data = framed(&[
            (SectionKind::Streams, b"abc".to_vec()),
            (SectionKind::Logs, Vec::new()),
            (SectionKind::Unknown(9), b"z".to_vec()),
        ]);

        let object = Object::from_bytes(data.clone()).unwrap();
        assert_eq!(object.size(), data.len());
        let kinds: Vec<_> = object.sections().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SectionKind::Streams, SectionKind::Logs, SectionKind::Unknown(9)]
        );
        assert_eq!(&object.sections()[0].data[..], b"abc");
    }

    #[test]
    fn corrupted_byte_fails_checksum() {
        let mut data = framed(&[(SectionKind::Streams, b"payload".to_vec())]).to_vec();
        data[12] ^= 0xFF;
        assert!(matches!(
            Object::from_bytes(Bytes::from(data)),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn bad_magic_rejected() {
        let mut data = framed(&[]).to_vec();
        data[0] = b'X';
        assert!(matches!(
            Object::from_bytes(Bytes::from(data)),
            Err(CodecError::InvalidObject { .. })
        ));
    }

    #[test]
    fn truncated_object_rejected() {
        assert!(Object::from_bytes(Bytes::from_static(b"DOBJ")).is_err());
        assert!(Object::from_bytes(Bytes::new()).is_err());
    }

    #[test]
    fn section_kind_tags() {
        for kind in [SectionKind::Streams, SectionKind::Logs, SectionKind::Unknown(77)] {
            assert_eq!(SectionKind::from_byte(kind.as_byte()), kind);
        }
    }
}
