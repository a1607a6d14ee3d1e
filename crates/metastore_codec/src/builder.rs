//! Stateful data-object builder.

use crate::error::{CodecError, CodecResult};
use crate::logs::{LogRow, LogsSectionBuilder};
use crate::object::{write_object, SectionKind};
use crate::streams::{StreamRow, StreamsSectionBuilder};
use crate::types::Stream;
use std::io::Write;

/// Size targets for a [`Builder`].
///
/// Defaults are tuned for metastore objects, which are much smaller than
/// the data objects they index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Appends are refused once the object would grow past this size.
    pub target_object_size: usize,
    /// Rows are split into pages of at most this estimated size.
    pub target_page_size: usize,
    /// A section is sealed once its buffered rows reach this size.
    pub target_section_size: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            target_object_size: 32 * 1024 * 1024,
            target_page_size: 4 * 1024 * 1024,
            target_section_size: 4 * 1024 * 1024,
        }
    }
}

impl BuilderConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target object size.
    #[must_use]
    pub const fn with_target_object_size(mut self, size: usize) -> Self {
        self.target_object_size = size;
        self
    }

    /// Sets the target page size.
    #[must_use]
    pub const fn with_target_page_size(mut self, size: usize) -> Self {
        self.target_page_size = size;
        self
    }

    /// Sets the target section size.
    #[must_use]
    pub const fn with_target_section_size(mut self, size: usize) -> Self {
        self.target_section_size = size;
        self
    }

    /// Checks that sizes are non-zero and nested page <= section <= object.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> CodecResult<()> {
        if self.target_page_size == 0 {
            return Err(CodecError::InvalidConfig(
                "target_page_size must be greater than zero".into(),
            ));
        }
        if self.target_section_size < self.target_page_size {
            return Err(CodecError::InvalidConfig(format!(
                "target_section_size ({}) must be >= target_page_size ({})",
                self.target_section_size, self.target_page_size
            )));
        }
        if self.target_object_size < self.target_section_size {
            return Err(CodecError::InvalidConfig(format!(
                "target_object_size ({}) must be >= target_section_size ({})",
                self.target_object_size, self.target_section_size
            )));
        }
        Ok(())
    }
}

/// Accumulates streams and encodes them into a data object.
///
/// The builder buffers rows for the current section and seals it into an
/// encoded section once it reaches the target section size. [`flush`]
/// writes the whole object and leaves the builder empty; [`reset`]
/// discards everything without writing.
///
/// A builder is single-owner state: reuse it serially, resetting between
/// unrelated objects.
///
/// [`flush`]: Builder::flush
/// [`reset`]: Builder::reset
#[derive(Debug)]
pub struct Builder {
    config: BuilderConfig,
    streams: StreamsSectionBuilder,
    logs: LogsSectionBuilder,
    sealed: Vec<(SectionKind, Vec<u8>)>,
    sealed_size: usize,
    next_stream_id: u64,
    appended: usize,
}

impl Builder {
    /// Creates an empty builder.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: BuilderConfig) -> CodecResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            streams: StreamsSectionBuilder::default(),
            logs: LogsSectionBuilder::default(),
            sealed: Vec::new(),
            sealed_size: 0,
            next_stream_id: 1,
            appended: 0,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Appends a stream.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidLabels`] if the stream has no labels
    /// - [`CodecError::BuilderFull`] if the builder already holds data and
    ///   the stream would push it past the target object size
    pub fn append(&mut self, stream: &Stream) -> CodecResult<()> {
        if stream.labels.is_empty() {
            return Err(CodecError::invalid_labels("stream has no labels"));
        }

        let size = stream.estimated_size();
        let current = self.estimated_size();
        if current > 0 && current + size > self.config.target_object_size {
            return Err(CodecError::BuilderFull);
        }

        let id = self.next_stream_id;
        self.next_stream_id += 1;

        let min_time = stream.entries.iter().map(|e| e.timestamp).min().unwrap_or(0);
        let max_time = stream.entries.iter().map(|e| e.timestamp).max().unwrap_or(0);
        let uncompressed_size = stream.entries.iter().map(|e| e.line.len() as u64).sum();

        self.streams.push(
            StreamRow {
                id,
                labels: stream.labels.clone(),
                min_time,
                max_time,
                rows: stream.entries.len() as u64,
                uncompressed_size,
            },
            size,
        );
        for entry in &stream.entries {
            self.logs.push(LogRow {
                stream_id: id,
                timestamp: entry.timestamp,
                line: entry.line.clone(),
            });
        }
        self.appended += 1;

        if self.streams.estimated_size() >= self.config.target_section_size {
            self.seal()?;
        }
        Ok(())
    }

    /// Number of streams appended since the last flush or reset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.appended
    }

    /// Returns true if nothing has been appended since the last flush or
    /// reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    /// Estimated encoded size of everything buffered.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        self.sealed_size + self.streams.estimated_size()
    }

    /// Writes the object to `w` and resets the builder.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BuilderEmpty`] if nothing was appended, or an
    /// encoding or I/O error. The builder is reset even on error.
    pub fn flush<W: Write>(&mut self, w: &mut W) -> CodecResult<u64> {
        if self.is_empty() {
            return Err(CodecError::BuilderEmpty);
        }

        let result = self
            .seal()
            .and_then(|()| write_object(w, &self.sealed));
        self.reset();
        result
    }

    /// Discards all buffered state.
    pub fn reset(&mut self) {
        self.streams.clear();
        self.logs.clear();
        self.sealed.clear();
        self.sealed_size = 0;
        self.next_stream_id = 1;
        self.appended = 0;
    }

    fn seal(&mut self) -> CodecResult<()> {
        if self.streams.is_empty() && self.logs.is_empty() {
            return Ok(());
        }

        let page_size = self.config.target_page_size;
        let streams = self.streams.encode(page_size)?;
        let logs = self.logs.encode(page_size)?;

        self.sealed_size += streams.len() + logs.len();
        self.sealed.push((SectionKind::Streams, streams));
        self.sealed.push((SectionKind::Logs, logs));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{Label, Labels};
    use crate::object::Object;
    use crate::types::Entry;
    use crate::{logs, streams};
    use bytes::Bytes;

    fn stream(path: &str) -> Stream {
        Stream::new(
            Labels::new(vec![Label::new("__path__", path)]).unwrap(),
            vec![Entry::new(5, "")],
        )
    }

    fn read_paths(data: Vec<u8>) -> Vec<String> {
        let object = Object::from_bytes(Bytes::from(data)).unwrap();
        let mut paths = Vec::new();
        for section in object.sections().iter().filter(|s| streams::check_section(s)) {
            let mut reader = streams::RowReader::new(&streams::open(section).unwrap());
            let mut batch = Vec::new();
            while reader.read(&mut batch, 2).unwrap() > 0 {
                paths.extend(
                    batch
                        .iter()
                        .map(|r| r.labels.get("__path__").unwrap().to_string()),
                );
            }
        }
        paths
    }

    #[test]
    fn config_validation() {
        assert!(BuilderConfig::default().validate().is_ok());
        assert!(BuilderConfig::default()
            .with_target_page_size(0)
            .validate()
            .is_err());
        assert!(BuilderConfig::default()
            .with_target_section_size(1)
            .validate()
            .is_err());
        assert!(Builder::new(BuilderConfig::default().with_target_object_size(1)).is_err());
    }

    #[test]
    fn flush_writes_appended_streams_in_order() {
        let mut builder = Builder::new(BuilderConfig::default()).unwrap();
        for path in ["a", "b", "c"] {
            builder.append(&stream(path)).unwrap();
        }
        assert_eq!(builder.len(), 3);

        let mut out = Vec::new();
        let written = builder.flush(&mut out).unwrap();
        assert_eq!(written as usize, out.len());
        assert!(builder.is_empty());
        assert_eq!(read_paths(out), vec!["a", "b", "c"]);
    }

    #[test]
    fn small_section_target_produces_many_sections() {
        let config = BuilderConfig::default()
            .with_target_page_size(64)
            .with_target_section_size(128);
        let mut builder = Builder::new(config).unwrap();
        let paths: Vec<String> = (0..20).map(|i| format!("objects/{i:04}")).collect();
        for path in &paths {
            builder.append(&stream(path)).unwrap();
        }

        let mut out = Vec::new();
        builder.flush(&mut out).unwrap();

        let object = Object::from_bytes(Bytes::from(out.clone())).unwrap();
        let stream_sections = object
            .sections()
            .iter()
            .filter(|s| streams::check_section(s))
            .count();
        assert!(stream_sections > 1);
        assert_eq!(read_paths(out), paths);
    }

    #[test]
    fn entries_land_in_logs_section() {
        let mut builder = Builder::new(BuilderConfig::default()).unwrap();
        builder.append(&stream("a")).unwrap();
        let mut out = Vec::new();
        builder.flush(&mut out).unwrap();

        let object = Object::from_bytes(Bytes::from(out)).unwrap();
        let section = object
            .sections()
            .iter()
            .find(|s| logs::check_section(s))
            .unwrap();
        let mut reader = logs::RowReader::new(&logs::open(section).unwrap());
        let mut batch = Vec::new();
        assert_eq!(reader.read(&mut batch, 10).unwrap(), 1);
        assert_eq!(batch[0].timestamp, 5);
        assert_eq!(batch[0].line, "");
    }

    #[test]
    fn reset_discards_buffered_streams() {
        let mut builder = Builder::new(BuilderConfig::default()).unwrap();
        builder.append(&stream("stale")).unwrap();
        builder.reset();
        assert!(builder.is_empty());
        assert_eq!(builder.estimated_size(), 0);

        builder.append(&stream("fresh")).unwrap();
        let mut out = Vec::new();
        builder.flush(&mut out).unwrap();
        assert_eq!(read_paths(out), vec!["fresh"]);
    }

    #[test]
    fn flush_empty_builder_fails() {
        let mut builder = Builder::new(BuilderConfig::default()).unwrap();
        assert_eq!(builder.flush(&mut Vec::<u8>::new()), Err(CodecError::BuilderEmpty));
    }

    #[test]
    fn append_without_labels_fails() {
        let mut builder = Builder::new(BuilderConfig::default()).unwrap();
        let result = builder.append(&Stream::new(Labels::default(), Vec::new()));
        assert!(matches!(result, Err(CodecError::InvalidLabels { .. })));
        assert!(builder.is_empty());
    }

    #[test]
    fn append_past_target_object_size_fails() {
        let config = BuilderConfig::default()
            .with_target_page_size(64)
            .with_target_section_size(64)
            .with_target_object_size(200);
        let mut builder = Builder::new(config).unwrap();

        let mut result = Ok(());
        for i in 0..100 {
            result = builder.append(&stream(&format!("objects/{i:04}")));
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(CodecError::BuilderFull));
        assert!(!builder.is_empty());
    }
}
