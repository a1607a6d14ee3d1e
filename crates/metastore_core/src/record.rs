//! Registration records and their stream encoding.
//!
//! A record is stored as a synthetic stream whose labels carry the data
//! object's path and time bounds, with a single empty entry:
//!
//! ```text
//! {__end__="1704070800000000000", __path__="objects/obj-1", __start__="1704067800000000000"}
//! ```

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use metastore_codec::{Builder, Entry, Label, Labels, Stream};

/// Label holding the record's minimum timestamp, Unix nanoseconds.
pub const LABEL_START: &str = "__start__";

/// Label holding the record's maximum timestamp, Unix nanoseconds.
pub const LABEL_END: &str = "__end__";

/// Label holding the data object's path.
pub const LABEL_PATH: &str = "__path__";

/// One data object registered in a metastore window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistrationRecord {
    /// Storage path of the data object.
    pub data_object_path: String,
    /// Earliest timestamp in the data object.
    pub min_timestamp: DateTime<Utc>,
    /// Latest timestamp in the data object.
    pub max_timestamp: DateTime<Utc>,
}

impl RegistrationRecord {
    /// Creates a record.
    pub fn new(
        data_object_path: impl Into<String>,
        min_timestamp: DateTime<Utc>,
        max_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            data_object_path: data_object_path.into(),
            min_timestamp,
            max_timestamp,
        }
    }

    /// Returns true if the record's range intersects `[start, end]`.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.min_timestamp <= end && self.max_timestamp >= start
    }

    /// Checks that the record can be encoded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] if the path is empty or a
    /// timestamp cannot be expressed as Unix nanoseconds.
    pub fn validate(&self) -> CoreResult<()> {
        if self.data_object_path.is_empty() {
            return Err(CoreError::invalid_record("data object path is empty"));
        }
        nanos(self.min_timestamp)?;
        nanos(self.max_timestamp)?;
        Ok(())
    }

    /// Encodes the record as a labeled stream.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`validate`](Self::validate).
    pub fn to_stream(&self) -> CoreResult<Stream> {
        if self.data_object_path.is_empty() {
            return Err(CoreError::invalid_record("data object path is empty"));
        }
        let labels = Labels::new([
            Label::new(LABEL_START, nanos(self.min_timestamp)?.to_string()),
            Label::new(LABEL_END, nanos(self.max_timestamp)?.to_string()),
            Label::new(LABEL_PATH, self.data_object_path.clone()),
        ])
        .map_err(|e| CoreError::invalid_record(e.to_string()))?;
        Ok(Stream::new(labels, vec![Entry::new(0, "")]))
    }

    /// Decodes a record from stream labels.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] if a reserved label is missing
    /// or malformed.
    pub fn from_labels(labels: &Labels) -> CoreResult<Self> {
        let path = labels
            .get(LABEL_PATH)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::invalid_record(format!("missing {LABEL_PATH} in {labels}")))?;
        Ok(Self {
            data_object_path: path.to_string(),
            min_timestamp: parse_nanos(labels, LABEL_START)?,
            max_timestamp: parse_nanos(labels, LABEL_END)?,
        })
    }
}

/// Appends `record` to `builder` as a labeled stream.
///
/// # Errors
///
/// Returns [`CoreError::InvalidRecord`] for unencodable records and
/// [`CoreError::Append`] if the builder refuses the stream.
pub fn append_record(builder: &mut Builder, record: &RegistrationRecord) -> CoreResult<()> {
    let stream = record.to_stream()?;
    builder.append(&stream).map_err(CoreError::Append)
}

fn nanos(ts: DateTime<Utc>) -> CoreResult<i64> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| CoreError::invalid_record(format!("timestamp {ts} out of nanosecond range")))
}

fn parse_nanos(labels: &Labels, name: &str) -> CoreResult<DateTime<Utc>> {
    let value = labels
        .get(name)
        .ok_or_else(|| CoreError::invalid_record(format!("missing {name} in {labels}")))?;
    let nanos: i64 = value
        .parse()
        .map_err(|_| CoreError::invalid_record(format!("{name} is not an integer: {value:?}")))?;
    Ok(DateTime::from_timestamp_nanos(nanos))
}
