//! Replays existing metastore content into a builder.
//!
//! The object store has no partial append, so every update re-encodes the
//! whole window object: stored records are read back in bounded batches and
//! appended to a fresh builder before the new record is added.

use crate::context::Context;
use crate::error::{CoreError, CoreResult};
use bytes::Bytes;
use metastore_codec::streams::{self, StreamRow};
use metastore_codec::{Builder, CodecError, Entry, Object, Stream};
use tracing::debug;

/// Counts from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Streams sections visited.
    pub sections: usize,
    /// Records appended to the builder.
    pub records: usize,
}

/// Appends every record stored in `data` to `builder`, in stored order.
///
/// Records are not deduplicated or reordered. `ctx` is checked between
/// batches of `batch_size` rows.
///
/// # Errors
///
/// - [`CoreError::Decode`] if `data` is not a valid object
/// - [`CoreError::Append`] if the builder refuses a record
/// - [`CoreError::Cancelled`] / [`CoreError::DeadlineExceeded`]
pub fn replay(
    ctx: &Context,
    path: &str,
    data: Bytes,
    builder: &mut Builder,
    batch_size: usize,
) -> CoreResult<ReplayStats> {
    let stats = visit_streams(ctx, path, data, batch_size, |row| {
        let stream = Stream::new(row.labels, vec![Entry::new(row.min_time, "")]);
        builder.append(&stream).map_err(CoreError::Append)
    })?;
    debug!(path, records = stats.records, sections = stats.sections, "replayed metastore object");
    Ok(stats)
}

/// Decodes `data` and calls `visit` for each stream row of each streams
/// section, reading `batch_size` rows at a time.
pub(crate) fn visit_streams<F>(
    ctx: &Context,
    path: &str,
    data: Bytes,
    batch_size: usize,
    mut visit: F,
) -> CoreResult<ReplayStats>
where
    F: FnMut(StreamRow) -> CoreResult<()>,
{
    let decode = |source: CodecError| CoreError::Decode {
        path: path.to_string(),
        source,
    };

    let object = Object::from_bytes(data).map_err(decode)?;
    let mut stats = ReplayStats::default();
    let mut batch = Vec::with_capacity(batch_size);

    for section in object.sections().iter().filter(|s| streams::check_section(s)) {
        let opened = streams::open(section).map_err(decode)?;
        let mut reader = streams::RowReader::new(&opened);
        stats.sections += 1;

        loop {
            ctx.check()?;
            let n = reader.read(&mut batch, batch_size.max(1)).map_err(decode)?;
            if n == 0 {
                break;
            }
            for row in batch.drain(..) {
                visit(row)?;
                stats.records += 1;
            }
        }
    }
    Ok(stats)
}
