//! Property-based test generators using proptest.
//!
//! Provides strategies for generating tenants, data-object paths and time
//! ranges that satisfy the updater's preconditions.

use chrono::{DateTime, Utc};
use metastore_codec::{Label, Labels};
use proptest::prelude::*;

/// Strategy for generating tenant IDs.
pub fn tenant_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating data-object paths.
pub fn object_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("objects/[0-9a-f]{2}/[0-9a-f]{8,16}").expect("Invalid regex")
}

/// Strategy for generating timestamps between 2000 and 2100, second
/// precision.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..4_102_444_800).prop_map(|secs| {
        DateTime::from_timestamp(secs, 0).expect("Timestamp in range")
    })
}

/// Strategy for generating ordered `(min, max)` ranges spanning at most
/// `max_span_secs`.
pub fn time_range_strategy(
    max_span_secs: i64,
) -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (timestamp_strategy(), 0..=max_span_secs.max(0))
        .prop_map(|(min, span)| (min, min + chrono::TimeDelta::seconds(span)))
}

/// Strategy for generating valid label names.
pub fn label_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating label sets with unique names and arbitrary
/// printable values, including quotes and backslashes.
pub fn labels_strategy() -> impl Strategy<Value = Labels> {
    prop::collection::btree_map(label_name_strategy(), "[ -~\n]{0,24}", 1..6).prop_map(|map| {
        Labels::new(map.into_iter().map(|(name, value)| Label::new(name, value)))
            .expect("Generated labels are valid")
    })
}
