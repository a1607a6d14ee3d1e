//! # Metastore Testkit
//!
//! Test utilities for the metastore crates.
//!
//! This crate provides:
//! - [`FaultyStore`], an [`ObjectStore`](metastore_storage::ObjectStore)
//!   wrapper that injects failures and runs hooks around store calls
//! - Temporary file-backed stores that clean up after themselves
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```
//! use metastore_storage::{InMemoryObjectStore, ObjectStore};
//! use metastore_testkit::FaultyStore;
//!
//! let store = FaultyStore::new(InMemoryObjectStore::new());
//! store.fail_next_replaces(1);
//! assert!(store.compare_and_replace("a", None, "x".into()).is_err());
//! assert!(store.compare_and_replace("a", None, "x".into()).is_ok());
//! assert_eq!(store.replaces(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
