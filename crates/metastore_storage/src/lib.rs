//! # Metastore Storage
//!
//! Object store trait and implementations for the data-object metastore.
//!
//! This crate provides the lowest-level storage abstraction: a flat
//! namespace of immutable blobs that can only be replaced as a whole.
//! Stores are **opaque byte stores** - they do not interpret the metastore
//! objects they hold.
//!
//! ## Design Principles
//!
//! - Whole-object reads and whole-object replaces, no partial append
//! - Every read returns a [`Generation`] token identifying the content
//! - Replaces are conditional on the generation the caller last observed;
//!   this is the only concurrency-control primitive writers get
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Available Stores
//!
//! - [`InMemoryObjectStore`] - For testing and ephemeral storage
//! - [`FileObjectStore`] - Objects as files under a root directory
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use metastore_storage::{InMemoryObjectStore, ObjectStore};
//!
//! let store = InMemoryObjectStore::new();
//! let generation = store
//!     .compare_and_replace("a/b.store", None, Bytes::from_static(b"v1"))
//!     .unwrap();
//!
//! let current = store.read("a/b.store").unwrap().unwrap();
//! assert_eq!(current.generation, generation);
//! assert_eq!(&current.data[..], b"v1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{Generation, ObjectStore, ObjectVersion};
pub use error::{StorageError, StorageResult};
pub use file::FileObjectStore;
pub use memory::InMemoryObjectStore;
