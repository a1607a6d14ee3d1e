//! # Metastore Codec
//!
//! Columnar data-object builder and decoder.
//!
//! A data object is a sequence of typed sections. Each section stores its
//! rows column-wise in independently decodable pages, so readers can
//! stream large sections with bounded memory.
//!
//! - [`Builder`] accumulates labeled [`Stream`]s and encodes them on
//!   [`Builder::flush`]; it is reusable after [`Builder::reset`]
//! - [`Object`] validates framing and exposes the sections
//! - [`streams`] and [`logs`] open and read their section kinds
//!
//! ## Usage
//!
//! ```
//! use bytes::Bytes;
//! use metastore_codec::{streams, Builder, BuilderConfig, Entry, Label, Labels, Object, Stream};
//!
//! let mut builder = Builder::new(BuilderConfig::default()).unwrap();
//! let labels = Labels::new(vec![Label::new("app", "api")]).unwrap();
//! builder.append(&Stream::new(labels, vec![Entry::new(1, "hello")])).unwrap();
//!
//! let mut buf = Vec::new();
//! builder.flush(&mut buf).unwrap();
//!
//! let object = Object::from_bytes(Bytes::from(buf)).unwrap();
//! let section = object.sections().iter().find(|s| streams::check_section(s)).unwrap();
//! let mut reader = streams::RowReader::new(&streams::open(section).unwrap());
//! let mut batch = Vec::new();
//! assert_eq!(reader.read(&mut batch, 100).unwrap(), 1);
//! assert_eq!(batch[0].labels.get("app"), Some("api"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod error;
mod labels;
pub mod logs;
mod object;
mod page;
pub mod streams;
mod types;

pub use builder::{Builder, BuilderConfig};
pub use error::{CodecError, CodecResult};
pub use labels::{Label, Labels};
pub use object::{compute_crc32, Object, Section, SectionKind, FORMAT_VERSION, MAGIC};
pub use types::{Entry, Stream};
