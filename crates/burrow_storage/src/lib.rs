//! # burrow storage
//!
//! Byte-level storage backends for the burrow bucket store.
//!
//! A backend is an **append-only byte store**: it knows nothing about log
//! records, buckets or transactions. `burrow_core` owns every byte of
//! format interpretation and uses a backend to hold its write-ahead log.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and tests; clones share data
//! - [`FileBackend`] - a single file, optionally held under an exclusive lock
//!
//! ## Example
//!
//! ```rust
//! use burrow_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
