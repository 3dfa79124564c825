//! Error types for burrow core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] burrow_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The write-ahead log is corrupted or invalid.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected in a log record.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the damaged record.
        offset: u64,
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// A bucket on the requested path does not exist.
    #[error("bucket not found: {path}")]
    BucketNotFound {
        /// Display form of the missing path.
        path: String,
    },

    /// A bucket with that name already exists.
    #[error("bucket already exists: {name}")]
    BucketExists {
        /// Display form of the bucket name.
        name: String,
    },

    /// The name is bound to the other kind of entry (leaf vs bucket).
    #[error("incompatible value: {name}")]
    IncompatibleValue {
        /// Display form of the conflicting name.
        name: String,
    },

    /// Leaf entries cannot live at the root of the store.
    #[error("cannot store a value at the root: {name}")]
    RootLeaf {
        /// Display form of the rejected key.
        name: String,
    },

    /// Bucket and key names must be non-empty.
    #[error("bucket and key names must not be empty")]
    InvalidName,

    /// The store was opened read-only.
    #[error("database is read-only")]
    ReadOnly,

    /// Another process has exclusive access.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates a bucket-not-found error for a byte path.
    pub fn bucket_not_found<S: AsRef<[u8]>>(path: &[S]) -> Self {
        Self::BucketNotFound {
            path: display_path(path),
        }
    }

    /// Creates a bucket-exists error.
    pub fn bucket_exists(name: &[u8]) -> Self {
        Self::BucketExists {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates an incompatible-value error.
    pub fn incompatible_value(name: &[u8]) -> Self {
        Self::IncompatibleValue {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates a root-leaf error.
    pub fn root_leaf(name: &[u8]) -> Self {
        Self::RootLeaf {
            name: String::from_utf8_lossy(name).into_owned(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}

/// Renders a byte path as `a/b/c` for error messages.
pub(crate) fn display_path<S: AsRef<[u8]>>(path: &[S]) -> String {
    path.iter()
        .map(|segment| String::from_utf8_lossy(segment.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
