//! Log record types and serialization.

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionId;
use bytes::Bytes;

/// Magic bytes identifying a log record.
pub const LOG_MAGIC: [u8; 4] = *b"BRWL";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// A byte path from the root: every segment but the last names a bucket,
/// the last names the entry the record acts on.
pub type BytePath = Vec<Vec<u8>>;

/// Type of log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogRecordType {
    /// Begin a write transaction.
    Begin = 1,
    /// Create a bucket.
    CreateBucket = 2,
    /// Delete a bucket and its contents.
    DeleteBucket = 3,
    /// Put a leaf value.
    Put = 4,
    /// Delete a leaf value.
    Delete = 5,
    /// Commit a write transaction.
    Commit = 6,
}

impl LogRecordType {
    /// Parses an on-disk type byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::CreateBucket),
            3 => Some(Self::DeleteBucket),
            4 => Some(Self::Put),
            5 => Some(Self::Delete),
            6 => Some(Self::Commit),
            _ => None,
        }
    }

    /// The on-disk type byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A log record describing one step of a write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Begin a write transaction.
    Begin {
        /// Owning transaction.
        txid: TransactionId,
    },

    /// Create the bucket at `path`.
    CreateBucket {
        /// Owning transaction.
        txid: TransactionId,
        /// Path of the new bucket.
        path: BytePath,
    },

    /// Delete the bucket at `path`, recursively.
    DeleteBucket {
        /// Owning transaction.
        txid: TransactionId,
        /// Path of the bucket.
        path: BytePath,
    },

    /// Bind the leaf at `path` to `value`.
    Put {
        /// Owning transaction.
        txid: TransactionId,
        /// Path of the leaf.
        path: BytePath,
        /// New value.
        value: Bytes,
    },

    /// Delete the leaf at `path`.
    Delete {
        /// Owning transaction.
        txid: TransactionId,
        /// Path of the leaf.
        path: BytePath,
    },

    /// Commit a write transaction.
    Commit {
        /// Owning transaction.
        txid: TransactionId,
    },
}

impl LogRecord {
    /// Maximum size of a single path segment or value.
    pub const MAX_FIELD_SIZE: usize = u32::MAX as usize;

    /// Maximum number of segments in a path.
    pub const MAX_PATH_DEPTH: usize = u16::MAX as usize;

    /// The type byte this record is framed with.
    #[must_use]
    pub fn record_type(&self) -> LogRecordType {
        match self {
            Self::Begin { .. } => LogRecordType::Begin,
            Self::CreateBucket { .. } => LogRecordType::CreateBucket,
            Self::DeleteBucket { .. } => LogRecordType::DeleteBucket,
            Self::Put { .. } => LogRecordType::Put,
            Self::Delete { .. } => LogRecordType::Delete,
            Self::Commit { .. } => LogRecordType::Commit,
        }
    }

    /// Returns the transaction ID of the record.
    #[must_use]
    pub fn txid(&self) -> TransactionId {
        match self {
            Self::Begin { txid }
            | Self::CreateBucket { txid, .. }
            | Self::DeleteBucket { txid, .. }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid } => *txid,
        }
    }

    /// Encodes the payload bytes that go between header and checksum.
    ///
    /// # Errors
    ///
    /// Returns an error if a path is deeper than [`Self::MAX_PATH_DEPTH`] or a
    /// segment or value exceeds [`Self::MAX_FIELD_SIZE`].
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.txid().as_u64().to_le_bytes());

        match self {
            Self::Begin { .. } | Self::Commit { .. } => {}
            Self::CreateBucket { path, .. }
            | Self::DeleteBucket { path, .. }
            | Self::Delete { path, .. } => encode_path(&mut buf, path)?,
            Self::Put { path, value, .. } => {
                encode_path(&mut buf, path)?;
                encode_field(&mut buf, value)?;
            }
        }

        Ok(buf)
    }

    /// Rebuilds a record from a decoded type byte and its payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LogCorruption`] if the payload is short, has
    /// trailing bytes, or carries an empty path.
    pub fn decode_payload(record_type: LogRecordType, payload: &[u8]) -> CoreResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let txid = TransactionId::new(reader.u64()?);

        let record = match record_type {
            LogRecordType::Begin => Self::Begin { txid },
            LogRecordType::Commit => Self::Commit { txid },
            LogRecordType::CreateBucket => Self::CreateBucket {
                txid,
                path: reader.path()?,
            },
            LogRecordType::DeleteBucket => Self::DeleteBucket {
                txid,
                path: reader.path()?,
            },
            LogRecordType::Delete => Self::Delete {
                txid,
                path: reader.path()?,
            },
            LogRecordType::Put => {
                let path = reader.path()?;
                let value = Bytes::from(reader.field()?);
                Self::Put { txid, path, value }
            }
        };

        reader.finish(record_type)?;
        Ok(record)
    }
}

fn encode_path(buf: &mut Vec<u8>, path: &[Vec<u8>]) -> CoreResult<()> {
    let depth = u16::try_from(path.len()).map_err(|_| {
        CoreError::invalid_operation(format!(
            "path of {} segments exceeds maximum depth of {}",
            path.len(),
            LogRecord::MAX_PATH_DEPTH
        ))
    })?;
    buf.extend_from_slice(&depth.to_le_bytes());
    for segment in path {
        encode_field(buf, segment)?;
    }
    Ok(())
}

fn encode_field(buf: &mut Vec<u8>, field: &[u8]) -> CoreResult<()> {
    let len = u32::try_from(field.len()).map_err(|_| {
        CoreError::invalid_operation(format!(
            "field of {} bytes exceeds maximum of {} bytes",
            field.len(),
            LogRecord::MAX_FIELD_SIZE
        ))
    })?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(field);
    Ok(())
}

struct PayloadReader<'a> {
    payload: &'a [u8],
    cursor: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, cursor: 0 }
    }

    fn take(&mut self, len: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(len)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| CoreError::log_corruption("unexpected end of payload"))?;
        let bytes = &self.payload[self.cursor..end];
        self.cursor = end;
        Ok(bytes)
    }

    fn u64(&mut self) -> CoreResult<u64> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| CoreError::log_corruption("invalid u64"))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| CoreError::log_corruption("invalid u32"))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn u16(&mut self) -> CoreResult<u16> {
        let bytes: [u8; 2] = self
            .take(2)?
            .try_into()
            .map_err(|_| CoreError::log_corruption("invalid u16"))?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn field(&mut self) -> CoreResult<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn path(&mut self) -> CoreResult<BytePath> {
        let depth = self.u16()? as usize;
        if depth == 0 {
            return Err(CoreError::log_corruption("empty path in record"));
        }
        (0..depth).map(|_| self.field()).collect()
    }

    fn finish(&self, record_type: LogRecordType) -> CoreResult<()> {
        if self.cursor != self.payload.len() {
            return Err(CoreError::log_corruption(format!(
                "trailing bytes in {record_type:?} record: expected {} bytes, got {}",
                self.cursor,
                self.payload.len()
            )));
        }
        Ok(())
    }
}

/// Computes the CRC32 (IEEE) checksum of `data`.
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
