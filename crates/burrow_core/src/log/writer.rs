//! Log writer and reader.

use crate::error::{CoreError, CoreResult};
use crate::log::record::{compute_crc32, LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
use burrow_storage::StorageBackend;
use parking_lot::Mutex;

/// Header size for log records.
/// magic (4) + version (2) + type (1) + length (4) = 11 bytes
const HEADER_SIZE: usize = 11;

/// CRC size.
const CRC_SIZE: usize = 4;

/// A record read back from the log, with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Offset of the first byte of the frame.
    pub offset: u64,
    /// Offset one past the last byte of the frame.
    pub end: u64,
    /// The decoded record.
    pub record: LogRecord,
}

/// Appends framed records to a storage backend and reads them back.
pub struct LogManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl LogManager {
    /// Creates a log manager over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Frames a record: header, payload, then a CRC over both.
    fn frame(record: &LogRecord, out: &mut Vec<u8>) -> CoreResult<()> {
        let payload = record.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_operation("log record payload too large"))?;

        let start = out.len();
        out.extend_from_slice(&LOG_MAGIC);
        out.extend_from_slice(&LOG_VERSION.to_le_bytes());
        out.push(record.record_type().as_byte());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&payload);

        let crc = compute_crc32(&out[start..]);
        out.extend_from_slice(&crc.to_le_bytes());
        Ok(())
    }

    /// Appends all `records` as one write and makes them durable.
    ///
    /// If any step fails the log is truncated back to where the batch
    /// started, so a failed commit leaves no partial tail behind.
    ///
    /// Returns the number of bytes written.
    pub fn append_batch(&self, records: &[LogRecord]) -> CoreResult<u64> {
        let mut data = Vec::new();
        for record in records {
            Self::frame(record, &mut data)?;
        }

        let mut backend = self.backend.lock();
        let start = backend.size()?;

        let written = backend.append(&data).and_then(|_| {
            backend.flush()?;
            if self.sync_on_commit {
                backend.sync()?;
            }
            Ok(())
        });

        if let Err(err) = written {
            if let Err(truncate_err) = backend.truncate(start) {
                tracing::warn!(
                    offset = start,
                    error = %truncate_err,
                    "failed to discard partial log tail"
                );
            }
            return Err(err.into());
        }

        Ok(data.len() as u64)
    }

    /// Returns the current log size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Discards everything after `size` bytes.
    pub fn truncate(&self, size: u64) -> CoreResult<()> {
        Ok(self.backend.lock().truncate(size)?)
    }

    /// Reads every complete record from the log.
    ///
    /// A truncated trailing record (a crash mid-write) ends the log cleanly.
    /// Bad magic, an unknown type, a future version or a CRC mismatch is
    /// corruption and fails the read.
    pub fn read_all(&self) -> CoreResult<Vec<LogEntry>> {
        let data = self.backend.lock().read_all()?;
        let mut records = Vec::new();
        let mut pos = 0usize;

        while data.len() - pos >= HEADER_SIZE {
            let offset = pos as u64;
            let header = &data[pos..pos + HEADER_SIZE];

            if header[0..4] != LOG_MAGIC {
                return Err(CoreError::log_corruption(format!(
                    "invalid magic at offset {offset}"
                )));
            }

            let version = u16::from_le_bytes([header[4], header[5]]);
            if version > LOG_VERSION {
                return Err(CoreError::log_corruption(format!(
                    "unsupported version {version} at offset {offset}"
                )));
            }

            let type_byte = header[6];
            let record_type = LogRecordType::from_byte(type_byte).ok_or_else(|| {
                CoreError::log_corruption(format!(
                    "unknown record type {type_byte} at offset {offset}"
                ))
            })?;

            let len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
            let frame_len = HEADER_SIZE + len + CRC_SIZE;
            if data.len() - pos < frame_len {
                tracing::debug!(offset, "truncated log record, treating as end of log");
                break;
            }

            let body_end = pos + HEADER_SIZE + len;
            let expected = compute_crc32(&data[pos..body_end]);
            let actual = u32::from_le_bytes([
                data[body_end],
                data[body_end + 1],
                data[body_end + 2],
                data[body_end + 3],
            ]);
            if expected != actual {
                return Err(CoreError::ChecksumMismatch {
                    offset,
                    expected,
                    actual,
                });
            }

            let payload = &data[pos + HEADER_SIZE..body_end];
            let record = LogRecord::decode_payload(record_type, payload)?;
            pos += frame_len;
            records.push(LogEntry {
                offset,
                end: pos as u64,
                record,
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionId;
    use burrow_storage::InMemoryBackend;
    use bytes::Bytes;

    fn transaction(txid: u64) -> Vec<LogRecord> {
        let txid = TransactionId::new(txid);
        vec![
            LogRecord::Begin { txid },
            LogRecord::CreateBucket {
                txid,
                path: vec![b"bucket".to_vec()],
            },
            LogRecord::Put {
                txid,
                path: vec![b"bucket".to_vec(), b"key".to_vec()],
                value: Bytes::from_static(b"value"),
            },
            LogRecord::Commit { txid },
        ]
    }

    #[test]
    fn append_and_read_back() {
        let log = LogManager::new(Box::new(InMemoryBackend::new()), true);
        let written = log.append_batch(&transaction(1)).unwrap();

        assert_eq!(log.size().unwrap(), written);
        let entries = log.read_all().unwrap();
        assert_eq!(entries.last().unwrap().end, written);
        let records: Vec<_> = entries.into_iter().map(|entry| entry.record).collect();
        assert_eq!(records, transaction(1));
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let backend = InMemoryBackend::new();
        let log = LogManager::new(Box::new(backend.clone()), false);
        log.append_batch(&transaction(1)).unwrap();
        log.append_batch(&transaction(2)).unwrap();

        let mut data = backend.data();
        data.truncate(data.len() - 3);
        let damaged = LogManager::new(Box::new(InMemoryBackend::with_data(data)), false);

        let entries = damaged.read_all().unwrap();
        assert_eq!(entries.len(), 7);
        assert_eq!(
            entries.last().unwrap().record,
            LogRecord::Put {
                txid: TransactionId::new(2),
                path: vec![b"bucket".to_vec(), b"key".to_vec()],
                value: Bytes::from_static(b"value"),
            }
        );
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let backend = InMemoryBackend::new();
        let log = LogManager::new(Box::new(backend.clone()), false);
        log.append_batch(&transaction(1)).unwrap();

        let mut data = backend.data();
        data[HEADER_SIZE + 2] ^= 0xFF;
        let damaged = LogManager::new(Box::new(InMemoryBackend::with_data(data)), false);

        assert!(matches!(
            damaged.read_all(),
            Err(CoreError::ChecksumMismatch { offset: 0, .. })
        ));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let damaged = LogManager::new(
            Box::new(InMemoryBackend::with_data(vec![0u8; HEADER_SIZE + CRC_SIZE])),
            false,
        );
        assert!(matches!(
            damaged.read_all(),
            Err(CoreError::LogCorruption { .. })
        ));
    }
}
