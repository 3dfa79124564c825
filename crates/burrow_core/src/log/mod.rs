//! Write-ahead log.
//!
//! Every committed write transaction is appended to the log as one batch:
//! a `Begin` record, one record per mutation, and a `Commit` record. The
//! bucket tree is rebuilt on open by replaying committed transactions in
//! order.
//!
//! ## Record Format
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The CRC covers everything before it. A record cut short by a crash ends
//! the log; a damaged record is reported as corruption.

mod record;
mod writer;

pub use record::{compute_crc32, BytePath, LogRecord, LogRecordType, LOG_MAGIC, LOG_VERSION};
pub use writer::{LogEntry, LogManager};
