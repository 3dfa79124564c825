//! # Burrow Core
//!
//! Embedded engine for a hierarchical, transactional bucket store.
//!
//! This crate provides:
//! - A bucket tree where every name is bound to a leaf value or a nested bucket
//! - Snapshot read transactions and serialized copy-on-write write transactions
//! - A write-ahead log with crash recovery
//! - Store statistics

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bucket;
mod config;
mod database;
mod error;
pub mod log;
mod stats;
mod transaction;
mod types;

pub use bucket::{Bucket, Entry};
pub use config::Config;
pub use database::Database;
pub use error::{CoreError, CoreResult};
pub use stats::{DatabaseStats, StatsSnapshot, TxStats};
pub use transaction::{ReadTransaction, WriteTransaction};
pub use types::{EntryKind, TransactionId};
