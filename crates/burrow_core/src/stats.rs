//! Store statistics.
//!
//! Counters are atomic and can be read while transactions are in flight.
//! Everything is monotonically increasing except `open_tx_n`, which is a
//! gauge of read transactions currently alive.
//!
//! # Usage
//!
//! ```rust
//! use burrow_core::Database;
//!
//! let db = Database::open_in_memory()?;
//! db.update(|tx| tx.create_bucket(&["users"]))?;
//!
//! let stats = db.stats()?;
//! assert_eq!(stats.write_tx_n, 1);
//! assert_eq!(stats.tx_stats.bucket_create_n, 1);
//! # Ok::<(), burrow_core::CoreError>(())
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters accumulated by a single write transaction.
///
/// Merged into [`DatabaseStats`] when the transaction commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    /// Leaf puts.
    pub put_n: u64,
    /// Leaf deletes.
    pub delete_n: u64,
    /// Buckets created.
    pub bucket_create_n: u64,
    /// Buckets deleted.
    pub bucket_delete_n: u64,
    /// Shared bucket nodes copied on write.
    pub node_copy_n: u64,
    /// Log records written.
    pub write: u64,
    /// Time spent writing and flushing the log.
    pub write_time: Duration,
}

/// Store statistics.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    tx_n: AtomicU64,
    open_tx_n: AtomicU64,
    write_tx_n: AtomicU64,
    rollback_n: AtomicU64,

    put_n: AtomicU64,
    delete_n: AtomicU64,
    bucket_create_n: AtomicU64,
    bucket_delete_n: AtomicU64,
    node_copy_n: AtomicU64,
    write: AtomicU64,
    write_time_nanos: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read transaction start.
    pub(crate) fn record_read_begin(&self) {
        self.tx_n.fetch_add(1, Ordering::Relaxed);
        self.open_tx_n.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a read transaction end.
    pub(crate) fn record_read_end(&self) {
        self.open_tx_n.fetch_sub(1, Ordering::Relaxed);
    }

    /// Records a committed write transaction and folds in its counters.
    pub(crate) fn record_commit(&self, tx: &TxStats) {
        self.write_tx_n.fetch_add(1, Ordering::Relaxed);
        self.put_n.fetch_add(tx.put_n, Ordering::Relaxed);
        self.delete_n.fetch_add(tx.delete_n, Ordering::Relaxed);
        self.bucket_create_n
            .fetch_add(tx.bucket_create_n, Ordering::Relaxed);
        self.bucket_delete_n
            .fetch_add(tx.bucket_delete_n, Ordering::Relaxed);
        self.node_copy_n.fetch_add(tx.node_copy_n, Ordering::Relaxed);
        self.write.fetch_add(tx.write, Ordering::Relaxed);
        let nanos = u64::try_from(tx.write_time.as_nanos()).unwrap_or(u64::MAX);
        self.write_time_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Records a rolled-back write transaction.
    pub(crate) fn record_rollback(&self) {
        self.rollback_n.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of read transactions started.
    pub fn tx_n(&self) -> u64 {
        self.tx_n.load(Ordering::Relaxed)
    }

    /// Returns the number of read transactions currently open.
    pub fn open_tx_n(&self) -> u64 {
        self.open_tx_n.load(Ordering::Relaxed)
    }

    /// Returns the number of committed write transactions.
    pub fn write_tx_n(&self) -> u64 {
        self.write_tx_n.load(Ordering::Relaxed)
    }

    /// Returns the number of rolled-back write transactions.
    pub fn rollback_n(&self) -> u64 {
        self.rollback_n.load(Ordering::Relaxed)
    }

    /// Returns the accumulated write transaction counters.
    pub fn tx_stats(&self) -> TxStats {
        TxStats {
            put_n: self.put_n.load(Ordering::Relaxed),
            delete_n: self.delete_n.load(Ordering::Relaxed),
            bucket_create_n: self.bucket_create_n.load(Ordering::Relaxed),
            bucket_delete_n: self.bucket_delete_n.load(Ordering::Relaxed),
            node_copy_n: self.node_copy_n.load(Ordering::Relaxed),
            write: self.write.load(Ordering::Relaxed),
            write_time: Duration::from_nanos(self.write_time_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Takes a snapshot of the counters.
    ///
    /// Sizes are supplied by the caller since they are measured, not counted.
    pub(crate) fn snapshot(&self, log_size: u64, bucket_n: u64, key_n: u64) -> StatsSnapshot {
        StatsSnapshot {
            tx_n: self.tx_n(),
            open_tx_n: self.open_tx_n(),
            write_tx_n: self.write_tx_n(),
            rollback_n: self.rollback_n(),
            log_size,
            bucket_n,
            key_n,
            tx_stats: self.tx_stats(),
        }
    }
}

/// A point-in-time snapshot of store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Read transactions started.
    pub tx_n: u64,
    /// Read transactions currently open.
    pub open_tx_n: u64,
    /// Committed write transactions.
    pub write_tx_n: u64,
    /// Rolled-back write transactions.
    pub rollback_n: u64,
    /// Size of the log in bytes.
    pub log_size: u64,
    /// Buckets in the committed tree, at every depth.
    pub bucket_n: u64,
    /// Leaves in the committed tree, at every depth.
    pub key_n: u64,
    /// Accumulated write transaction counters.
    pub tx_stats: TxStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn read_gauge_goes_up_and_down() {
        let stats = DatabaseStats::new();
        stats.record_read_begin();
        stats.record_read_begin();
        stats.record_read_end();

        assert_eq!(stats.tx_n(), 2);
        assert_eq!(stats.open_tx_n(), 1);
    }

    #[test]
    fn commit_folds_transaction_counters() {
        let stats = DatabaseStats::new();
        let tx = TxStats {
            put_n: 3,
            bucket_create_n: 1,
            write: 6,
            write_time: Duration::from_micros(5),
            ..TxStats::default()
        };
        stats.record_commit(&tx);
        stats.record_commit(&tx);

        let merged = stats.tx_stats();
        assert_eq!(stats.write_tx_n(), 2);
        assert_eq!(merged.put_n, 6);
        assert_eq!(merged.bucket_create_n, 2);
        assert_eq!(merged.write, 12);
        assert_eq!(merged.write_time, Duration::from_micros(10));
    }

    #[test]
    fn snapshot_carries_sizes() {
        let stats = DatabaseStats::new();
        stats.record_rollback();

        let snapshot = stats.snapshot(128, 2, 5);
        assert_eq!(snapshot.rollback_n, 1);
        assert_eq!(snapshot.log_size, 128);
        assert_eq!(snapshot.bucket_n, 2);
        assert_eq!(snapshot.key_n, 5);
    }

    #[test]
    fn concurrent_updates() {
        let stats = Arc::new(DatabaseStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_read_begin();
                        stats.record_read_end();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.tx_n(), 400);
        assert_eq!(stats.open_tx_n(), 0);
    }
}
