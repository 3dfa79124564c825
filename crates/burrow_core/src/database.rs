//! Database facade and recovery.

use crate::bucket::Bucket;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::log::{LogManager, LogRecord};
use crate::stats::{DatabaseStats, StatsSnapshot, TxStats};
use crate::transaction::{apply_record, ReadTransaction, WriteTransaction};
use crate::types::TransactionId;
use burrow_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The main database handle.
///
/// `Database` owns the committed bucket tree and the log it is rebuilt
/// from. All access goes through closure-scoped transactions:
///
/// ```rust
/// use burrow_core::Database;
///
/// let db = Database::open_in_memory()?;
///
/// db.update(|tx| {
///     tx.create_bucket(&["users"])?;
///     tx.put(&["users", "alice"], "admin")
/// })?;
///
/// let role = db.view(|tx| {
///     Ok::<_, burrow_core::CoreError>(
///         tx.bucket(b"users").and_then(|users| users.get(b"alice")).cloned(),
///     )
/// })?;
/// assert_eq!(role.as_deref(), Some(&b"admin"[..]));
/// # Ok::<(), burrow_core::CoreError>(())
/// ```
///
/// A file-backed database holds an exclusive lock on its file until it is
/// dropped.
pub struct Database {
    /// Configuration.
    config: Config,
    /// Path of the store file. None for in-memory databases.
    path: Option<PathBuf>,
    /// Write-ahead log.
    log: LogManager,
    /// Committed root.
    root: RwLock<Arc<Bucket>>,
    /// Serializes write transactions.
    writer: Mutex<()>,
    /// Next transaction ID to hand out.
    next_txid: AtomicU64,
    /// Counters.
    stats: DatabaseStats,
}

impl Database {
    /// Opens a database file, creating it if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process has the file locked (`DatabaseLocked`)
    /// - The log is corrupted (`LogCorruption`, `ChecksumMismatch`)
    /// - I/O errors occur
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database file with custom configuration.
    ///
    /// ```rust,no_run
    /// use burrow_core::{Config, Database};
    /// use std::path::Path;
    ///
    /// let config = Config::default().sync_on_commit(false);
    /// let db = Database::open_with_config(Path::new("my.db"), config)?;
    /// # Ok::<(), burrow_core::CoreError>(())
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        if !config.create_if_missing && !path.exists() {
            return Err(CoreError::invalid_operation(format!(
                "database {} does not exist and create_if_missing is false",
                path.display()
            )));
        }

        let backend = FileBackend::open_exclusive(path).map_err(|err| match err {
            StorageError::Locked(_) => CoreError::DatabaseLocked,
            other => CoreError::Storage(other),
        })?;

        let mut db = Self::open_with_backend(Box::new(backend), config)?;
        db.path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), Config::default())
    }

    /// Opens a database over an arbitrary backend, replaying its log.
    pub fn open_with_backend(backend: Box<dyn StorageBackend>, config: Config) -> CoreResult<Self> {
        let log = LogManager::new(backend, config.sync_on_commit);
        let (root, last_txid) = Self::recover(&log)?;

        Ok(Self {
            config,
            path: None,
            log,
            root: RwLock::new(Arc::new(root)),
            writer: Mutex::new(()),
            next_txid: AtomicU64::new(last_txid + 1),
            stats: DatabaseStats::new(),
        })
    }

    /// Replays committed transactions from the log.
    ///
    /// Returns the rebuilt tree and the highest transaction ID seen. Records
    /// after the last commit belong to a transaction that never finished and
    /// are cut from the log so new appends follow a clean tail.
    fn recover(log: &LogManager) -> CoreResult<(Bucket, u64)> {
        let entries = log.read_all()?;
        let mut root = Bucket::new();
        let mut pending: HashMap<TransactionId, Vec<LogRecord>> = HashMap::new();
        let mut replay_stats = TxStats::default();
        let mut last_txid = 0;
        let mut committed = 0;
        let mut clean_end = 0;

        for entry in entries {
            let txid = entry.record.txid();
            last_txid = last_txid.max(txid.as_u64());

            match entry.record {
                LogRecord::Begin { .. } => {
                    pending.insert(txid, Vec::new());
                }
                LogRecord::Commit { .. } => {
                    let records = pending.remove(&txid).ok_or_else(|| {
                        CoreError::log_corruption(format!(
                            "commit without begin for {txid} at offset {}",
                            entry.offset
                        ))
                    })?;
                    for record in &records {
                        apply_record(&mut root, record, &mut replay_stats)?;
                    }
                    committed += 1;
                    clean_end = entry.end;
                }
                record => pending.entry(txid).or_default().push(record),
            }
        }

        let size = log.size()?;
        if size > clean_end {
            tracing::debug!(
                discarded = size - clean_end,
                "discarding uncommitted log tail"
            );
            log.truncate(clean_end)?;
        }

        tracing::debug!(transactions = committed, last_txid, "recovered log");
        Ok((root, last_txid))
    }

    /// Runs `f` in a read-only transaction over the current snapshot.
    pub fn view<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTransaction<'_>) -> Result<T, E>,
    {
        let tx = self.begin_read();
        f(&tx)
    }

    /// Runs `f` in a read-write transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back if it
    /// returns `Err`; nothing `f` did is visible in the second case.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReadOnly`] without calling `f` if the database
    /// was opened read-only, and any error from `f` or from writing the log.
    pub fn update<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTransaction<'_>) -> Result<T, E>,
        E: From<CoreError>,
    {
        let mut tx = self.begin_write()?;
        match f(&mut tx) {
            Ok(value) => {
                self.commit(tx)?;
                Ok(value)
            }
            Err(err) => {
                self.stats.record_rollback();
                tracing::debug!(txid = %tx.id(), "rolled back transaction");
                Err(err)
            }
        }
    }

    /// Begins a read-only transaction.
    pub fn begin_read(&self) -> ReadTransaction<'_> {
        let root = self.root.read().clone();
        ReadTransaction::new(root, &self.stats)
    }

    fn begin_write(&self) -> CoreResult<WriteTransaction<'_>> {
        if self.config.read_only {
            return Err(CoreError::ReadOnly);
        }
        let guard = self.writer.lock();
        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let root = self.root.read().clone();
        Ok(WriteTransaction::new(guard, txid, root))
    }

    fn commit(&self, tx: WriteTransaction<'_>) -> CoreResult<()> {
        let mut pending = tx.into_pending();
        if pending.records.is_empty() {
            self.stats.record_commit(&pending.stats);
            return Ok(());
        }

        let mut batch = Vec::with_capacity(pending.records.len() + 2);
        batch.push(LogRecord::Begin { txid: pending.txid });
        batch.append(&mut pending.records);
        batch.push(LogRecord::Commit { txid: pending.txid });

        let started = Instant::now();
        if let Err(err) = self.log.append_batch(&batch) {
            self.stats.record_rollback();
            return Err(err);
        }
        pending.stats.write += batch.len() as u64;
        pending.stats.write_time += started.elapsed();

        *self.root.write() = pending.root;
        self.stats.record_commit(&pending.stats);
        tracing::debug!(txid = %pending.txid, records = batch.len(), "committed transaction");
        Ok(())
    }

    /// Returns a snapshot of the store statistics.
    pub fn stats(&self) -> CoreResult<StatsSnapshot> {
        let log_size = self.log.size()?;
        let (bucket_n, key_n) = self.root.read().count();
        Ok(self.stats.snapshot(log_size, bucket_n, key_n))
    }

    /// Returns the path of the store file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the database, releasing the file lock.
    pub fn close(self) -> CoreResult<()> {
        tracing::debug!("closing database");
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket(&["a"])?;
            tx.put(&["a", "k"], "v")
        })
        .unwrap();

        let value = db
            .view(|tx| Ok::<_, CoreError>(tx.bucket(b"a").unwrap().get(b"k").cloned()))
            .unwrap();
        assert_eq!(value.unwrap().as_ref(), b"v");
    }

    #[test]
    fn update_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result: CoreResult<()> = db.update(|tx| {
            tx.create_bucket(&["a"])?;
            Err(CoreError::invalid_operation("stop"))
        });

        assert!(result.is_err());
        assert!(db.begin_read().bucket(b"a").is_none());
        let stats = db.stats().unwrap();
        assert_eq!(stats.rollback_n, 1);
        assert_eq!(stats.log_size, 0);
    }

    #[test]
    fn empty_update_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.update(|_| Ok::<_, CoreError>(())).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.write_tx_n, 1);
        assert_eq!(stats.log_size, 0);
        assert_eq!(stats.tx_stats.write, 0);
    }

    #[test]
    fn read_only_refuses_writes() {
        let db =
            Database::open_with_backend(Box::new(InMemoryBackend::new()), Config::new().read_only(true))
                .unwrap();
        let result = db.update(|tx| tx.create_bucket(&["a"]));
        assert!(matches!(result, Err(CoreError::ReadOnly)));
    }

    #[test]
    fn snapshot_survives_commit() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.create_bucket(&["a"])).unwrap();

        let before = db.begin_read();
        db.update(|tx| tx.put(&["a", "k"], "v")).unwrap();

        assert!(before.bucket(b"a").unwrap().get(b"k").is_none());
        assert!(db.begin_read().bucket(b"a").unwrap().get(b"k").is_some());
    }

    #[test]
    fn stats_count_tree_and_log() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket(&["a"])?;
            tx.create_bucket(&["a", "b"])?;
            tx.put(&["a", "k1"], "1")?;
            tx.put(&["a", "b", "k2"], "2")
        })
        .unwrap();
        db.view(|_| Ok::<_, CoreError>(())).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.bucket_n, 2);
        assert_eq!(stats.key_n, 2);
        assert_eq!(stats.tx_n, 1);
        assert_eq!(stats.open_tx_n, 0);
        assert_eq!(stats.tx_stats.put_n, 2);
        assert_eq!(stats.tx_stats.bucket_create_n, 2);
        assert_eq!(stats.tx_stats.write, 6);
        assert!(stats.log_size > 0);
    }

    #[test]
    fn recovery_resumes_transaction_ids() {
        let backend = InMemoryBackend::new();
        {
            let db = Database::open_with_backend(Box::new(backend.clone()), Config::default())
                .unwrap();
            db.update(|tx| tx.create_bucket(&["a"])).unwrap();
            db.update(|tx| tx.create_bucket(&["b"])).unwrap();
        }

        let db = Database::open_with_backend(Box::new(backend), Config::default()).unwrap();
        let txid = db
            .update(|tx| Ok::<_, CoreError>(tx.id()))
            .unwrap();
        assert_eq!(txid, TransactionId::new(3));
        assert!(db.begin_read().bucket(b"b").is_some());
    }
}
