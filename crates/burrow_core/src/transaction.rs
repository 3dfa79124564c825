//! Read and write transactions.
//!
//! A [`ReadTransaction`] holds a snapshot of the committed root and never
//! observes later commits. A [`WriteTransaction`] holds the single-writer
//! lock for its whole life, mutates a private copy-on-write root and buffers
//! one log record per mutation. The [`Database`](crate::Database) decides
//! whether the buffered records are committed or dropped.

use crate::bucket::Bucket;
use crate::error::{CoreError, CoreResult};
use crate::log::{BytePath, LogRecord};
use crate::stats::{DatabaseStats, TxStats};
use crate::types::{EntryKind, TransactionId};
use bytes::Bytes;
use parking_lot::MutexGuard;
use std::sync::Arc;

/// A read-only view of the store.
pub struct ReadTransaction<'db> {
    root: Arc<Bucket>,
    stats: &'db DatabaseStats,
}

impl<'db> ReadTransaction<'db> {
    pub(crate) fn new(root: Arc<Bucket>, stats: &'db DatabaseStats) -> Self {
        stats.record_read_begin();
        Self { root, stats }
    }

    /// Returns the root bucket of the snapshot.
    #[must_use]
    pub fn root(&self) -> &Bucket {
        &self.root
    }

    /// Returns the top-level bucket named `name`.
    #[must_use]
    pub fn bucket(&self, name: &[u8]) -> Option<&Bucket> {
        self.root.bucket(name)
    }
}

impl Drop for ReadTransaction<'_> {
    fn drop(&mut self) {
        self.stats.record_read_end();
    }
}

/// A read-write transaction.
///
/// Every mutator takes the full path of the entry it acts on: all segments
/// but the last name buckets from the root, the last names the target.
pub struct WriteTransaction<'db> {
    _guard: MutexGuard<'db, ()>,
    txid: TransactionId,
    root: Arc<Bucket>,
    records: Vec<LogRecord>,
    stats: TxStats,
}

impl<'db> WriteTransaction<'db> {
    pub(crate) fn new(guard: MutexGuard<'db, ()>, txid: TransactionId, root: Arc<Bucket>) -> Self {
        Self {
            _guard: guard,
            txid,
            root,
            records: Vec::new(),
            stats: TxStats::default(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.txid
    }

    /// Returns the root bucket, including this transaction's own writes.
    #[must_use]
    pub fn root(&self) -> &Bucket {
        &self.root
    }

    /// Returns the top-level bucket named `name`.
    #[must_use]
    pub fn bucket(&self, name: &[u8]) -> Option<&Bucket> {
        self.root.bucket(name)
    }

    /// Binds the leaf at `path` to `value`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::RootLeaf`] if `path` has a single segment
    /// - [`CoreError::BucketNotFound`] if the parent bucket is missing
    /// - [`CoreError::IncompatibleValue`] if the target is a bucket
    pub fn put<S: AsRef<[u8]>>(&mut self, path: &[S], value: impl Into<Bytes>) -> CoreResult<()> {
        let path = owned_path(path)?;
        if path.len() == 1 {
            return Err(CoreError::root_leaf(&path[0]));
        }
        self.apply(LogRecord::Put {
            txid: self.txid,
            path,
            value: value.into(),
        })
    }

    /// Removes the leaf at `path`. A missing leaf is not an error.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BucketNotFound`] if the parent bucket is missing
    /// - [`CoreError::IncompatibleValue`] if the target is a bucket
    pub fn delete<S: AsRef<[u8]>>(&mut self, path: &[S]) -> CoreResult<()> {
        let path = owned_path(path)?;
        match self.kind_at(&path)? {
            Some(EntryKind::Bucket) => Err(CoreError::incompatible_value(last(&path))),
            Some(EntryKind::Leaf) => self.apply(LogRecord::Delete {
                txid: self.txid,
                path,
            }),
            None => Ok(()),
        }
    }

    /// Creates an empty bucket at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BucketExists`] if a bucket is already there
    /// - [`CoreError::BucketNotFound`] if the parent bucket is missing
    /// - [`CoreError::IncompatibleValue`] if the name is bound to a leaf
    pub fn create_bucket<S: AsRef<[u8]>>(&mut self, path: &[S]) -> CoreResult<()> {
        let path = owned_path(path)?;
        match self.kind_at(&path)? {
            Some(EntryKind::Bucket) => Err(CoreError::bucket_exists(last(&path))),
            Some(EntryKind::Leaf) => Err(CoreError::incompatible_value(last(&path))),
            None => self.apply(LogRecord::CreateBucket {
                txid: self.txid,
                path,
            }),
        }
    }

    /// Creates an empty bucket at `path` unless one is already there.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BucketNotFound`] if the parent bucket is missing
    /// - [`CoreError::IncompatibleValue`] if the name is bound to a leaf
    pub fn create_bucket_if_not_exists<S: AsRef<[u8]>>(&mut self, path: &[S]) -> CoreResult<()> {
        match self.create_bucket(path) {
            Err(CoreError::BucketExists { .. }) => Ok(()),
            other => other,
        }
    }

    /// Removes the bucket at `path` and everything below it.
    ///
    /// # Errors
    ///
    /// - [`CoreError::BucketNotFound`] if there is no bucket at `path`
    /// - [`CoreError::IncompatibleValue`] if the name is bound to a leaf
    pub fn delete_bucket<S: AsRef<[u8]>>(&mut self, path: &[S]) -> CoreResult<()> {
        let path = owned_path(path)?;
        match self.kind_at(&path)? {
            Some(EntryKind::Bucket) => self.apply(LogRecord::DeleteBucket {
                txid: self.txid,
                path,
            }),
            Some(EntryKind::Leaf) => Err(CoreError::incompatible_value(last(&path))),
            None => Err(CoreError::bucket_not_found(&path)),
        }
    }

    /// Looks up the kind of entry at `path`, failing if its parent is missing.
    fn kind_at(&self, path: &[Vec<u8>]) -> CoreResult<Option<EntryKind>> {
        let (parent, name) = path.split_at(path.len() - 1);
        let bucket = parent
            .iter()
            .try_fold(&*self.root, |bucket, segment| bucket.bucket(segment))
            .ok_or_else(|| CoreError::bucket_not_found(parent))?;
        Ok(bucket.kind(&name[0]))
    }

    fn apply(&mut self, record: LogRecord) -> CoreResult<()> {
        if Arc::strong_count(&self.root) > 1 {
            self.stats.node_copy_n += 1;
        }
        apply_record(Arc::make_mut(&mut self.root), &record, &mut self.stats)?;
        self.records.push(record);
        Ok(())
    }

    /// Consumes the transaction, keeping the writer lock held.
    pub(crate) fn into_pending(self) -> PendingCommit<'db> {
        PendingCommit {
            _guard: self._guard,
            txid: self.txid,
            root: self.root,
            records: self.records,
            stats: self.stats,
        }
    }
}

/// A finished write transaction waiting to be logged and published.
pub(crate) struct PendingCommit<'db> {
    _guard: MutexGuard<'db, ()>,
    pub(crate) txid: TransactionId,
    pub(crate) root: Arc<Bucket>,
    pub(crate) records: Vec<LogRecord>,
    pub(crate) stats: TxStats,
}

/// Applies one log record to a tree.
///
/// Shared by live transactions and recovery so both paths mutate the tree
/// identically. The tree is left unchanged if an error is returned.
pub(crate) fn apply_record(
    root: &mut Bucket,
    record: &LogRecord,
    stats: &mut TxStats,
) -> CoreResult<()> {
    match record {
        LogRecord::Begin { .. } | LogRecord::Commit { .. } => Ok(()),
        LogRecord::CreateBucket { path, .. } => {
            let (parent, name) = parent_mut(root, path, stats)?;
            if !parent.create_bucket(name)? {
                return Err(CoreError::bucket_exists(name));
            }
            stats.bucket_create_n += 1;
            Ok(())
        }
        LogRecord::DeleteBucket { path, .. } => {
            let (parent, name) = parent_mut(root, path, stats)?;
            if !parent.delete_bucket(name)? {
                return Err(CoreError::bucket_not_found(path));
            }
            stats.bucket_delete_n += 1;
            Ok(())
        }
        LogRecord::Put { path, value, .. } => {
            let (parent, name) = parent_mut(root, path, stats)?;
            parent.put(name, value.clone())?;
            stats.put_n += 1;
            Ok(())
        }
        LogRecord::Delete { path, .. } => {
            let (parent, name) = parent_mut(root, path, stats)?;
            if parent.delete(name)? {
                stats.delete_n += 1;
            }
            Ok(())
        }
    }
}

fn parent_mut<'a>(
    root: &'a mut Bucket,
    path: &'a [Vec<u8>],
    stats: &mut TxStats,
) -> CoreResult<(&'a mut Bucket, &'a [u8])> {
    let (name, parent) = path
        .split_last()
        .ok_or_else(|| CoreError::log_corruption("empty path in record"))?;
    let bucket = root
        .descend_mut(parent, &mut stats.node_copy_n)
        .ok_or_else(|| CoreError::bucket_not_found(parent))?;
    Ok((bucket, name.as_slice()))
}

fn owned_path<S: AsRef<[u8]>>(path: &[S]) -> CoreResult<BytePath> {
    if path.is_empty() || path.iter().any(|segment| segment.as_ref().is_empty()) {
        return Err(CoreError::InvalidName);
    }
    Ok(path.iter().map(|segment| segment.as_ref().to_vec()).collect())
}

fn last(path: &[Vec<u8>]) -> &[u8] {
    path.last().map(Vec::as_slice).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn with_tx<T>(f: impl FnOnce(&mut WriteTransaction<'_>) -> T) -> T {
        let lock = Mutex::new(());
        let mut tx = WriteTransaction::new(lock.lock(), TransactionId::new(1), Arc::default());
        f(&mut tx)
    }

    #[test]
    fn put_requires_parent_bucket() {
        with_tx(|tx| {
            assert!(matches!(
                tx.put(&["users", "alice"], "1"),
                Err(CoreError::BucketNotFound { .. })
            ));
            tx.create_bucket(&["users"]).unwrap();
            tx.put(&["users", "alice"], "1").unwrap();
            assert_eq!(
                tx.bucket(b"users").unwrap().get(b"alice").unwrap().as_ref(),
                b"1"
            );
        });
    }

    #[test]
    fn root_rejects_leaves() {
        with_tx(|tx| {
            assert!(matches!(
                tx.put(&["alice"], "1"),
                Err(CoreError::RootLeaf { .. })
            ));
        });
    }

    #[test]
    fn empty_names_are_rejected() {
        with_tx(|tx| {
            assert!(matches!(
                tx.create_bucket::<&str>(&[]),
                Err(CoreError::InvalidName)
            ));
            assert!(matches!(
                tx.create_bucket(&[""]),
                Err(CoreError::InvalidName)
            ));
        });
    }

    #[test]
    fn create_bucket_twice() {
        with_tx(|tx| {
            tx.create_bucket(&["a"]).unwrap();
            assert!(matches!(
                tx.create_bucket(&["a"]),
                Err(CoreError::BucketExists { .. })
            ));
            tx.create_bucket_if_not_exists(&["a"]).unwrap();

            let (_, _, records, stats) = drain(tx);
            assert_eq!(records.len(), 1);
            assert_eq!(stats.bucket_create_n, 1);
        });
    }

    #[test]
    fn delete_inspects_kind() {
        with_tx(|tx| {
            tx.create_bucket(&["a"]).unwrap();
            tx.create_bucket(&["a", "b"]).unwrap();
            tx.put(&["a", "k"], "v").unwrap();

            assert!(matches!(
                tx.delete(&["a", "b"]),
                Err(CoreError::IncompatibleValue { .. })
            ));
            assert!(matches!(
                tx.delete_bucket(&["a", "k"]),
                Err(CoreError::IncompatibleValue { .. })
            ));
            assert!(matches!(
                tx.delete_bucket(&["a", "missing"]),
                Err(CoreError::BucketNotFound { .. })
            ));

            tx.delete(&["a", "missing"]).unwrap();
            tx.delete(&["a", "k"]).unwrap();
            tx.delete_bucket(&["a", "b"]).unwrap();
            assert!(tx.bucket(b"a").unwrap().is_empty());
        });
    }

    #[test]
    fn failed_mutation_is_not_logged() {
        with_tx(|tx| {
            tx.create_bucket(&["a"]).unwrap();
            tx.put(&["a", "k"], "v").unwrap();
            assert!(tx.create_bucket(&["a", "k"]).is_err());

            let (_, _, records, _) = drain(tx);
            assert_eq!(records.len(), 2);
        });
    }

    #[test]
    fn replay_matches_live_writes() {
        let records = with_tx(|tx| {
            tx.create_bucket(&["a"]).unwrap();
            tx.create_bucket(&["a", "b"]).unwrap();
            tx.put(&["a", "b", "k"], "v").unwrap();
            tx.put(&["a", "x"], "y").unwrap();
            tx.delete(&["a", "x"]).unwrap();
            drain(tx).2
        });

        let mut root = Bucket::new();
        let mut stats = TxStats::default();
        for record in &records {
            apply_record(&mut root, record, &mut stats).unwrap();
        }

        let b = root.bucket(b"a").unwrap().bucket(b"b").unwrap();
        assert_eq!(b.get(b"k").unwrap().as_ref(), b"v");
        assert!(root.bucket(b"a").unwrap().get(b"x").is_none());
        assert_eq!(stats.put_n, 2);
        assert_eq!(stats.delete_n, 1);
    }

    fn drain(tx: &mut WriteTransaction<'_>) -> (TransactionId, Arc<Bucket>, Vec<LogRecord>, TxStats) {
        (
            tx.txid,
            Arc::clone(&tx.root),
            std::mem::take(&mut tx.records),
            tx.stats,
        )
    }
}
