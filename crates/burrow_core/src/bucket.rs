//! The bucket tree.
//!
//! A [`Bucket`] maps names to nodes, where a node is either a leaf value or a
//! nested bucket. Children are kept in a `BTreeMap`, so iteration is always in
//! byte order. Nested buckets are held behind `Arc` and copied on write: a
//! write transaction that touches `a/b` clones the root map, `a` and `b`, and
//! shares every other subtree with the snapshot readers still hold.

use crate::error::{CoreError, CoreResult};
use crate::types::EntryKind;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Node {
    Leaf(Bytes),
    Bucket(Arc<Bucket>),
}

/// A borrowed child of a bucket.
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    /// A leaf value.
    Leaf(&'a Bytes),
    /// A nested bucket.
    Bucket(&'a Bucket),
}

impl Entry<'_> {
    /// Returns the kind of this entry.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Leaf(_) => EntryKind::Leaf,
            Self::Bucket(_) => EntryKind::Bucket,
        }
    }
}

/// A container of named leaves and sub-buckets.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    children: BTreeMap<Vec<u8>, Node>,
}

impl Bucket {
    /// Creates an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the leaf value bound to `key`, if `key` names a leaf.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&Bytes> {
        match self.children.get(key)? {
            Node::Leaf(value) => Some(value),
            Node::Bucket(_) => None,
        }
    }

    /// Returns the sub-bucket bound to `name`, if `name` names a bucket.
    #[must_use]
    pub fn bucket(&self, name: &[u8]) -> Option<&Bucket> {
        match self.children.get(name)? {
            Node::Bucket(bucket) => Some(&**bucket),
            Node::Leaf(_) => None,
        }
    }

    /// Returns the entry bound to `name`.
    #[must_use]
    pub fn entry(&self, name: &[u8]) -> Option<Entry<'_>> {
        self.children.get(name).map(Node::as_entry)
    }

    /// Returns the kind of entry bound to `name`.
    #[must_use]
    pub fn kind(&self, name: &[u8]) -> Option<EntryKind> {
        self.entry(name).map(|entry| entry.kind())
    }

    /// Iterates over direct children in byte order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Entry<'_>)> + '_ {
        self.children
            .iter()
            .map(|(name, node)| (name.as_slice(), node.as_entry()))
    }

    /// Returns the number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns whether the bucket has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Counts `(buckets, leaves)` in this bucket and everything below it.
    #[must_use]
    pub fn count(&self) -> (u64, u64) {
        self.children
            .values()
            .fold((0, 0), |(buckets, leaves), node| match node {
                Node::Leaf(_) => (buckets, leaves + 1),
                Node::Bucket(child) => {
                    let (b, l) = child.count();
                    (buckets + 1 + b, leaves + l)
                }
            })
    }

    /// Walks `path` through sub-buckets, cloning shared nodes on the way.
    ///
    /// `copies` is bumped once per node that had to be cloned.
    pub(crate) fn descend_mut<S: AsRef<[u8]>>(
        &mut self,
        path: &[S],
        copies: &mut u64,
    ) -> Option<&mut Bucket> {
        let mut current = self;
        for name in path {
            current = match current.children.get_mut(name.as_ref())? {
                Node::Bucket(shared) => {
                    if Arc::strong_count(shared) > 1 {
                        *copies += 1;
                    }
                    Arc::make_mut(shared)
                }
                Node::Leaf(_) => return None,
            };
        }
        Some(current)
    }

    /// Binds `key` to a leaf value, replacing any previous leaf.
    pub(crate) fn put(&mut self, key: &[u8], value: Bytes) -> CoreResult<()> {
        match self.children.get_mut(key) {
            Some(Node::Bucket(_)) => Err(CoreError::incompatible_value(key)),
            Some(Node::Leaf(existing)) => {
                *existing = value;
                Ok(())
            }
            None => {
                self.children.insert(key.to_vec(), Node::Leaf(value));
                Ok(())
            }
        }
    }

    /// Removes the leaf bound to `key`. Returns whether a leaf was removed.
    pub(crate) fn delete(&mut self, key: &[u8]) -> CoreResult<bool> {
        match self.children.get(key) {
            Some(Node::Bucket(_)) => Err(CoreError::incompatible_value(key)),
            Some(Node::Leaf(_)) => {
                self.children.remove(key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Creates an empty sub-bucket. Returns `false` if it already existed.
    pub(crate) fn create_bucket(&mut self, name: &[u8]) -> CoreResult<bool> {
        match self.children.get(name) {
            Some(Node::Leaf(_)) => Err(CoreError::incompatible_value(name)),
            Some(Node::Bucket(_)) => Ok(false),
            None => {
                self.children
                    .insert(name.to_vec(), Node::Bucket(Arc::new(Bucket::new())));
                Ok(true)
            }
        }
    }

    /// Removes a sub-bucket and everything below it.
    ///
    /// Returns whether a bucket was removed.
    pub(crate) fn delete_bucket(&mut self, name: &[u8]) -> CoreResult<bool> {
        match self.children.get(name) {
            Some(Node::Leaf(_)) => Err(CoreError::incompatible_value(name)),
            Some(Node::Bucket(_)) => {
                self.children.remove(name);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Node {
    fn as_entry(&self) -> Entry<'_> {
        match self {
            Self::Leaf(value) => Entry::Leaf(value),
            Self::Bucket(bucket) => Entry::Bucket(bucket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bucket {
        let mut root = Bucket::new();
        root.create_bucket(b"users").unwrap();
        let mut copies = 0;
        let users = root.descend_mut(&[b"users"], &mut copies).unwrap();
        users.put(b"alice", Bytes::from_static(b"1")).unwrap();
        users.create_bucket(b"archived").unwrap();
        root
    }

    #[test]
    fn names_are_leaf_or_bucket() {
        let root = sample();
        let users = root.bucket(b"users").unwrap();

        assert_eq!(users.kind(b"alice"), Some(EntryKind::Leaf));
        assert_eq!(users.kind(b"archived"), Some(EntryKind::Bucket));
        assert_eq!(users.kind(b"missing"), None);
        assert!(users.bucket(b"alice").is_none());
        assert!(users.get(b"archived").is_none());
    }

    #[test]
    fn incompatible_operations_fail() {
        let mut root = sample();
        let mut copies = 0;
        let users = root.descend_mut(&[b"users"], &mut copies).unwrap();

        assert!(matches!(
            users.put(b"archived", Bytes::new()),
            Err(CoreError::IncompatibleValue { .. })
        ));
        assert!(matches!(
            users.delete(b"archived"),
            Err(CoreError::IncompatibleValue { .. })
        ));
        assert!(matches!(
            users.create_bucket(b"alice"),
            Err(CoreError::IncompatibleValue { .. })
        ));
        assert!(matches!(
            users.delete_bucket(b"alice"),
            Err(CoreError::IncompatibleValue { .. })
        ));
    }

    #[test]
    fn iteration_is_sorted() {
        let mut bucket = Bucket::new();
        for name in [&b"c"[..], b"a", b"b"] {
            bucket.put(name, Bytes::new()).unwrap();
        }
        let names: Vec<_> = bucket.iter().map(|(name, _)| name.to_vec()).collect();
        assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn descend_through_leaf_fails() {
        let mut root = sample();
        let mut copies = 0;
        assert!(root
            .descend_mut(&[&b"users"[..], b"alice"], &mut copies)
            .is_none());
    }

    #[test]
    fn copy_on_write_leaves_snapshot_untouched() {
        let root = sample();
        let snapshot = root.clone();

        let mut next = root;
        let mut copies = 0;
        next.descend_mut(&[b"users"], &mut copies)
            .unwrap()
            .put(b"bob", Bytes::from_static(b"2"))
            .unwrap();

        assert_eq!(copies, 1);
        assert!(snapshot.bucket(b"users").unwrap().get(b"bob").is_none());
        assert!(next.bucket(b"users").unwrap().get(b"bob").is_some());
    }

    #[test]
    fn count_is_recursive() {
        let root = sample();
        assert_eq!(root.count(), (2, 1));
    }
}
