//! Read-only commands.

use super::matching;
use crate::error::ShellResult;
use crate::glob::Pattern;
use crate::path::BucketPath;
use crate::reply::{Field, Reply};
use burrow_core::{Database, Entry};
use bytes::Bytes;
use std::collections::BTreeMap;

/// `exists [bucket ...] bucket/key`
pub(super) fn exists(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, target) = BucketPath::split_last(args, "exists")?;
    db.view(|tx| {
        let found = parent
            .resolve(tx.root())
            .is_some_and(|bucket| bucket.entry(target.as_bytes()).is_some());
        Ok(Reply::Bool(found))
    })
}

/// `get [bucket ...] bucket key`
pub(super) fn get(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, key) = BucketPath::split_last(args, "get")?;
    db.view(|tx| {
        let value = parent
            .resolve(tx.root())
            .and_then(|bucket| bucket.get(key.as_bytes()))
            .cloned()
            .unwrap_or_else(Bytes::new);
        Ok(Reply::Bytes(value))
    })
}

/// `buckets [bucket ...] bucket-pattern`
pub(super) fn buckets(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, pattern) = BucketPath::split_last(args, "buckets")?;
    let pattern = Pattern::compile(pattern)?;
    db.view(|tx| {
        let names = matching(parent.resolve(tx.root()), &pattern)
            .filter(|(_, entry)| matches!(entry, Entry::Bucket(_)))
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(Reply::List(names))
    })
}

/// `keys bucket [bucket ...] key-pattern`
pub(super) fn keys(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, pattern) = BucketPath::split_last(args, "keys")?;
    let pattern = Pattern::compile(pattern)?;
    db.view(|tx| {
        let names = matching(parent.resolve(tx.root()), &pattern)
            .filter(|(_, entry)| matches!(entry, Entry::Leaf(_)))
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(Reply::List(names))
    })
}

/// `keyvalues bucket [bucket ...] key-pattern`
pub(super) fn keyvalues(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, pattern) = BucketPath::split_last(args, "keyvalues")?;
    let pattern = Pattern::compile(pattern)?;
    db.view(|tx| {
        let fields: BTreeMap<String, Field> = matching(parent.resolve(tx.root()), &pattern)
            .filter_map(|(name, entry)| match entry {
                Entry::Leaf(value) => Some((name.to_string(), Field::Bytes(value.clone()))),
                Entry::Bucket(_) => None,
            })
            .collect();
        Ok(Reply::Map(fields))
    })
}
