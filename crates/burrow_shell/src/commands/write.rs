//! Mutating commands.
//!
//! A name is bound to a bucket or to a leaf, never both, so deletes look at
//! the kind of the child once and issue the matching delete.

use super::matching;
use crate::error::{ShellError, ShellResult};
use crate::glob::Pattern;
use crate::path::{text, BucketPath};
use crate::reply::Reply;
use burrow_core::{CoreResult, Database, EntryKind, WriteTransaction};
use bytes::Bytes;

/// `set [bucket ...] bucket key value`
pub(super) fn set(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let [containers @ .., key, value] = args else {
        return Err(ShellError::ArgumentCount("set"));
    };
    let parent = BucketPath::new(containers)?;
    let key = text(key, containers.len() + 1)?;

    db.update(|tx| {
        parent.ensure(tx)?;
        tx.put(&parent.child(key.as_bytes()), value.clone())?;
        Ok(Reply::Bool(true))
    })
}

/// `del [bucket ...] bucket/key`
pub(super) fn del(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, target) = BucketPath::split_last(args, "del")?;

    db.update(|tx| {
        let kind = parent
            .resolve(tx.root())
            .and_then(|bucket| bucket.kind(target.as_bytes()));
        let removed = match kind {
            Some(kind) => {
                remove(tx, &parent.child(target.as_bytes()), kind)?;
                true
            }
            None => false,
        };
        Ok(Reply::Bool(removed))
    })
}

/// `delglob [bucket ...] bucket/key-pattern`
///
/// Either every matching child is removed or, on error, none is.
pub(super) fn delglob(db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
    let (parent, pattern) = BucketPath::split_last(args, "delglob")?;
    let pattern = Pattern::compile(pattern)?;

    db.update(|tx| {
        let targets: Vec<(String, EntryKind)> = matching(parent.resolve(tx.root()), &pattern)
            .map(|(name, entry)| (name.to_string(), entry.kind()))
            .collect();

        for (name, kind) in &targets {
            remove(tx, &parent.child(name.as_bytes()), *kind)?;
        }
        tracing::debug!(pattern = pattern.as_str(), removed = targets.len(), "delglob");
        Ok(Reply::Integer(targets.len() as i64))
    })
}

fn remove(tx: &mut WriteTransaction<'_>, path: &[&[u8]], kind: EntryKind) -> CoreResult<()> {
    match kind {
        EntryKind::Bucket => tx.delete_bucket(path),
        EntryKind::Leaf => tx.delete(path),
    }
}
