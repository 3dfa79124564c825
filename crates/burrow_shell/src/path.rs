//! Bucket paths.
//!
//! Commands take their containers as leading positional arguments. A
//! [`BucketPath`] is that leading run, resolved from the root one bucket at
//! a time; the command decides what the remaining arguments mean.
//!
//! Arguments arrive as bytes. Names are checked to be UTF-8 when the path
//! is built, before any transaction opens.

use crate::error::{ShellError, ShellResult};
use burrow_core::{Bucket, CoreResult, WriteTransaction};
use bytes::Bytes;

/// An ordered run of bucket names, starting at the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPath<'a> {
    segments: &'a [Bytes],
}

impl<'a> BucketPath<'a> {
    /// Creates a path over `segments`. No segments means the root.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::NonUtf8Name`] for the first segment that is not
    /// UTF-8, numbered from 1.
    pub fn new(segments: &'a [Bytes]) -> ShellResult<Self> {
        for (i, segment) in segments.iter().enumerate() {
            text(segment, i + 1)?;
        }
        Ok(Self { segments })
    }

    /// Splits `args` into the bucket path and the final argument.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::ArgumentCount`] for `command` if `args` is
    /// empty, or [`ShellError::NonUtf8Name`] if any argument is not UTF-8.
    pub fn split_last(args: &'a [Bytes], command: &'static str) -> ShellResult<(Self, &'a str)> {
        let (last, segments) = args
            .split_last()
            .ok_or(ShellError::ArgumentCount(command))?;
        Ok((Self::new(segments)?, text(last, args.len())?))
    }

    /// Returns the bucket names.
    pub fn segments(&self) -> &'a [Bytes] {
        self.segments
    }

    /// Returns the full path of `name` inside this bucket.
    pub fn child<'n>(&self, name: &'n [u8]) -> Vec<&'n [u8]>
    where
        'a: 'n,
    {
        self.segments
            .iter()
            .map(|segment| segment.as_ref())
            .chain(std::iter::once(name))
            .collect()
    }

    /// Walks the path from `root`.
    ///
    /// Returns `None` if any segment is missing or names a leaf; a leaf
    /// cannot be descended into, so it reads the same as absence.
    pub fn resolve<'b>(&self, root: &'b Bucket) -> Option<&'b Bucket> {
        self.segments
            .iter()
            .try_fold(root, |bucket, segment| bucket.bucket(segment))
    }

    /// Creates every missing bucket along the path.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleValue` if a segment is bound to a leaf.
    pub fn ensure(&self, tx: &mut WriteTransaction<'_>) -> CoreResult<()> {
        for depth in 1..=self.segments.len() {
            tx.create_bucket_if_not_exists(&self.segments[..depth])?;
        }
        Ok(())
    }
}

/// Reads argument `position` (from 1) as a name.
///
/// # Errors
///
/// Returns [`ShellError::NonUtf8Name`] if `arg` is not UTF-8.
pub(crate) fn text(arg: &[u8], position: usize) -> ShellResult<&str> {
    std::str::from_utf8(arg).map_err(|_| ShellError::NonUtf8Name(position))
}
