//! The command set.
//!
//! Each command runs in exactly one transaction: read commands in a
//! [`Database::view`], mutating commands in a [`Database::update`]. Argument
//! counts, name encodings and glob patterns are checked before the
//! transaction opens.
//!
//! Arguments are byte strings. Bucket names, keys and patterns must be
//! UTF-8; the value given to `set` is stored exactly as passed.

mod read;
pub mod stats;
mod write;

use crate::error::{ShellError, ShellResult};
use crate::glob::Pattern;
use crate::reply::Reply;
use burrow_core::{Bucket, Database, Entry};
use bytes::Bytes;

/// How many positional arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Exactly(usize),
    /// `n` or more arguments.
    AtLeast(usize),
}

impl Arity {
    /// Returns whether `count` arguments are acceptable.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

/// Signature shared by every command.
pub type Handler = fn(&Database, &[Bytes]) -> ShellResult<Reply>;

/// A named command.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Lower-case name.
    pub name: &'static str,
    /// Accepted argument count.
    pub arity: Arity,
    /// Argument synopsis for help output.
    pub usage: &'static str,
    /// What the command does.
    pub summary: &'static str,
    handler: Handler,
}

impl Command {
    /// Checks the argument count, then runs the command.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::ArgumentCount`] without touching the store if
    /// the count is wrong, otherwise whatever the command fails with.
    pub fn run(&self, db: &Database, args: &[Bytes]) -> ShellResult<Reply> {
        if !self.arity.accepts(args.len()) {
            return Err(ShellError::ArgumentCount(self.name));
        }
        (self.handler)(db, args)
    }
}

/// Every command, in the order `help` lists them.
pub static COMMANDS: &[Command] = &[
    Command {
        name: "exists",
        arity: Arity::AtLeast(1),
        usage: "[bucket ...] bucket/key",
        summary: "Checks if a given bucket/key exists.\n\
                  Returns true if it does, otherwise false.",
        handler: read::exists,
    },
    Command {
        name: "get",
        arity: Arity::AtLeast(2),
        usage: "[bucket ...] bucket key",
        summary: "Returns the value of the given key in the specified bucket.\n\
                  Returns an empty string if the bucket or key does not exist.",
        handler: read::get,
    },
    Command {
        name: "set",
        arity: Arity::AtLeast(3),
        usage: "[bucket ...] bucket key value",
        summary: "Sets the value of the given key in the specified bucket, and returns true.\n\
                  Buckets on the path that do not exist are created.",
        handler: write::set,
    },
    Command {
        name: "del",
        arity: Arity::AtLeast(1),
        usage: "[bucket ...] bucket/key",
        summary: "Deletes the given bucket (with its contents) or key, and returns true.\n\
                  If the bucket/key does not exist, returns false.",
        handler: write::del,
    },
    Command {
        name: "delglob",
        arity: Arity::AtLeast(1),
        usage: "[bucket ...] bucket/key-pattern",
        summary: "Deletes the buckets/keys matching the given glob pattern, and returns the number of items deleted.\n\
                  If the bucket does not exist, returns 0.",
        handler: write::delglob,
    },
    Command {
        name: "buckets",
        arity: Arity::AtLeast(1),
        usage: "[bucket ...] bucket-pattern",
        summary: "Lists all buckets matching the given glob pattern.",
        handler: read::buckets,
    },
    Command {
        name: "keys",
        arity: Arity::AtLeast(2),
        usage: "[bucket ...] bucket key-pattern",
        summary: "Lists all keys in the specified bucket matching the given glob pattern.",
        handler: read::keys,
    },
    Command {
        name: "keyvalues",
        arity: Arity::AtLeast(2),
        usage: "[bucket ...] bucket key-pattern",
        summary: "Lists all keys and their values in the specified bucket matching the given glob pattern.",
        handler: read::keyvalues,
    },
    Command {
        name: "stats",
        arity: Arity::Exactly(0),
        usage: "",
        summary: "Returns the store's transaction and size counters.",
        handler: stats::stats,
    },
];

/// Looks up a command by name, ignoring ASCII case.
pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Children of `bucket` whose names match, in byte order. A missing bucket
/// has no children, and a name that is not UTF-8 never matches.
fn matching<'b>(
    bucket: Option<&'b Bucket>,
    pattern: &'b Pattern,
) -> impl Iterator<Item = (&'b str, Entry<'b>)> + 'b {
    bucket
        .into_iter()
        .flat_map(|bucket| bucket.iter())
        .filter_map(|(name, entry)| Some((std::str::from_utf8(name).ok()?, entry)))
        .filter(move |(name, _)| pattern.matches(name))
}
