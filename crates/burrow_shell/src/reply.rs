//! Typed command results.

use bytes::Bytes;
use std::collections::BTreeMap;

/// The result of a command.
///
/// Every shape a command can produce is a variant here, so both the text
/// formatter and the script bridge match it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A yes/no answer (`exists`, `set`, `del`).
    Bool(bool),
    /// A count (`delglob`).
    Integer(i64),
    /// A leaf value, empty when absent (`get`).
    Bytes(Bytes),
    /// Names in byte order (`buckets`, `keys`).
    List(Vec<String>),
    /// Named fields, possibly nested (`keyvalues`, `stats`).
    Map(BTreeMap<String, Field>),
}

/// A value inside a [`Reply::Map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// A leaf value.
    Bytes(Bytes),
    /// A counter.
    Integer(i64),
    /// A nested map.
    Map(BTreeMap<String, Field>),
}

impl Reply {
    /// Returns the list, if this is a [`Reply::List`].
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}
