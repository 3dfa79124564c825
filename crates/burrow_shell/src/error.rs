//! Error types for the shell.

use std::io;
use thiserror::Error;

/// Result type for shell operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors produced by the command engine and its front ends.
#[derive(Debug, Error)]
pub enum ShellError {
    /// No command with that name.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Wrong number of positional arguments.
    #[error("wrong number of arguments for '{0}' command")]
    ArgumentCount(&'static str),

    /// A bucket name, key or pattern argument is not UTF-8. Positions
    /// count from 1.
    #[error("arg {0} is not valid UTF-8; bucket names, keys and patterns must be text")]
    NonUtf8Name(usize),

    /// Malformed glob pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// The store failed; the transaction was rolled back.
    #[error("{0}")]
    Store(#[from] burrow_core::CoreError),

    /// The script VM failed.
    #[error("script error: {0}")]
    Script(#[from] mlua::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Line editor error.
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
