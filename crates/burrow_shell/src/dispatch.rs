//! Single entry point for the REPL and the script bridge.

use crate::commands;
use crate::error::{ShellError, ShellResult};
use crate::format::{format_error, format_reply};
use crate::reply::Reply;
use burrow_core::Database;
use bytes::Bytes;
use std::sync::Arc;

/// Looks commands up by name and runs them against one store.
#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Database>,
}

impl Dispatcher {
    /// Creates a dispatcher over `db`.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Returns the store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs the command `name` (any case) with `args`.
    ///
    /// Arguments are passed through as bytes, so `Key` and `key` stay
    /// distinct and a value need not be text.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::UnknownCommand`] for an unknown name, otherwise
    /// whatever the command fails with.
    pub fn execute<A: AsRef<[u8]>>(&self, name: &str, args: &[A]) -> ShellResult<Reply> {
        let command =
            commands::lookup(name).ok_or_else(|| ShellError::UnknownCommand(name.to_string()))?;
        tracing::debug!(command = command.name, args = args.len(), "executing command");
        let args: Vec<Bytes> = args
            .iter()
            .map(|arg| Bytes::copy_from_slice(arg.as_ref()))
            .collect();
        command.run(&self.db, &args)
    }

    /// Runs a command and renders the outcome as REPL text.
    pub fn execute_line<A: AsRef<[u8]>>(&self, name: &str, args: &[A]) -> String {
        match self.execute(name, args) {
            Ok(reply) => format_reply(&reply),
            Err(err) => format_error(&err),
        }
    }
}
