//! # Burrow Shell
//!
//! Command layer over a [`burrow_core::Database`] bucket store.
//!
//! The same nine commands are reachable from three places:
//!
//! - the interactive [`Repl`], which prints replies redis-cli style
//! - pipe mode, one command per line from stdin
//! - Lua scripts through the [`ScriptBridge`], which returns Lua values
//!
//! All three go through a [`Dispatcher`], which looks the command up by
//! name, checks its argument count, and runs it in one transaction.
//!
//! ## Example
//!
//! ```rust
//! use burrow_core::Database;
//! use burrow_shell::Dispatcher;
//! use std::sync::Arc;
//!
//! let db = Arc::new(Database::open_in_memory().unwrap());
//! let shell = Dispatcher::new(db);
//!
//! let args = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
//! assert_eq!(shell.execute_line("set", &args(&["users", "alice", "admin"])), "true");
//! assert_eq!(shell.execute_line("get", &args(&["users", "alice"])), "admin");
//! assert_eq!(shell.execute_line("keys", &args(&["users", "*"])), "1) \"alice\"");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
mod config;
mod dispatch;
mod error;
mod format;
mod glob;
mod path;
mod repl;
mod reply;
mod script;

pub use commands::{lookup, Arity, Command, COMMANDS};
pub use config::{ShellConfig, DEFAULT_HISTORY_LIMIT};
pub use dispatch::Dispatcher;
pub use error::{ShellError, ShellResult};
pub use format::{format_error, format_reply};
pub use glob::Pattern;
pub use path::BucketPath;
pub use repl::{Action, Repl, EMPTY_PLACEHOLDER};
pub use reply::{Field, Reply};
pub use script::{ScriptBridge, MODULE_NAME};
