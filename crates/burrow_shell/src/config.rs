//! Shell configuration.

use std::path::{Path, PathBuf};

/// Default number of history entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// File name of the history file under `$HOME/.cache`.
const HISTORY_FILE_NAME: &str = "burrow_history";

/// Configuration for the interactive shell.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Where line history is loaded from and saved to. None disables history.
    pub history_file: Option<PathBuf>,

    /// Maximum number of history entries.
    pub history_limit: usize,

    /// Prompt printed before each line.
    pub prompt: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            prompt: "> ".to_string(),
        }
    }
}

impl ShellConfig {
    /// Creates a configuration for a shell on the database at `path`.
    ///
    /// The prompt is the database path followed by `> `.
    #[must_use]
    pub fn for_database(path: &Path) -> Self {
        Self::default().prompt(format!("{}> ", path.display()))
    }

    /// Sets the history file.
    #[must_use]
    pub fn history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Sets the maximum number of history entries.
    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

fn default_history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".cache")
            .join(HISTORY_FILE_NAME)
    })
}
