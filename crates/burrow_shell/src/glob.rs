//! Glob patterns over bucket and key names.
//!
//! Names are matched whole, exactly as stored. `*` matches any run of
//! characters, `/` included, since a name is a single path component and
//! never a path.

use crate::error::ShellResult;
use globset::{GlobBuilder, GlobMatcher};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: GlobMatcher,
}

impl Pattern {
    /// Compiles a shell-style glob: `*`, `?`, `[...]`, `[!...]` and `{a,b}`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Pattern`](crate::ShellError::Pattern) if the
    /// pattern is malformed.
    pub fn compile(pattern: &str) -> ShellResult<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .backslash_escape(true)
            .build()?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    /// Returns the source pattern.
    pub fn as_str(&self) -> &str {
        self.matcher.glob().glob()
    }

    /// Returns whether `name` matches the whole pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }
}
