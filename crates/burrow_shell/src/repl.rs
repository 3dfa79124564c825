//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion.
//! Pipe mode: read lines from stdin, execute each.

use std::io::{BufRead, Write};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, CompletionType, Config, ConditionalEventHandler, Context, Editor, Event, EventContext,
    EventHandler, Helper, KeyEvent, Movement, RepeatCount,
};

use crate::commands::{lookup, COMMANDS};
use crate::config::ShellConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ShellError, ShellResult};
use crate::format::format_error;

/// Shown when a command renders as empty text.
pub const EMPTY_PLACEHOLDER: &str = "(empty list or set)";

/// Words handled by the REPL itself rather than the dispatcher.
const META_COMMANDS: &[&str] = &["help", "quit", "exit"];

/// What the REPL should do with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Nothing to run.
    Skip,
    /// Print this text.
    Print(String),
    /// Leave the REPL.
    Quit,
}

/// An interactive shell over one store.
pub struct Repl {
    dispatcher: Dispatcher,
    config: ShellConfig,
}

impl Repl {
    /// Creates a REPL.
    pub fn new(dispatcher: Dispatcher, config: ShellConfig) -> Self {
        Self { dispatcher, config }
    }

    /// Interprets one input line.
    ///
    /// The line is split on whitespace; the first word names the command.
    pub fn handle_line(&self, line: &str) -> Action {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Action::Skip;
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        match name.to_ascii_lowercase().as_str() {
            "quit" | "exit" => Action::Quit,
            "help" => Action::Print(help(&args)),
            _ => {
                let text = self.dispatcher.execute_line(name, &args);
                if text.is_empty() {
                    Action::Print(EMPTY_PLACEHOLDER.to_string())
                } else {
                    Action::Print(text)
                }
            }
        }
    }

    /// Runs the interactive loop until `quit`, Ctrl-D, or Ctrl-C on an
    /// empty line.
    pub fn run(&self) -> ShellResult<()> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .max_history_size(self.config.history_limit)?
            .build();

        let mut rl: Editor<BurrowHelper, _> = Editor::with_config(config)?;
        rl.set_helper(Some(BurrowHelper));
        rl.bind_sequence(
            KeyEvent::ctrl('C'),
            EventHandler::Conditional(Box::new(DiscardLine)),
        );

        // History is optional; failing to load or save it is not an error.
        if let Some(path) = &self.config.history_file {
            if let Some(dir) = path.parent() {
                let _ = std::fs::create_dir_all(dir);
            }
            let _ = rl.load_history(path);
        }

        loop {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    match self.handle_line(trimmed) {
                        Action::Skip => {}
                        Action::Print(text) => println!("{text}"),
                        Action::Quit => break,
                    }
                }
                // Ctrl-C on a non-empty line is swallowed by `DiscardLine`.
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(path) = &self.config.history_file {
            let _ = rl.save_history(path);
        }
        Ok(())
    }

    /// Runs every line of `input`, writing results to `output`.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn run_pipe<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> ShellResult<()> {
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match self.handle_line(trimmed) {
                Action::Skip => {}
                Action::Print(text) => writeln!(output, "{text}")?,
                Action::Quit => break,
            }
        }
        output.flush()?;
        Ok(())
    }
}

fn help(args: &[String]) -> String {
    match args {
        [] => {
            let mut text = String::from("Commands:\n");
            for command in COMMANDS {
                text.push_str(&format!("  {:<10} {}\n", command.name, command.usage));
            }
            text.push_str("\nMeta-commands:\n");
            text.push_str("  help [command]   Show help\n");
            text.push_str("  quit / exit      Exit the shell");
            text
        }
        [name] => match lookup(name) {
            Some(command) => {
                format!("{} {}\n\n{}", command.name, command.usage, command.summary)
                    .replace(" \n", "\n")
            }
            None => format_error(&ShellError::UnknownCommand(name.clone())),
        },
        _ => format_error(&ShellError::ArgumentCount("help")),
    }
}

// =========================================================================
// Key bindings and TAB completion
// =========================================================================

/// Ctrl-C clears a non-empty line instead of interrupting.
struct DiscardLine;

impl ConditionalEventHandler for DiscardLine {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.line().is_empty() {
            None
        } else {
            Some(Cmd::Kill(Movement::WholeBuffer))
        }
    }
}

struct BurrowHelper;

impl Helper for BurrowHelper {}
impl Validator for BurrowHelper {}
impl Highlighter for BurrowHelper {}
impl Hinter for BurrowHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for BurrowHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];

        // Only the command name is completed; arguments are store names.
        if line_to_pos.trim_start().contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let prefix = line_to_pos.trim_start();
        let start = pos - prefix.len();
        let candidates = COMMANDS
            .iter()
            .map(|command| command.name)
            .chain(META_COMMANDS.iter().copied())
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::Database;
    use std::sync::Arc;

    fn repl() -> Repl {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Repl::new(Dispatcher::new(db), ShellConfig::default().history_file(None))
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(repl().handle_line("   "), Action::Skip);
    }

    #[test]
    fn quit_and_exit() {
        let repl = repl();
        assert_eq!(repl.handle_line("quit"), Action::Quit);
        assert_eq!(repl.handle_line("EXIT"), Action::Quit);
    }

    #[test]
    fn empty_results_get_placeholder() {
        let repl = repl();
        assert_eq!(
            repl.handle_line("buckets nonexistent *"),
            Action::Print(EMPTY_PLACEHOLDER.to_string())
        );
    }

    #[test]
    fn help_for_one_command() {
        let repl = repl();
        let Action::Print(text) = repl.handle_line("help GET") else {
            panic!("help printed nothing");
        };
        assert!(text.starts_with("get [bucket ...] bucket key\n"));
        assert_eq!(
            repl.handle_line("help nope"),
            Action::Print("ERR unknown command 'nope'".to_string())
        );
    }

    #[test]
    fn help_lists_every_command() {
        let Action::Print(text) = repl().handle_line("help") else {
            panic!("help printed nothing");
        };
        for command in COMMANDS {
            assert!(text.contains(command.name));
        }
    }

    #[test]
    fn pipe_mode_skips_comments() {
        let input = "# setup\nset b k v\n\nget b k\nquit\nget b k\n";
        let mut output = Vec::new();
        repl().run_pipe(input.as_bytes(), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "true\nv\n");
    }
}
