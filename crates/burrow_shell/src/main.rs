//! Burrow shell
//!
//! Opens a bucket store and either runs a Lua script against it or reads
//! commands interactively.
//!
//! # Modes
//!
//! - `burrow my.db` - interactive REPL with history and completion
//! - `burrow my.db < commands.txt` - one command per line from stdin
//! - `burrow my.db --eval script.lua` - run a script and exit

use burrow_core::{Config, Database};
use burrow_shell::{Dispatcher, Repl, ScriptBridge, ShellConfig};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shell for hierarchical bucket stores.
#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file (created if missing)
    db_path: PathBuf,

    /// Run this Lua script instead of starting the shell
    #[arg(short, long, value_name = "SCRIPT")]
    eval: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Do not fsync the log on commit
    #[arg(long)]
    no_sync: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins unless -v is given.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::default().sync_on_commit(!cli.no_sync);
    let db = Arc::new(Database::open_with_config(&cli.db_path, config)?);
    let dispatcher = Dispatcher::new(db);

    if let Some(script) = &cli.eval {
        let bridge = ScriptBridge::new(dispatcher)?;
        bridge.run_file(script)?;
        return Ok(());
    }

    let repl = Repl::new(dispatcher, ShellConfig::for_database(&cli.db_path));
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        repl.run()?;
    } else {
        repl.run_pipe(stdin.lock(), &mut std::io::stdout().lock())?;
    }
    Ok(())
}
