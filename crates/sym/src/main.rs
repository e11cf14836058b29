use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use sym::config;
use sym::editor::{EditorOptions, submit};
use sym::input::KeyLayout;
use sym::ui::{self, SessionEnd};
use sym::{Error, Result};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Append logs to this file (overrides [log].file)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Edit a new process in a full-screen form, then register it
    Edit {
        /// Path to a sym TOML config (default: ./sym.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the session report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check parent/child arrival ordering of the configured registry
    Check {
        /// Path to a sym TOML config (default: ./sym.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the compiled-in key bindings
    Keys,
    /// Print the effective configuration (after extends and defaults)
    Config {
        /// Path to a sym TOML config (default: ./sym.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_file = args.log_file.as_deref();
    match args.cmd {
        Command::Edit { config, json } => cmd_edit(config.as_deref(), json, log_file),
        Command::Check { config } => cmd_check(config.as_deref(), log_file),
        Command::Keys => cmd_keys(),
        Command::Config { config } => cmd_config(config.as_deref()),
    }
}

fn cmd_edit(path: Option<&Path>, json: bool, log_file: Option<&Path>) -> Result<()> {
    let cfg = config::load_or_default(path)?;
    sym::logging::init(&cfg.log, log_file, true)?;

    let mut registry = cfg.registry.build()?;
    let mut process = cfg.process.new_process(registry.next_pid());
    let opts = EditorOptions::from_config(&cfg.dialog);

    let end = ui::run_editor(&mut process, &registry, &opts)?;
    if end == SessionEnd::Closed {
        warn!("input closed before the quit key; keeping the edits so far");
    }

    let report = submit(process, &mut registry);
    if json {
        let s = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::msg(format!("failed to encode report: {e}")))?;
        println!("{s}");
    } else {
        print!("{report}");
    }
    Ok(())
}

fn cmd_check(path: Option<&Path>, log_file: Option<&Path>) -> Result<()> {
    let cfg = config::load_or_default(path)?;
    sym::logging::init(&cfg.log, log_file, false)?;

    let registry = cfg.registry.build()?;
    let violations = registry.validity_check();
    info!(
        processes = registry.len(),
        violations = violations.len(),
        "registry checked"
    );
    if violations.is_empty() {
        println!("{} processes, no violations", registry.len());
        return Ok(());
    }
    for v in &violations {
        println!("{v}");
    }
    std::process::exit(1);
}

fn cmd_keys() -> Result<()> {
    let layout = KeyLayout::compiled();
    println!("layout: {}", layout.name);
    for (keys, action) in layout.describe() {
        println!("  {keys:<18} {action}");
    }
    Ok(())
}

fn cmd_config(path: Option<&Path>) -> Result<()> {
    let cfg = config::load_or_default(path)?;
    print!("{}", cfg.to_toml()?);
    Ok(())
}
