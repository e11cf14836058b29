use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::error::{Error, Result};

/// Environment variable holding an `EnvFilter` directive; wins over `[log].level`.
pub const LOG_ENV: &str = "SYM_LOG";

/// Installs the global subscriber.
///
/// Output goes to the configured file when there is one. Without a file,
/// interactive sessions log nothing (stderr would land on the form) and the
/// other commands log to stderr.
pub fn init(cfg: &LogConfig, file_override: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(cfg.level.as_deref().unwrap_or("info"))
            .map_err(|e| Error::msg(format!("invalid log level: {e}")))?,
    };

    let file: Option<PathBuf> = file_override
        .map(Path::to_path_buf)
        .or_else(|| cfg.file.clone());

    let installed = match file {
        Some(path) => {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    Error::msg(format!("failed to open log file {}: {e}", path.display()))
                })?;
            let writer = Mutex::new(f);
            match cfg.format {
                LogFormat::Text => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .try_init(),
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .try_init(),
            }
        }
        None if interactive => return Ok(()),
        None => match cfg.format {
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
        },
    };
    installed.map_err(|e| Error::msg(format!("failed to install logger: {e}")))
}
