use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log file name, written next to the database
pub const LOG_FILE: &str = "linkmaster.log";

/// Directory holding the log for a given database file.
pub fn log_dir(db_path: &Path) -> PathBuf {
  match db_path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
    _ => PathBuf::from("."),
  }
}

/// Route tracing output to `<dir>/linkmaster.log`.
///
/// Stdout is reserved for command output. The filter comes from
/// `LINKMASTER_LOG` (default `info`). Keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("LINKMASTER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

/// Like [`init`], but a logging failure only costs the log file.
pub fn init_or_warn(dir: &Path) -> Option<WorkerGuard> {
  match init(dir) {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: logging disabled: {}", e);
      None
    }
  }
}
