use crate::config::{LogFormat, LoggingConfig};
use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Prefix of the daily rolling log files
pub const LOG_FILE_NAME: &str = "doc-bridge.log";

/// Install the global subscriber.
///
/// With a log directory configured, events go to the console and to a daily
/// rolling file. The returned guard flushes the file writer and must be held
/// for the life of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = build_filter(&config.level);

    let (installed, guard) = match &config.directory {
        Some(dir) => {
            ensure_log_dir(dir)?;
            let (file_writer, guard) = non_blocking(rolling::daily(dir, LOG_FILE_NAME));
            let writer = std::io::stdout.and(file_writer);

            let installed = match config.format {
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .with_target(true)
                    .try_init(),
                LogFormat::Human => tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .try_init(),
            };
            (installed, Some(guard))
        }
        None => {
            let installed = match config.format {
                LogFormat::Json => tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter)
                    .with_target(true)
                    .try_init(),
                LogFormat::Human => tracing_subscriber::fmt()
                    .with_env_filter(env_filter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .try_init(),
            };
            (installed, None)
        }
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    tracing::info!(
        level = %config.level,
        format = ?config.format,
        directory = ?config.directory,
        "logging initialized"
    );

    Ok(guard)
}

/// Level or directive string, falling back to `info` when unparsable
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn ensure_log_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
