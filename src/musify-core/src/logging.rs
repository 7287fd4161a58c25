use crate::{config::LoggingConfig, paths::AppDirs};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "musify.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Installs the global subscriber: a daily rolling file under the log dir,
/// mirrored to stdout when `config.stdout` is set.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig, dirs: &AppDirs) -> Result<LoggingGuard, LoggingError> {
    let log_dir = dirs.log_dir().to_path_buf();
    fs::create_dir_all(&log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.clone(),
        source,
    })?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.as_filter_directive()).map_err(|source| {
            LoggingError::ParseLevel {
                level: config.level.as_filter_directive().to_string(),
                source,
            }
        })?,
    };

    let file_stem = config.file_name.as_deref().unwrap_or(DEFAULT_LOG_FILE);
    let removed = cleanup_old_logs(&log_dir, file_stem, config.max_log_files.max(1))?;

    let appender = tracing_appender::rolling::daily(&log_dir, file_stem);
    let (file, file_guard) = tracing_appender::non_blocking(appender);
    let writer = if config.stdout {
        BoxMakeWriter::new(std::io::stdout.and(file))
    } else {
        BoxMakeWriter::new(file)
    };

    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(LoggingError::SubscriberInstall)?;

    tracing::debug!(
        log_dir = %log_dir.display(),
        removed,
        "logging initialised"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Removes the oldest files sharing `file_stem` until at most `max_files`
/// remain. Returns how many were removed.
fn cleanup_old_logs(dir: &Path, file_stem: &str, max_files: usize) -> Result<usize, LoggingError> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(file_stem))
        .filter_map(|entry| {
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((entry.path(), modified))
        })
        .collect();

    if entries.len() <= max_files {
        return Ok(0);
    }

    entries.sort_by_key(|(_, modified)| *modified);
    let remove_count = entries.len() - max_files;
    for (path, _) in entries.into_iter().take(remove_count) {
        fs::remove_file(&path).map_err(|source| LoggingError::Cleanup { path, source })?;
    }
    Ok(remove_count)
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse log level {level}: {source}")]
    ParseLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInstall(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove old log file {path}: {source}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
