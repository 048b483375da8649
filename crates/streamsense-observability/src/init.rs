// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output goes to stderr. With the `file-logging` feature a JSON copy
//! can also be written to a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── streamsense.log
//! ```

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps background log writers alive; drop it only at process exit
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    #[cfg(feature = "file-logging")]
    log_dir: Option<std::path::PathBuf>,
}

impl LoggingGuard {
    /// Run folder holding the log files, when file logging is active
    #[cfg(feature = "file-logging")]
    pub fn log_dir(&self) -> Option<&std::path::Path> {
        self.log_dir.as_deref()
    }
}

fn console_layer(debug_flags: &CrateDebugFlags, format: LogFormat) -> BoxedLayer {
    let env_filter = EnvFilter::new(debug_flags.to_filter_string());
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => layer.with_filter(env_filter).boxed(),
        LogFormat::Json => layer.json().with_filter(env_filter).boxed(),
    }
}

/// Install the global subscriber writing to stderr
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, format: LogFormat) -> Result<LoggingGuard> {
    Registry::default()
        .with(vec![console_layer(debug_flags, format)])
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;
    Ok(LoggingGuard::default())
}

/// Install logging from a [`LoggingConfig`]
///
/// Without the `file-logging` feature `file_dir` is ignored.
pub fn init_logging_from_config(
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
) -> Result<LoggingGuard> {
    #[cfg(feature = "file-logging")]
    if let Some(dir) = &config.file_dir {
        return file::init_logging_with_files(debug_flags, config.format, dir);
    }
    init_logging(debug_flags, config.format)
}

#[cfg(feature = "file-logging")]
mod file {
    use super::*;
    use anyhow::Context;
    use chrono::Utc;
    use std::path::{Path, PathBuf};
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_appender::rolling;

    /// Rotated JSON file layer writing into a fresh `base_log_dir/run_<timestamp>/`
    pub(super) fn file_layer(
        debug_flags: &CrateDebugFlags,
        base_log_dir: &Path,
    ) -> Result<(BoxedLayer, WorkerGuard, PathBuf)> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let run_folder = base_log_dir.join(format!("run_{}", timestamp));
        std::fs::create_dir_all(&run_folder)
            .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

        let file_appender = rolling::daily(&run_folder, "streamsense.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(EnvFilter::new(debug_flags.to_filter_string()))
            .boxed();

        Ok((layer, guard, run_folder))
    }

    /// Console layer plus a rotated JSON file in `base_log_dir/run_<timestamp>/`
    pub fn init_logging_with_files(
        debug_flags: &CrateDebugFlags,
        format: LogFormat,
        base_log_dir: &Path,
    ) -> Result<LoggingGuard> {
        let (layer, guard, run_folder) = file_layer(debug_flags, base_log_dir)?;

        Registry::default()
            .with(vec![console_layer(debug_flags, format), layer])
            .try_init()
            .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

        Ok(LoggingGuard {
            _file_guards: vec![guard],
            log_dir: Some(run_folder),
        })
    }
}

#[cfg(feature = "file-logging")]
pub use file::init_logging_with_files;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_instead_of_panicking() {
        let flags = CrateDebugFlags::default();
        // Another test in this process may already have installed one.
        let _ = init_logging(&flags, LogFormat::Text);
        assert!(init_logging(&flags, LogFormat::Json).is_err());
    }

    #[cfg(feature = "file-logging")]
    #[test]
    fn test_file_layer_writes_json_into_run_folder() {
        let base = tempfile::tempdir().unwrap();
        let (layer, guard, run_folder) =
            file::file_layer(&CrateDebugFlags::default(), base.path()).unwrap();

        let subscriber = Registry::default().with(vec![layer]);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(stream = "EEG-1", "session opened");
            tracing::debug!("filtered out at the default level");
        });
        drop(guard);

        assert_eq!(run_folder.parent(), Some(base.path()));
        let folder_name = run_folder.file_name().unwrap().to_string_lossy().into_owned();
        assert!(folder_name.starts_with("run_"));

        let contents: String = std::fs::read_dir(&run_folder)
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        assert!(contents.contains("session opened"));
        assert!(contents.contains("\"stream\":\"EEG-1\""));
        assert!(!contents.contains("filtered out"));
    }
}
