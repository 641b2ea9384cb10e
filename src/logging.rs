use crate::config::LoggingConfig;
use crate::constants::DEFAULT_LOG_FILE;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with console output and, when enabled, a
/// JSON file under `log_dir` rotated daily.
///
/// Keep the returned guard alive until exit so buffered file logs are
/// flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = if config.json_file && fs::create_dir_all(&config.log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::daily(&config.log_dir, DEFAULT_LOG_FILE);
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
        (
            Some(fmt::layer().json().with_writer(non_blocking_writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}
