use crate::config::{LogFormat, LoggingConfig};
use crate::error::{FruitcamError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix for the rolling log file
const LOG_FILE_PREFIX: &str = "fruitcam.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. When a log directory is set,
/// a daily rolling file is written as well; keep the returned guard alive
/// for as long as logs should be flushed to it.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let verbose = config.level.eq_ignore_ascii_case("debug")
        || config.level.eq_ignore_ascii_case("trace");

    let fmt_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(verbose)
            .with_file(verbose)
            .with_line_number(verbose)
            .boxed(),
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| FruitcamError::system(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

fn default_directive(level: &str) -> String {
    format!("fruitcam={}", level.to_ascii_lowercase())
}
