use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{self, RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Append-only log holding every ERROR event of every run.
pub const ERROR_LOG_FILE: &str = "errors.log";

const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);

#[allow(dead_code)]
pub struct LoggerGuard(Vec<WorkerGuard>);

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        _ => None,
    }
}

/// Console + daily file + error log. Call once, keep the guard alive for the run.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)?;

    let parsed_level = parse_level(level);
    let builder = EnvFilter::builder().with_default_directive(parsed_level.unwrap_or(LevelFilter::INFO).into());
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();

    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;
    let (file_writer, file_guard) = NonBlocking::new(file_appender);

    let (error_writer, error_guard) = NonBlocking::new(rolling::never(log_dir, ERROR_LOG_FILE));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(file_filter);
    let error_layer = fmt::layer()
        .with_writer(error_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(LevelFilter::ERROR);
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(error_layer)
        .with(stdout_layer)
        .try_init()?;

    if parsed_level.is_none() {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    if let Err(e) = cleanup_old_logs(log_dir, prefix, MAX_LOG_AGE) {
        tracing::warn!("Failed to delete old log file: {}", e);
    }

    Ok(LoggerGuard(vec![file_guard, error_guard]))
}

/// Remove rotated run logs older than `max_age`. The error log is never removed.
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") && file_name != ERROR_LOG_FILE {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        removed += 1;
                        tracing::info!("Old log file deleted: {}", file_name);
                    }
                }
            }
        }
    }
    Ok(removed)
}
