/// Telemetry Module - Structured Logging with Tracing
///
/// - Structured logging with tracing, written to stderr so stdout only
///   carries the tools' progress lines
/// - JSON vs pretty format support
/// - Optional file logging with daily rotation
/// - RUST_LOG env var support
/// - Truncation helpers for log fields

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub log_level: String,
    /// Log format: "json" or "pretty"
    pub log_format: String,
    /// Optional log file path (None = stderr only)
    pub log_file: Option<String>,
    /// Rotation interval: "daily", "hourly", "never"
    pub rotation: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
            log_format: std::env::var("STAFFOPS_LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
            log_file: std::env::var("STAFFOPS_LOG_FILE").ok(),
            rotation: "daily".to_string(),
        }
    }
}

/// Initialize tracing subscriber
///
/// Returns the appender guard when logging to a file; keep it alive until
/// exit or buffered lines are lost.
pub fn init_tracing(
    config: TelemetryConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if let Some(log_file_path) = config.log_file {
        let path = std::path::Path::new(&log_file_path);
        let directory = path.parent()
            .ok_or("Invalid log file path: no parent directory")?;
        let file_name = path.file_name()
            .ok_or("Invalid log file path: no filename")?;
        let filename_prefix = path.file_stem()
            .and_then(|s| s.to_str())
            .ok_or("Invalid log file path: no filename")?;

        let file_appender = match config.rotation.as_str() {
            "hourly" => rolling::hourly(directory, filename_prefix),
            "never" => rolling::never(directory, file_name),
            _ => rolling::daily(directory, filename_prefix),
        };

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if config.log_format == "json" {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_writer(non_blocking)
                )
                .try_init()?;
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(non_blocking)
                )
                .try_init()?;
        }

        return Ok(Some(guard));
    }

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr)
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
            )
            .try_init()?;
    }

    Ok(None)
}

/// Truncate text (SQL statements, error bodies) for logging
///
/// Cuts on a char boundary, so accented names never split.
///
/// Example: "CREATE TABLE IF NOT EXISTS x (...)" (max 12) → "CREATE TABLE..."
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match single_line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &single_line[..cut]),
        None => single_line,
    }
}

/// Truncate list for logging
///
/// Shows first N items, indicates total count if longer
///
/// Example: ["a", "b", "c", "d", "e", "f"] (max 3) → "[3 of 6]: [a, b, c]"
pub fn truncate_list<T: std::fmt::Display>(items: &[T], max: usize) -> String {
    let preview: Vec<String> = items.iter().take(max).map(|i| i.to_string()).collect();
    if items.len() <= max {
        format!("[{}]", preview.join(", "))
    } else {
        format!("[{} of {}]: [{}]", max, items.len(), preview.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcd", 16), "abcd");
        assert_eq!(truncate_text("CREATE TABLE IF NOT EXISTS x", 12), "CREATE TABLE...");
        assert_eq!(truncate_text("  ALTER\n  TABLE  ", 16), "ALTER TABLE");
        assert_eq!(truncate_text("avaliações", 7), "avaliaç...");
        assert_eq!(truncate_text("", 16), "");
    }

    #[test]
    fn test_truncate_list() {
        assert_eq!(truncate_list(&["a", "b"], 3), "[a, b]");
        assert_eq!(
            truncate_list(&["a", "b", "c", "d", "e", "f"], 3),
            "[3 of 6]: [a, b, c]"
        );
        assert_eq!(truncate_list::<&str>(&[], 3), "[]");
    }
}
