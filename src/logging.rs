//! Logger initialization for the CLI.

use std::io::Write;

use clap::ValueEnum;
use colored::Colorize;
use log::LevelFilter;

/// Logging level for the CLI.
///
/// Controls the verbosity of log output, from most restrictive (`Error`) to
/// most verbose (`Trace`).
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Initializes `env_logger` with the given level and format.
///
/// The builder reads `RUST_LOG` first, then the explicit level overrides
/// it, so `RUST_LOG=debug` works for quick digging while `--log-level`
/// stays authoritative.
pub fn init_logger(level: LogLevel, format: LogFormat) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level.into());

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "{{\"ts\":{},\"level\":\"{}\",\"target\":\"{}\",\"msg\":{}}}",
                    chrono::Utc::now().timestamp_millis(),
                    record.level(),
                    record.target(),
                    serde_json::to_string(&record.args().to_string())
                        .unwrap_or_else(|_| "\"\"".into())
                )
            });
        }
        LogFormat::Plain => {
            builder.format(|buf, record| {
                let level = record.level();
                let colored_level = match level {
                    log::Level::Error => level.to_string().red(),
                    log::Level::Warn => level.to_string().yellow(),
                    log::Level::Info => level.to_string().green(),
                    log::Level::Debug => level.to_string().blue(),
                    log::Level::Trace => level.to_string().purple(),
                };
                writeln!(buf, "[{}] {} {}", colored_level, record.target().cyan(), record.args())
            });
        }
    }

    // A second init in the same process (tests) is harmless.
    let _ = builder.try_init();
}
