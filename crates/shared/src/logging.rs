//! Logging infrastructure for the MAL API toolkit.
//!
//! Console output goes to stderr so that command results on stdout stay
//! machine-readable. File output rotates daily.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            component: "mal-client".to_string(),
            default_level: Level::INFO,
            console: true,
            file: false,
            json_format: false,
        }
    }
}

/// Build the filter directive used when `RUST_LOG` is not set
fn default_directives(config: &LogConfig) -> String {
    format!(
        "{}={},shared={},thirtyfour=warn,hyper=warn,reqwest=warn,h2=warn",
        config.component.replace('-', "_"),
        config.default_level,
        config.default_level
    )
}

/// Initialize logging with the given configuration
///
/// Sets up tracing with:
/// - Module-specific log levels, overridable via `RUST_LOG`
/// - Human-readable console output on stderr
/// - Optional daily-rotated file output, plain or JSON
pub fn init(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config)));

    let mut layers = Vec::new();

    if config.console {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed();
        layers.push(console_layer);
    }

    if config.file {
        let log_dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        component = %config.component,
        log_dir = %config.log_dir,
        file = config.file,
        "Logging initialized"
    );

    Ok(())
}
