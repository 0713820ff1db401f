//! Diagnostic logging.
//!
//! Structured logging through the `tracing` crate. The subscriber is the
//! only process-wide state the crate owns; everything else lives behind a
//! store handle.

use crate::error::FsError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted for a filter directive, e.g.
/// `CHRONOFS_LOG=chronofs=debug`.
pub const LOG_ENV_VAR: &str = "CHRONOFS_LOG";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: json or text.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Initialize the global subscriber. The environment variable wins over the
/// provided config; defaults apply when neither is set. Fails if a
/// subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), FsError> {
    let fallback = config.map(|c| c.level.clone()).unwrap_or_else(default_level);
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(format!("chronofs={}", fallback)));

    let json = config.map(|c| c.format == "json").unwrap_or(false);
    let builder = fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| FsError::io_other(format!("failed to install log subscriber: {}", e)))
}
