//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log output settings for the agent binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"harmony_hotswap=debug"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Include thread ids in records. Useful when following a reconciliation
    /// job across worker threads.
    #[serde(default = "default_thread_ids")]
    pub thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            thread_ids: default_thread_ids(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_thread_ids() -> bool {
    true
}
