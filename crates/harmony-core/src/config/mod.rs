//! Agent configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Every field has a default, so the agent starts with no
//! configuration file at all.

pub mod logging;
pub mod reload;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::reload::ReloadConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root agent configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay) and `HARMONY__*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Reconciliation worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Reload shape overrides.
    #[serde(default)]
    pub reload: ReloadConfig,
}

impl AgentConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `HARMONY__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false));

        Self::from_builder(builder)
    }

    /// Load configuration from an inline TOML document, still honouring
    /// `HARMONY__*` environment overrides.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml));

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, AppError> {
        let config = builder
            .add_source(
                config::Environment::with_prefix("HARMONY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
