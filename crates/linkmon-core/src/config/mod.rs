//! Engine configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default so a partial file (or no
//! file at all) yields a runnable configuration.

pub mod alerting;
pub mod health;
pub mod logging;
pub mod server;
pub mod simulator;
pub mod telemetry;

use serde::{Deserialize, Serialize};

use self::alerting::AlertingConfig;
use self::health::HealthConfig;
use self::logging::LoggingConfig;
use self::server::ServerConfig;
use self::simulator::SimulatorConfig;
use self::telemetry::TelemetryConfig;

use crate::error::EngineError;

/// Root engine configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Connection telemetry and aggregation settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Health check thresholds.
    #[serde(default)]
    pub health: HealthConfig,
    /// Alert rules, channels, and delivery settings.
    #[serde(default)]
    pub alerting: AlertingConfig,
    /// Synthetic traffic generator settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl EngineConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `LINKMON`.
    pub fn load(env: &str) -> Result<Self, EngineError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LINKMON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EngineError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| EngineError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
