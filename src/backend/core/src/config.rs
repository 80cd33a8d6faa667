//! Configuration management.

use crate::telemetry::LoggingConfig;
use crate::validation::DEFAULT_MAX_MODEL_ERRORS;
use serde::Deserialize;

const ENV_PREFIX: &str = "APEX_BINDING";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Binding and validation behaviour
    #[serde(default)]
    pub binding: BindingOptions,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Options consumed by the parameter binder and the API-behaviour convention.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingOptions {
    /// Cap on model-state errors per request
    #[serde(default = "default_max_model_errors")]
    pub max_model_errors: usize,

    /// Treat input-format errors as client errors when the binder declares
    /// no policy of its own
    #[serde(default = "default_input_format_errors_as_bad_request")]
    pub input_format_errors_as_bad_request: bool,

    /// Do not attach the automatic model-state check to API actions
    #[serde(default)]
    pub suppress_auto_validation: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            max_model_errors: default_max_model_errors(),
            input_format_errors_as_bad_request: default_input_format_errors_as_bad_request(),
            suppress_auto_validation: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Service name attached to startup logs
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            environment: default_environment(),
            logging: LoggingConfig::default(),
        }
    }
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_model_errors() -> usize { DEFAULT_MAX_MODEL_ERRORS }
fn default_input_format_errors_as_bad_request() -> bool { true }
fn default_service_name() -> String { "apex-binding".to_string() }
fn default_environment() -> String { "development".to_string() }

impl Config {
    /// Load configuration from environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}
