//! Telemetry: structured logging and binding metrics.
//!
//! - **Logging**: JSON/pretty/compact logging through `tracing-subscriber`
//! - **Metrics**: counters and histograms for binding and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use apex_binding::config::ObservabilityConfig;
//! use apex_binding::telemetry::init_telemetry;
//!
//! let config = ObservabilityConfig::default();
//! init_telemetry(&config).expect("Failed to initialize telemetry");
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{describe_metrics, BindOutcome, BindTimer, BindingMetrics};

use crate::config::ObservabilityConfig;

/// Initialize logging and register metric descriptions.
///
/// Should be called once at application startup.
///
/// # Errors
///
/// Returns an error if the logging subscriber cannot be installed.
pub fn init_telemetry(config: &ObservabilityConfig) -> anyhow::Result<()> {
    init_logging(&config.logging, &config.environment)?;
    describe_metrics();

    ::tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        "Telemetry initialized"
    );
    Ok(())
}
