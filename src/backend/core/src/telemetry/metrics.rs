//! Metrics for parameter binding, validation and filter rejections.
//!
//! Metrics are emitted through the `metrics` facade. Installing a recorder
//! (Prometheus or otherwise) is left to the host process.
//!
//! # Example
//!
//! ```rust,no_run
//! use apex_binding::telemetry::metrics::{BindingMetrics, BindOutcome};
//!
//! let timer = BindingMetrics::start("orders.create", "order");
//! timer.finish(BindOutcome::Bound);
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Instant;

static DESCRIBE: Once = Once::new();

/// Register all metric descriptions. Safe to call more than once.
pub fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_histogram!(
            "apex_binding_parameter_duration_seconds",
            "Time spent binding and validating one parameter"
        );
        describe_counter!(
            "apex_binding_parameters_total",
            "Parameters processed, by outcome"
        );
        describe_counter!(
            "apex_binding_validation_failures_total",
            "Bound models that failed validation"
        );
        describe_counter!(
            "apex_binding_missing_required_total",
            "Binding-required values that were not provided"
        );
        describe_counter!(
            "apex_binding_model_state_rejections_total",
            "Actions short-circuited because model state was invalid"
        );
        describe_counter!("apex_binding_errors_total", "Binding errors by code");
    });
}

/// How a parameter bind ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// A value was bound.
    Bound,
    /// No value was bound.
    Unbound,
    /// The request predicate excluded the parameter.
    Skipped,
    /// The bind returned an error.
    Error,
}

impl BindOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::Unbound => "unbound",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Parameter binding metrics.
pub struct BindingMetrics;

impl BindingMetrics {
    /// Record one processed parameter.
    pub fn record(action: &str, parameter: &str, outcome: BindOutcome, duration_seconds: f64) {
        histogram!(
            "apex_binding_parameter_duration_seconds",
            "action" => action.to_string(),
            "parameter" => parameter.to_string(),
        )
        .record(duration_seconds);

        counter!(
            "apex_binding_parameters_total",
            "action" => action.to_string(),
            "outcome" => outcome.as_str(),
        )
        .increment(1);
    }

    /// Start timing a parameter bind.
    pub fn start(action: &str, parameter: &str) -> BindTimer {
        BindTimer {
            start: Instant::now(),
            action: action.to_string(),
            parameter: parameter.to_string(),
        }
    }

    /// Record an action rejected by the model-state filter.
    pub fn model_state_rejected(action: &str) {
        counter!(
            "apex_binding_model_state_rejections_total",
            "action" => action.to_string(),
        )
        .increment(1);
    }
}

/// Timer for one parameter bind.
pub struct BindTimer {
    start: Instant,
    action: String,
    parameter: String,
}

impl BindTimer {
    /// Finish timing and record the outcome.
    pub fn finish(self, outcome: BindOutcome) {
        let duration = self.start.elapsed().as_secs_f64();
        BindingMetrics::record(&self.action, &self.parameter, outcome, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        describe_metrics();
        describe_metrics();
        BindingMetrics::start("a", "id").finish(BindOutcome::Bound);
        BindingMetrics::model_state_rejected("a");
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(BindOutcome::Bound.as_str(), "bound");
        assert_eq!(BindOutcome::Skipped.as_str(), "skipped");
    }
}
