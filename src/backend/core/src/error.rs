//! Error handling for the binding pipeline.
//!
//! Two very different kinds of failure flow through this crate:
//!
//! - **Programming errors** (argument-contract violations, missing binders,
//!   misconfiguration). These are returned as [`BindingError`] immediately and
//!   never touch the per-request [`ModelStateDictionary`].
//! - **Request-data problems** (unparsable values, failed validators, missing
//!   required values). These are recorded in the [`ModelStateDictionary`] and
//!   surfaced collectively by the auto-validate filter.
//!
//! [`BindingError`] carries a stable [`ErrorCode`], maps to an HTTP status,
//! records a metrics counter on construction and renders as JSON through axum.
//!
//! [`ModelStateDictionary`]: crate::validation::ModelStateDictionary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Contract Errors (1000-1099)
    ArgumentInvalid,
    UnknownModelType,
    BinderUnavailable,

    // Binding Errors (1100-1199)
    InputFormat,
    BindingFailed,
    BindingCancelled,

    // Configuration Errors (5000-5099)
    ConfigurationError,

    // Internal Errors (9000-9099)
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub const fn numeric_code(&self) -> u32 {
        match self {
            Self::ArgumentInvalid => 1000,
            Self::UnknownModelType => 1001,
            Self::BinderUnavailable => 1002,

            Self::InputFormat => 1100,
            Self::BindingFailed => 1101,
            Self::BindingCancelled => 1102,

            Self::ConfigurationError => 5000,

            Self::InternalError => 9000,
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Contract and configuration errors are server faults. An input-format
    /// error only reaches a client as a raw error when the formatter policy
    /// chose to propagate it, which makes it a server fault as well.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::BindingCancelled => StatusCode::REQUEST_TIMEOUT,
            Self::ArgumentInvalid
            | Self::UnknownModelType
            | Self::BinderUnavailable
            | Self::InputFormat
            | Self::BindingFailed
            | Self::ConfigurationError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self.numeric_code() {
            1000..=1099 => "contract",
            1100..=1199 => "binding",
            5000..=5099 => "configuration",
            9000..=9099 => "internal",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Bad request data that was not recoverable into model state
    Low,
    /// Operational issues (cancellation)
    Medium,
    /// Programming or wiring errors
    High,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::InputFormat | ErrorCode::BindingFailed => Self::Low,
            ErrorCode::BindingCancelled => Self::Medium,
            ErrorCode::ArgumentInvalid
            | ErrorCode::UnknownModelType
            | ErrorCode::BinderUnavailable
            | ErrorCode::ConfigurationError
            | ErrorCode::InternalError => Self::High,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Additional structured details about an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context key-value pairs
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Name of the argument that violated its contract
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.argument = Some(argument.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.context.is_empty() && self.argument.is_none()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The error type for binding operations.
#[derive(Error, Debug)]
pub struct BindingError {
    /// Machine-readable error code
    code: ErrorCode,

    /// Message safe to expose (also used as the model-state message for
    /// input-format errors)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Additional structured details
    details: ErrorDetails,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl BindingError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            details: ErrorDetails::default(),
            source: None,
        };
        error.record_metrics();
        error
    }

    /// An argument-contract violation on a public entry point.
    pub fn argument(argument: &str, message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ArgumentInvalid, message)
            .with_details(ErrorDetails::new().with_argument(argument))
    }

    /// The metadata provider does not know the requested type.
    pub fn unknown_type(type_name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownModelType,
            format!("No metadata is registered for model type '{}'", type_name),
        )
        .with_context("model_type", type_name)
    }

    /// No binder provider accepted the metadata.
    pub fn binder_unavailable(type_name: &str) -> Self {
        Self::new(
            ErrorCode::BinderUnavailable,
            format!(
                "Could not create a model binder for model object of type '{}'",
                type_name
            ),
        )
        .with_context("model_type", type_name)
    }

    /// The input was not in the expected format.
    pub fn input_format(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InputFormat, message)
    }

    /// A binder gave up for a reason other than malformed input.
    pub fn binding_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::BindingFailed, message)
    }

    /// The binder's underlying read was cancelled.
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::BindingCancelled, "Model binding was cancelled")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::ConfigurationError, message)
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, "An internal error occurred")
            .with_internal_message(message)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Add error details.
    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    /// Add context to details.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.context.insert(key.into(), v);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    /// Whether this error is an argument-contract violation.
    pub fn is_contract_violation(&self) -> bool {
        self.code.category() == "contract"
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();

        match self.severity() {
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    details = ?self.details,
                    "Binding pipeline error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Binding interrupted"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    user_message = %self.user_message,
                    "Binding input rejected"
                );
            }
        }
    }

    fn record_metrics(&self) {
        counter!(
            "apex_binding_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category().to_string(),
            "severity" => format!("{:?}", self.severity()),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Whether the request was successful (always false for errors)
    pub success: bool,

    /// Error information
    pub error: ErrorInfo,
}

/// Detailed error information for API responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub numeric_code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&BindingError> for ErrorResponse {
    fn from(error: &BindingError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                numeric_code: error.code.numeric_code(),
                message: error.user_message.to_string(),
                details: if error.details.is_empty() {
                    None
                } else {
                    Some(error.details.clone())
                },
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

impl IntoResponse for BindingError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

impl From<config::ConfigError> for BindingError {
    fn from(err: config::ConfigError) -> Self {
        BindingError::configuration(err.to_string()).with_source(err)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes_fall_in_their_category() {
        assert_eq!(ErrorCode::ArgumentInvalid.category(), "contract");
        assert_eq!(ErrorCode::BinderUnavailable.category(), "contract");
        assert_eq!(ErrorCode::InputFormat.category(), "binding");
        assert_eq!(ErrorCode::ConfigurationError.category(), "configuration");
        assert_eq!(ErrorCode::InternalError.category(), "internal");
    }

    #[test]
    fn test_argument_error_records_argument_name() {
        let err = BindingError::argument("parameter", "Parameter name must not be empty");
        assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
        assert!(err.is_contract_violation());
        assert_eq!(err.details().argument.as_deref(), Some("parameter"));
    }

    #[test]
    fn test_display_includes_internal_message() {
        let err = BindingError::internal("binder cache poisoned");
        let text = err.to_string();
        assert!(text.contains("InternalError"));
        assert!(text.contains("binder cache poisoned"));
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(BindingError::input_format("bad json").severity(), ErrorSeverity::Low);
        assert_eq!(BindingError::cancelled().severity(), ErrorSeverity::Medium);
        assert_eq!(BindingError::unknown_type("Widget").severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_error_response_omits_empty_details() {
        let err = BindingError::binding_failed("stream closed");
        let response = ErrorResponse::from(&err);
        assert!(!response.success);
        assert!(response.error.details.is_none());
        assert_eq!(response.error.numeric_code, 1101);
    }

    #[test]
    fn test_into_response_status() {
        let response = BindingError::cancelled().into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
