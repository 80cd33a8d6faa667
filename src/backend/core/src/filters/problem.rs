//! RFC 7807 problem details for invalid model state.

use crate::validation::ModelStateDictionary;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Problem type for a 400 response.
pub const BAD_REQUEST_TYPE: &str = "https://tools.ietf.org/html/rfc9110#section-15.5.1";

/// Title used for model-state problems.
pub const VALIDATION_TITLE: &str = "One or more validation errors occurred.";

/// Field-keyed validation problem returned when model state is invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Field key to error messages. Request-wide errors use the empty key.
    pub errors: BTreeMap<String, Vec<String>>,
    #[serde(rename = "traceId")]
    pub trace_id: String,
}

impl ValidationProblemDetails {
    pub fn new(errors: BTreeMap<String, Vec<String>>, trace_id: impl Into<String>) -> Self {
        Self {
            problem_type: BAD_REQUEST_TYPE.to_string(),
            title: VALIDATION_TITLE.to_string(),
            status: StatusCode::BAD_REQUEST.as_u16(),
            detail: None,
            instance: None,
            errors,
            trace_id: trace_id.into(),
        }
    }

    /// Snapshot the errors currently recorded in `model_state`.
    pub fn from_model_state(model_state: &ModelStateDictionary, trace_id: impl Into<String>) -> Self {
        Self::new(model_state.to_message_map(), trace_id)
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST)
    }
}

impl IntoResponse for ValidationProblemDetails {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}
