//! Action filters: hooks that run around a handler once binding is done.
//!
//! - **[`ActionFilter`]**: ordered executing/executed hooks
//! - **[`AutoValidateModelFilter`]**: short-circuits with a 400 problem when
//!   model state is invalid
//! - **[`ApiBehaviorConvention`]**: attaches the auto-validate filter to API
//!   actions
//! - **[`ValidationProblemDetails`]**: the problem body for invalid model state
//!
//! Filters are sorted by [`ActionFilter::order`] (ascending, stable).
//! Executing hooks run in that order and the first filter that sets a result
//! short-circuits the rest, including the handler. Executed hooks run in
//! reverse for every filter whose executing hook completed without
//! short-circuiting.

pub mod auto_validate;
pub mod conventions;
pub mod problem;

pub use auto_validate::{AutoValidateModelFilter, ProblemResponseFactory};
pub use conventions::{apply_conventions, ActionConvention, ApiBehaviorConvention};
pub use problem::ValidationProblemDetails;

use crate::binding::ActionContext;
use crate::invoker::ActionArguments;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════════════
// Action Result
// ═══════════════════════════════════════════════════════════════════════════════

/// What an action (or a short-circuiting filter) produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Json { status: StatusCode, body: Value },
    ValidationProblem(ValidationProblemDetails),
    NoContent,
}

impl ActionResult {
    /// `200 OK` with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::Json {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self::Json { status, body }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Json { status, .. } => *status,
            Self::ValidationProblem(problem) => problem.status_code(),
            Self::NoContent => StatusCode::NO_CONTENT,
        }
    }

    pub fn is_validation_problem(&self) -> bool {
        matches!(self, Self::ValidationProblem(_))
    }
}

impl IntoResponse for ActionResult {
    fn into_response(self) -> Response {
        match self {
            Self::Json { status, body } => (status, Json(body)).into_response(),
            Self::ValidationProblem(problem) => problem.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filter Contexts
// ═══════════════════════════════════════════════════════════════════════════════

/// State visible to a filter before the handler runs.
///
/// Setting `result` short-circuits the pipeline.
pub struct ActionExecutingContext<'a> {
    pub action_context: &'a mut ActionContext,
    pub arguments: &'a ActionArguments,
    pub result: Option<ActionResult>,
}

impl<'a> ActionExecutingContext<'a> {
    pub fn new(action_context: &'a mut ActionContext, arguments: &'a ActionArguments) -> Self {
        Self {
            action_context,
            arguments,
            result: None,
        }
    }

    pub fn is_short_circuited(&self) -> bool {
        self.result.is_some()
    }
}

/// State visible to a filter after the handler ran (or was skipped).
pub struct ActionExecutedContext<'a> {
    pub action_context: &'a mut ActionContext,
    pub result: ActionResult,
    /// A later filter short-circuited, so the handler never ran.
    pub canceled: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Filter Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// A hook around action execution.
pub trait ActionFilter: Send + Sync {
    /// Lower values run first.
    fn order(&self) -> i32 {
        0
    }

    /// Whether one instance may be shared across requests and actions.
    fn is_reusable(&self) -> bool {
        false
    }

    /// Stable name for logging and de-duplication.
    fn filter_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn on_action_executing(&self, context: &mut ActionExecutingContext<'_>);

    fn on_action_executed(&self, _context: &mut ActionExecutedContext<'_>) {}
}
