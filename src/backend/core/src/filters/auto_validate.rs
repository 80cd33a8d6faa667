//! Rejecting requests whose model state is invalid.

use super::{ActionExecutingContext, ActionFilter, ActionResult, ValidationProblemDetails};
use crate::binding::ActionContext;
use crate::telemetry::BindingMetrics;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds the short-circuit response for an invalid model state.
pub type ProblemResponseFactory = Arc<dyn Fn(&ActionContext) -> ActionResult + Send + Sync>;

/// Short-circuits an action with a 400 problem response when binding or
/// validation left model state invalid.
///
/// Runs after every parameter is bound and before any other filter with a
/// higher order. Leaves an existing short-circuit result untouched.
#[derive(Clone, Default)]
pub struct AutoValidateModelFilter {
    response_factory: Option<ProblemResponseFactory>,
}

impl AutoValidateModelFilter {
    pub const ORDER: i32 = -2000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default problem response.
    pub fn with_response_factory(mut self, factory: ProblemResponseFactory) -> Self {
        self.response_factory = Some(factory);
        self
    }

    fn invalid_model_state_response(&self, action_context: &ActionContext) -> ActionResult {
        match &self.response_factory {
            Some(factory) => factory(action_context),
            None => ActionResult::ValidationProblem(
                ValidationProblemDetails::from_model_state(
                    &action_context.model_state,
                    action_context.trace_id.clone(),
                )
                .with_instance(action_context.request.uri.path()),
            ),
        }
    }
}

impl ActionFilter for AutoValidateModelFilter {
    fn order(&self) -> i32 {
        Self::ORDER
    }

    fn is_reusable(&self) -> bool {
        true
    }

    fn filter_name(&self) -> &'static str {
        "AutoValidateModelFilter"
    }

    fn on_action_executing(&self, context: &mut ActionExecutingContext<'_>) {
        if context.result.is_some() {
            debug!("Result already set, skipping model state check");
            return;
        }
        if context.action_context.model_state.is_valid() {
            return;
        }

        let action = context.action_context.action.id();
        info!(
            action = %action,
            error_count = context.action_context.model_state.error_count(),
            trace_id = %context.action_context.trace_id,
            "Model state invalid, short-circuiting action"
        );
        BindingMetrics::model_state_rejected(action);
        context.result = Some(self.invalid_model_state_response(context.action_context));
    }
}

impl fmt::Debug for AutoValidateModelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoValidateModelFilter")
            .field("order", &Self::ORDER)
            .field("custom_response", &self.response_factory.is_some())
            .finish()
    }
}
