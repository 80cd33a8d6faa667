//! Running one action: bind every parameter, run filters, call the handler.

use crate::binding::{ActionContext, ActionDescriptor, ParameterBinder, RequestHead, ValueProvider};
use crate::error::Result;
use crate::filters::{ActionExecutedContext, ActionExecutingContext, ActionFilter, ActionResult};
use crate::model::Model;
use crate::validation::ModelStateDictionary;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

// ═══════════════════════════════════════════════════════════════════════════════
// Arguments & Handlers
// ═══════════════════════════════════════════════════════════════════════════════

/// Bound parameter values, by parameter name. Parameters that were not bound
/// are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionArguments(BTreeMap<String, Model>);

impl ActionArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Model) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Model)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Model> {
        self.0
    }
}

/// An action body.
pub type ActionHandler = Arc<dyn Fn(ActionArguments) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Wrap an async function as an [`ActionHandler`].
pub fn handler<F, Fut>(f: F) -> ActionHandler
where
    F: Fn(ActionArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    Arc::new(move |arguments| f(arguments).boxed())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Invoker
// ═══════════════════════════════════════════════════════════════════════════════

/// The outcome of one invocation.
#[derive(Debug)]
pub struct Invocation {
    pub result: ActionResult,
    pub action_context: ActionContext,
    /// A filter produced the result and the handler did not run.
    pub short_circuited: bool,
}

/// Drives parameter binding, filters and the handler for an action.
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    binder: Arc<ParameterBinder>,
}

impl ActionInvoker {
    pub fn new(binder: Arc<ParameterBinder>) -> Self {
        Self { binder }
    }

    pub fn binder(&self) -> &Arc<ParameterBinder> {
        &self.binder
    }

    /// Invoke `action` for one request.
    ///
    /// Parameters are bound in declaration order into a fresh model state.
    /// Filters then run by ascending order; the first one to set a result
    /// short-circuits the rest and the handler. Executed hooks run in reverse
    /// for the filters whose executing hook ran without short-circuiting.
    ///
    /// # Errors
    ///
    /// Returns contract errors raised while binding. Problems with the
    /// request data end up in model state instead.
    #[instrument(skip_all, fields(action = %action.id()))]
    pub async fn invoke(
        &self,
        action: &Arc<ActionDescriptor>,
        handler: &ActionHandler,
        request: RequestHead,
        value_provider: &dyn ValueProvider,
    ) -> Result<Invocation> {
        let model_state = ModelStateDictionary::with_max_errors(self.binder.options().max_model_errors);
        let mut action_context = ActionContext::new(action.clone(), request).with_model_state(model_state);

        let mut arguments = ActionArguments::new();
        for parameter in action.parameters() {
            let result = self
                .binder
                .bind_model(&mut action_context, value_provider, parameter)
                .await?;
            if let Some(model) = result.into_model() {
                arguments.insert(parameter.name(), model);
            }
        }

        let mut filters: Vec<Arc<dyn ActionFilter>> = action.filters().to_vec();
        filters.sort_by_key(|filter| filter.order());

        let mut completed = 0;
        let mut short_circuit = None;
        for filter in &filters {
            let mut executing = ActionExecutingContext::new(&mut action_context, &arguments);
            filter.on_action_executing(&mut executing);
            if let Some(result) = executing.result {
                debug!(
                    filter = filter.filter_name(),
                    status = %result.status(),
                    "Filter short-circuited action"
                );
                short_circuit = Some(result);
                break;
            }
            completed += 1;
        }

        let short_circuited = short_circuit.is_some();
        let mut result = match short_circuit {
            Some(result) => result,
            None => handler(arguments).await,
        };

        for filter in filters[..completed].iter().rev() {
            let mut executed = ActionExecutedContext {
                action_context: &mut action_context,
                result,
                canceled: short_circuited,
            };
            filter.on_action_executed(&mut executed);
            result = executed.result;
        }

        debug!(
            status = %result.status(),
            short_circuited,
            model_state_valid = action_context.model_state.is_valid(),
            "Action invoked"
        );

        Ok(Invocation {
            result,
            action_context,
            short_circuited,
        })
    }
}
