//! Binding and validating one action parameter.

use super::binder::{ModelBinder, ModelBinderFactory, ModelBinderFactoryContext};
use super::context::{ActionContext, ModelBindingContext, ModelBindingResult};
use super::descriptor::{ActionDescriptor, ParameterDescriptor};
use super::value_provider::ValueProvider;
use crate::config::BindingOptions;
use crate::error::{BindingError, ErrorCode, Result};
use crate::metadata::{ModelMetadata, ModelMetadataProvider};
use crate::model::Model;
use crate::telemetry::{BindOutcome, BindingMetrics};
use crate::validation::{
    BindingScope, ModelError, ModelErrorKind, ModelValidatorProvider, ObjectModelValidator,
    ValidationStateDictionary,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Binds action parameters from request values and validates the result.
///
/// One instance serves every request. Binders are cached per parameter by
/// the factory and validator lists are cached per metadata node, so the
/// per-request cost is the bind itself plus one validation traversal.
pub struct ParameterBinder {
    metadata_provider: Arc<dyn ModelMetadataProvider>,
    binder_factory: Arc<ModelBinderFactory>,
    validator: ObjectModelValidator,
    options: BindingOptions,
}

impl ParameterBinder {
    pub fn new(
        metadata_provider: Arc<dyn ModelMetadataProvider>,
        binder_factory: Arc<ModelBinderFactory>,
        validator_providers: Vec<Arc<dyn ModelValidatorProvider>>,
    ) -> Self {
        Self {
            validator: ObjectModelValidator::new(metadata_provider.clone(), validator_providers),
            metadata_provider,
            binder_factory,
            options: BindingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BindingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    pub fn metadata_provider(&self) -> &Arc<dyn ModelMetadataProvider> {
        &self.metadata_provider
    }

    pub fn binder_factory(&self) -> &Arc<ModelBinderFactory> {
        &self.binder_factory
    }

    pub fn validator(&self) -> &ObjectModelValidator {
        &self.validator
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Entry Points
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind `parameter` with no initial value.
    pub async fn bind_model(
        &self,
        action_context: &mut ActionContext,
        value_provider: &dyn ValueProvider,
        parameter: &ParameterDescriptor,
    ) -> Result<ModelBindingResult> {
        self.bind_model_with_value(action_context, value_provider, parameter, None)
            .await
    }

    /// Bind `parameter`, seeding the binding context with `value`.
    ///
    /// Metadata comes from the provider's parameter description when it has
    /// one, otherwise from the parameter's declared type. The binder is
    /// created through the factory and cached for this parameter.
    pub async fn bind_model_with_value(
        &self,
        action_context: &mut ActionContext,
        value_provider: &dyn ValueProvider,
        parameter: &ParameterDescriptor,
        value: Option<Model>,
    ) -> Result<ModelBindingResult> {
        ensure_named(parameter)?;

        let metadata = self.parameter_metadata(&action_context.action, parameter)?;
        let binder = self.binder_factory.create_binder(ModelBinderFactoryContext {
            metadata: metadata.clone(),
            binding_info: parameter.binding_info().cloned(),
            cache_token: Some(parameter.token()),
        })?;

        self.bind_model_with(
            action_context,
            binder.as_ref(),
            value_provider,
            parameter,
            &metadata,
            value,
        )
        .await
    }

    /// Bind `parameter` with an explicit binder and metadata.
    ///
    /// Returns `Failed` without invoking the binder when the parameter's
    /// request predicate rejects the request. Binder errors about the request
    /// data are recorded in model state and yield `Failed`; contract errors
    /// propagate.
    #[instrument(
        skip_all,
        fields(action = %action_context.action.id(), parameter = %parameter.name())
    )]
    pub async fn bind_model_with(
        &self,
        action_context: &mut ActionContext,
        binder: &dyn ModelBinder,
        value_provider: &dyn ValueProvider,
        parameter: &ParameterDescriptor,
        metadata: &Arc<ModelMetadata>,
        value: Option<Model>,
    ) -> Result<ModelBindingResult> {
        ensure_named(parameter)?;
        if metadata.model_type() != parameter.parameter_type() {
            return Err(BindingError::argument(
                "metadata",
                format!(
                    "Metadata describes '{}' but parameter '{}' is declared as '{}'",
                    metadata.model_type(),
                    parameter.name(),
                    parameter.parameter_type()
                ),
            ));
        }

        let timer = BindingMetrics::start(action_context.action.id(), parameter.name());
        let binding_info = parameter.binding_info();

        if let Some(predicate) = binding_info.and_then(|info| info.request_predicate()) {
            if !predicate(&*action_context) {
                debug!("Request predicate rejected binding");
                timer.finish(BindOutcome::Skipped);
                return Ok(ModelBindingResult::Failed);
            }
        }

        let model_name = match binding_info
            .and_then(|info| info.binder_model_name())
            .or(metadata.binder_model_name())
        {
            Some(name) => name.to_string(),
            None if value_provider.contains_prefix(parameter.name()) => parameter.name().to_string(),
            None => String::new(),
        };
        let binding_source = binding_info
            .and_then(|info| info.binding_source())
            .or(metadata.binding_source())
            .cloned();

        let mut validation_state = ValidationStateDictionary::new();
        let (outcome, result) = {
            let mut ctx = ModelBindingContext::top_level(
                action_context,
                &mut validation_state,
                value_provider,
                self.metadata_provider.as_ref(),
                metadata.clone(),
                binding_source,
                parameter.name(),
                model_name.as_str(),
                value,
            );
            let outcome = binder.bind_model(&mut ctx).await;
            (outcome, ctx.into_result())
        };

        let result = match outcome {
            Ok(()) => result,
            Err(err) => match self.recover(action_context, binder, &model_name, err) {
                Ok(()) => ModelBindingResult::Failed,
                Err(err) => {
                    timer.finish(BindOutcome::Error);
                    return Err(err);
                }
            },
        };

        debug!(
            model_name = %model_name,
            is_model_set = result.is_model_set(),
            binder = binder.binder_name(),
            "Parameter bound"
        );

        let scope = BindingScope::new(&model_name)
            .with_field_name(parameter.name())
            .with_validation_state(&validation_state);
        let model = result.model().cloned().unwrap_or_default();
        self.validator.validate_bound_model(
            action_context,
            metadata,
            &scope,
            result.is_model_set(),
            &model,
        );

        timer.finish(if result.is_model_set() {
            BindOutcome::Bound
        } else {
            BindOutcome::Unbound
        });
        Ok(result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn parameter_metadata(
        &self,
        action: &ActionDescriptor,
        parameter: &ParameterDescriptor,
    ) -> Result<Arc<ModelMetadata>> {
        match self.metadata_provider.as_extended() {
            Some(extended) => extended.metadata_for_parameter(action, parameter),
            None => self
                .metadata_provider
                .metadata_for_type(parameter.parameter_type()),
        }
    }

    /// Turn a binder error about the request data into a model-state error.
    /// Anything else is returned.
    fn recover(
        &self,
        action_context: &mut ActionContext,
        binder: &dyn ModelBinder,
        model_name: &str,
        err: BindingError,
    ) -> Result<()> {
        let kind = match err.code() {
            ErrorCode::InputFormat => {
                let as_bad_request = binder
                    .exception_policy()
                    .map(|policy| policy.send_bad_request_for_exceptions_during_deserialization())
                    .unwrap_or(self.options.input_format_errors_as_bad_request);
                if !as_bad_request {
                    return Err(err);
                }
                debug!(model_name = %model_name, error = %err, "Input format error recorded in model state");
                ModelErrorKind::InputFormat
            }
            ErrorCode::BindingFailed | ErrorCode::BindingCancelled => {
                warn!(model_name = %model_name, error = %err, "Binder failed");
                ModelErrorKind::BindingFailed
            }
            _ => return Err(err),
        };

        action_context
            .model_state
            .try_add_model_error(model_name, ModelError::with_message(kind, err.user_message()));
        Ok(())
    }
}

fn ensure_named(parameter: &ParameterDescriptor) -> Result<()> {
    if parameter.name().is_empty() {
        return Err(BindingError::argument(
            "parameter",
            "Parameter name must not be empty",
        ));
    }
    Ok(())
}

impl fmt::Debug for ParameterBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinder")
            .field("binder_factory", &self.binder_factory)
            .field("validator", &self.validator)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
