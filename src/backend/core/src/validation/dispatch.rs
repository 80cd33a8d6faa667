//! The post-binding validation step shared by the parameter binder and the
//! parameter validator.

use super::cache::ValidatorCache;
use super::model_state::{ModelError, ModelErrorKind};
use super::state::ValidationStateDictionary;
use super::validator::{CompositeModelValidatorProvider, ModelValidatorProvider};
use super::visitor::ValidationVisitor;
use crate::binding::ActionContext;
use crate::metadata::{ModelMetadata, ModelMetadataProvider};
use crate::model::Model;
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Names under which a bound value is validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindingScope<'a> {
    /// Model-state key of the value.
    pub model_name: &'a str,
    /// Name used in the missing-value message.
    pub field_name: Option<&'a str>,
    /// Overrides recorded by the binder, if binding took place.
    pub validation_state: Option<&'a ValidationStateDictionary>,
}

impl<'a> BindingScope<'a> {
    pub fn new(model_name: &'a str) -> Self {
        Self {
            model_name,
            ..Self::default()
        }
    }

    pub fn with_field_name(mut self, field_name: &'a str) -> Self {
        self.field_name = Some(field_name);
        self
    }

    pub fn with_validation_state(mut self, validation_state: &'a ValidationStateDictionary) -> Self {
        self.validation_state = Some(validation_state);
        self
    }
}

/// Validates whole model graphs with a fixed set of validator providers and
/// a private validator cache.
pub struct ObjectModelValidator {
    metadata_provider: Arc<dyn ModelMetadataProvider>,
    validator_provider: CompositeModelValidatorProvider,
    cache: ValidatorCache,
}

impl ObjectModelValidator {
    pub fn new(
        metadata_provider: Arc<dyn ModelMetadataProvider>,
        validator_providers: Vec<Arc<dyn ModelValidatorProvider>>,
    ) -> Self {
        Self {
            metadata_provider,
            validator_provider: CompositeModelValidatorProvider::new(validator_providers),
            cache: ValidatorCache::new(),
        }
    }

    pub fn metadata_provider(&self) -> &Arc<dyn ModelMetadataProvider> {
        &self.metadata_provider
    }

    pub fn validator_provider(&self) -> &CompositeModelValidatorProvider {
        &self.validator_provider
    }

    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }

    /// A visitor over this validator's providers and cache.
    pub fn visitor<'a>(&'a self, action_context: &'a mut ActionContext) -> ValidationVisitor<'a> {
        ValidationVisitor::new(
            action_context,
            &self.validator_provider,
            &self.cache,
            self.metadata_provider.as_ref(),
        )
    }

    /// Validate a bound value and, when it was never set, check whether it
    /// had to be.
    ///
    /// The graph is visited when the value was set or the metadata is
    /// required; a null root is accepted unless the metadata is required. If
    /// that visit fails nothing else is recorded. Otherwise an unset,
    /// binding-required value gets exactly one missing-value error under the
    /// scope's model name.
    ///
    /// Returns `true` when no error was added.
    pub fn validate_bound_model(
        &self,
        action_context: &mut ActionContext,
        metadata: &Arc<ModelMetadata>,
        scope: &BindingScope<'_>,
        is_value_set: bool,
        model: &Model,
    ) -> bool {
        if is_value_set || metadata.is_required() {
            let mut visitor = self.visitor(action_context);
            if let Some(validation_state) = scope.validation_state {
                visitor = visitor.with_validation_state(validation_state);
            }
            let is_valid = visitor.validate(metadata, scope.model_name, model, !metadata.is_required());
            if !is_valid {
                debug!(model_name = %scope.model_name, "Bound model failed validation");
                counter!("apex_binding_validation_failures_total").increment(1);
                return false;
            }
        }

        if !is_value_set && metadata.is_binding_required() {
            let field_name = scope
                .field_name
                .or(metadata.binder_model_name())
                .unwrap_or(scope.model_name);
            let message = metadata.messages().missing_bind_required_value(field_name);
            debug!(
                model_name = %scope.model_name,
                field = %field_name,
                "Binding-required value was not provided"
            );
            counter!("apex_binding_missing_required_total").increment(1);
            action_context.model_state.try_add_model_error(
                scope.model_name,
                ModelError::with_message(ModelErrorKind::MissingBindRequiredValue, message),
            );
            return false;
        }

        true
    }
}

impl fmt::Debug for ObjectModelValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectModelValidator")
            .field("validator_provider", &self.validator_provider)
            .field("cache", &self.cache)
            .finish()
    }
}
