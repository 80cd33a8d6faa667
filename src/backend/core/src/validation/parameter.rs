//! Validation of values that were produced without going through a binder.

use super::dispatch::{BindingScope, ObjectModelValidator};
use super::validator::ModelValidatorProvider;
use crate::binding::{ActionContext, ParameterDescriptor};
use crate::metadata::{ModelMetadata, ModelMetadataProvider};
use crate::model::Model;
use std::sync::Arc;
use tracing::trace;

/// Validates a parameter value that was supplied rather than bound.
pub trait ParameterValidator: Send + Sync {
    fn validate(
        &self,
        action_context: &mut ActionContext,
        parameter: &ParameterDescriptor,
        metadata: &Arc<ModelMetadata>,
        is_value_set: bool,
        value: &Model,
        scope: &BindingScope<'_>,
    );
}

/// Runs the standard post-binding validation for a parameter value.
///
/// Only active when the metadata provider can describe parameters; with a
/// type-only provider every call is a no-op.
#[derive(Debug)]
pub struct DefaultParameterValidator {
    validator: ObjectModelValidator,
    enabled: bool,
}

impl DefaultParameterValidator {
    pub fn new(
        metadata_provider: Arc<dyn ModelMetadataProvider>,
        validator_providers: Vec<Arc<dyn ModelValidatorProvider>>,
    ) -> Self {
        let enabled = metadata_provider.as_extended().is_some();
        Self {
            validator: ObjectModelValidator::new(metadata_provider, validator_providers),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl ParameterValidator for DefaultParameterValidator {
    fn validate(
        &self,
        action_context: &mut ActionContext,
        parameter: &ParameterDescriptor,
        metadata: &Arc<ModelMetadata>,
        is_value_set: bool,
        value: &Model,
        scope: &BindingScope<'_>,
    ) {
        if !self.enabled {
            trace!(parameter = %parameter.name(), "Parameter validation unavailable");
            return;
        }
        self.validator
            .validate_bound_model(action_context, metadata, scope, is_value_set, value);
    }
}
