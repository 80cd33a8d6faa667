//! Request-scoped binding state.

use super::descriptor::ActionDescriptor;
use super::value_provider::ValueProvider;
use crate::metadata::{BindingSource, ModelMetadata, ModelMetadataProvider};
use crate::model::Model;
use crate::validation::{ModelStateDictionary, ValidationStateDictionary};
use axum::http::{HeaderMap, Method, Uri};
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// Action Context
// ═══════════════════════════════════════════════════════════════════════════════

/// The parts of the HTTP request visible to binders, predicates and validators.
#[derive(Debug, Clone, Default)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Everything known about the action being executed for one request.
///
/// Owned by a single request. Fields are public so that binding and
/// validation can borrow the model state mutably while reading the rest.
#[derive(Debug)]
pub struct ActionContext {
    pub action: Arc<ActionDescriptor>,
    pub request: RequestHead,
    pub model_state: ModelStateDictionary,
    pub trace_id: String,
}

impl ActionContext {
    pub fn new(action: Arc<ActionDescriptor>, request: RequestHead) -> Self {
        Self {
            action,
            request,
            model_state: ModelStateDictionary::new(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_model_state(mut self, model_state: ModelStateDictionary) -> Self {
        self.model_state = model_state;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Binding Result
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of a bind attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModelBindingResult {
    /// No value could be determined.
    #[default]
    Failed,
    /// A value was bound. The value may be [`Model::Null`].
    Success(Model),
}

impl ModelBindingResult {
    pub fn success(model: impl Into<Model>) -> Self {
        Self::Success(model.into())
    }

    pub fn is_model_set(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn model(&self) -> Option<&Model> {
        match self {
            Self::Success(model) => Some(model),
            Self::Failed => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            Self::Success(model) => Some(model),
            Self::Failed => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Model Binding Context
// ═══════════════════════════════════════════════════════════════════════════════

/// Mutable state for binding one model. Binders set [`result`](Self::set_result).
///
/// Nested contexts created with [`nested`](Self::nested) reborrow the parent's
/// request state, so errors and validation entries recorded by child binders
/// land in the same collections.
pub struct ModelBindingContext<'a> {
    action_context: &'a mut ActionContext,
    validation_state: &'a mut ValidationStateDictionary,
    value_provider: &'a dyn ValueProvider,
    metadata_provider: &'a dyn ModelMetadataProvider,
    metadata: Arc<ModelMetadata>,
    binding_source: Option<BindingSource>,
    field_name: String,
    model_name: String,
    is_top_level_object: bool,
    model: Option<Model>,
    result: ModelBindingResult,
}

impl<'a> ModelBindingContext<'a> {
    /// Create the context for a top-level object (an action parameter).
    #[allow(clippy::too_many_arguments)]
    pub fn top_level(
        action_context: &'a mut ActionContext,
        validation_state: &'a mut ValidationStateDictionary,
        value_provider: &'a dyn ValueProvider,
        metadata_provider: &'a dyn ModelMetadataProvider,
        metadata: Arc<ModelMetadata>,
        binding_source: Option<BindingSource>,
        field_name: impl Into<String>,
        model_name: impl Into<String>,
        model: Option<Model>,
    ) -> Self {
        Self {
            action_context,
            validation_state,
            value_provider,
            metadata_provider,
            metadata,
            binding_source,
            field_name: field_name.into(),
            model_name: model_name.into(),
            is_top_level_object: true,
            model,
            result: ModelBindingResult::Failed,
        }
    }

    /// Create a child scope for a member or element.
    pub fn nested(
        &mut self,
        metadata: Arc<ModelMetadata>,
        field_name: impl Into<String>,
        model_name: impl Into<String>,
        model: Option<Model>,
    ) -> ModelBindingContext<'_> {
        let value_provider = self.value_provider;
        self.nested_with_value_provider(value_provider, metadata, field_name, model_name, model)
    }

    /// Create a child scope reading from a different value provider.
    pub fn nested_with_value_provider<'b>(
        &'b mut self,
        value_provider: &'b dyn ValueProvider,
        metadata: Arc<ModelMetadata>,
        field_name: impl Into<String>,
        model_name: impl Into<String>,
        model: Option<Model>,
    ) -> ModelBindingContext<'b> {
        let binding_source = metadata
            .binding_source()
            .cloned()
            .or_else(|| self.binding_source.clone());
        ModelBindingContext {
            action_context: &mut *self.action_context,
            validation_state: &mut *self.validation_state,
            value_provider,
            metadata_provider: self.metadata_provider,
            metadata,
            binding_source,
            field_name: field_name.into(),
            model_name: model_name.into(),
            is_top_level_object: false,
            model,
            result: ModelBindingResult::Failed,
        }
    }

    pub fn action_context(&self) -> &ActionContext {
        &*self.action_context
    }

    pub fn model_state(&mut self) -> &mut ModelStateDictionary {
        &mut self.action_context.model_state
    }

    pub fn validation_state(&mut self) -> &mut ValidationStateDictionary {
        &mut *self.validation_state
    }

    pub fn value_provider(&self) -> &'a dyn ValueProvider {
        self.value_provider
    }

    pub fn metadata_provider(&self) -> &'a dyn ModelMetadataProvider {
        self.metadata_provider
    }

    pub fn metadata(&self) -> &Arc<ModelMetadata> {
        &self.metadata
    }

    /// Source hint from binding info or metadata.
    pub fn binding_source(&self) -> Option<&BindingSource> {
        self.binding_source.as_ref()
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_top_level_object(&self) -> bool {
        self.is_top_level_object
    }

    /// Value present before binding started.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn result(&self) -> &ModelBindingResult {
        &self.result
    }

    pub fn set_result(&mut self, result: ModelBindingResult) {
        self.result = result;
    }

    pub fn into_result(self) -> ModelBindingResult {
        self.result
    }
}

impl std::fmt::Debug for ModelBindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBindingContext")
            .field("model_type", self.metadata.model_type())
            .field("field_name", &self.field_name)
            .field("model_name", &self.model_name)
            .field("is_top_level_object", &self.is_top_level_object)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DictionaryValueProvider;
    use crate::metadata::DefaultModelMetadataProvider;

    #[test]
    fn test_binding_result() {
        assert!(!ModelBindingResult::Failed.is_model_set());
        let success = ModelBindingResult::success(Model::Null);
        assert!(success.is_model_set());
        assert_eq!(success.model(), Some(&Model::Null));
        assert_eq!(ModelBindingResult::default(), ModelBindingResult::Failed);
    }

    #[test]
    fn test_nested_context_shares_model_state() {
        let provider = DefaultModelMetadataProvider::builder().build().unwrap();
        let metadata = provider
            .metadata_for_type(&crate::model::ModelType::new("string"))
            .unwrap();
        let action = Arc::new(ActionDescriptor::new("test", vec![]));
        let mut action_context = ActionContext::new(action, RequestHead::default());
        let mut validation_state = ValidationStateDictionary::new();
        let values = DictionaryValueProvider::new();

        let mut ctx = ModelBindingContext::top_level(
            &mut action_context,
            &mut validation_state,
            &values,
            &provider,
            metadata.clone(),
            None,
            "user",
            "user",
            None,
        );
        assert!(ctx.is_top_level_object());
        {
            let mut child = ctx.nested(metadata, "name", "user.name", None);
            assert!(!child.is_top_level_object());
            child.model_state().add_model_error(
                "user.name",
                crate::validation::ModelErrorKind::Required,
                "required",
            );
            child.set_result(ModelBindingResult::success("x"));
            assert!(child.into_result().is_model_set());
        }
        assert_eq!(ctx.model_state().error_count(), 1);
        assert!(!ctx.result().is_model_set());
    }
}
