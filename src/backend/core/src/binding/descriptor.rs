//! Action and parameter descriptors.
//!
//! Descriptors are created once per action at startup and shared across
//! requests.

use super::context::ActionContext;
use crate::filters::ActionFilter;
use crate::metadata::{BindingSource, ValidationAnnotation};
use crate::model::ModelType;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decides whether a parameter should be bound for the current request.
pub type RequestPredicate = Arc<dyn Fn(&ActionContext) -> bool + Send + Sync>;

static NEXT_PARAMETER_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a parameter descriptor. Clones share the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterToken(u64);

impl ParameterToken {
    fn next() -> Self {
        Self(NEXT_PARAMETER_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Binding Info
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-parameter binding overrides.
#[derive(Clone, Default)]
pub struct BindingInfo {
    binder_model_name: Option<String>,
    binding_source: Option<BindingSource>,
    request_predicate: Option<RequestPredicate>,
}

impl BindingInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look values up under `name` instead of the parameter name.
    pub fn with_binder_model_name(mut self, name: impl Into<String>) -> Self {
        self.binder_model_name = Some(name.into());
        self
    }

    pub fn with_binding_source(mut self, source: BindingSource) -> Self {
        self.binding_source = Some(source);
        self
    }

    /// Only bind when `predicate` holds for the request.
    pub fn with_request_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ActionContext) -> bool + Send + Sync + 'static,
    {
        self.request_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn binder_model_name(&self) -> Option<&str> {
        self.binder_model_name.as_deref()
    }

    pub fn binding_source(&self) -> Option<&BindingSource> {
        self.binding_source.as_ref()
    }

    pub fn request_predicate(&self) -> Option<&RequestPredicate> {
        self.request_predicate.as_ref()
    }
}

impl fmt::Debug for BindingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingInfo")
            .field("binder_model_name", &self.binder_model_name)
            .field("binding_source", &self.binding_source)
            .field("has_request_predicate", &self.request_predicate.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Parameter Descriptor
// ═══════════════════════════════════════════════════════════════════════════════

/// One declared action parameter.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    name: String,
    parameter_type: ModelType,
    binding_info: Option<BindingInfo>,
    binding_required: bool,
    annotations: Vec<ValidationAnnotation>,
    token: ParameterToken,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, parameter_type: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            parameter_type: ModelType::new(parameter_type),
            binding_info: None,
            binding_required: false,
            annotations: Vec::new(),
            token: ParameterToken::next(),
        }
    }

    pub fn with_binding_info(mut self, binding_info: BindingInfo) -> Self {
        self.binding_info = Some(binding_info);
        self
    }

    /// The request must supply a value for this parameter.
    pub fn bind_required(mut self) -> Self {
        self.binding_required = true;
        self
    }

    pub fn annotate(mut self, annotation: ValidationAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_type(&self) -> &ModelType {
        &self.parameter_type
    }

    pub fn binding_info(&self) -> Option<&BindingInfo> {
        self.binding_info.as_ref()
    }

    pub fn is_binding_required(&self) -> bool {
        self.binding_required
    }

    pub fn annotations(&self) -> &[ValidationAnnotation] {
        &self.annotations
    }

    /// Token identifying this parameter in the binder cache.
    pub fn token(&self) -> ParameterToken {
        self.token
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Action Descriptor
// ═══════════════════════════════════════════════════════════════════════════════

/// A request handler's static description.
#[derive(Clone)]
pub struct ActionDescriptor {
    id: String,
    display_name: Option<String>,
    parameters: Vec<ParameterDescriptor>,
    filters: Vec<Arc<dyn ActionFilter>>,
    is_api_action: bool,
}

impl ActionDescriptor {
    pub fn new(id: impl Into<String>, parameters: Vec<ParameterDescriptor>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            parameters,
            filters: Vec::new(),
            is_api_action: false,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Mark this action as an API endpoint, opting it into API behaviors.
    pub fn api(mut self) -> Self {
        self.is_api_action = true;
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn ActionFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn add_filter(&mut self, filter: Arc<dyn ActionFilter>) {
        self.filters.push(filter);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn filters(&self) -> &[Arc<dyn ActionFilter>] {
        &self.filters
    }

    pub fn is_api_action(&self) -> bool {
        self.is_api_action
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("parameters", &self.parameters)
            .field("filters", &self.filters.len())
            .field("is_api_action", &self.is_api_action)
            .finish()
    }
}
