//! Model metadata: the static description of a type, property or parameter
//! that drives binding and validation.
//!
//! Metadata is immutable and shared (`Arc<ModelMetadata>`). Every instance has
//! a [`MetadataIdentity`], which is the key used by the metadata cache, the
//! binder cache, the validator cache and the visitor's cycle guard.
//!
//! Two independent required-ness flags exist:
//!
//! - [`ModelMetadata::is_required`]: structural required-ness (non-nullable
//!   types, explicit `Required` annotations). Validation runs even when no
//!   value was bound.
//! - [`ModelMetadata::is_binding_required`]: the value must be present in the
//!   request. A missing value is itself an error.

pub mod messages;
pub mod provider;

pub use messages::ModelBindingMessageProvider;
pub use provider::{
    DefaultModelMetadataProvider, ExtendedModelMetadataProvider, MetadataRegistryBuilder,
    ModelMetadataProvider, PropertyDescriptor, TypeDescriptor,
};

use crate::model::ModelType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// Identity
// ═══════════════════════════════════════════════════════════════════════════════

/// What a piece of metadata describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Type,
    Property { container: ModelType, name: String },
    Parameter { action: String, name: String },
}

/// Identity of a metadata node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataIdentity {
    model_type: ModelType,
    kind: MetadataKind,
}

impl MetadataIdentity {
    pub fn for_type(model_type: ModelType) -> Self {
        Self {
            model_type,
            kind: MetadataKind::Type,
        }
    }

    pub fn for_property(container: ModelType, name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            model_type,
            kind: MetadataKind::Property {
                container,
                name: name.into(),
            },
        }
    }

    pub fn for_parameter(action: impl Into<String>, name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            model_type,
            kind: MetadataKind::Parameter {
                action: action.into(),
                name: name.into(),
            },
        }
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    pub fn kind(&self) -> &MetadataKind {
        &self.kind
    }

    /// Member or parameter name, if this is not a bare type.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            MetadataKind::Type => None,
            MetadataKind::Property { name, .. } | MetadataKind::Parameter { name, .. } => Some(name),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Shape
// ═══════════════════════════════════════════════════════════════════════════════

/// Scalar flavours understood by the simple-type binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Integer,
    Float,
    Text,
}

/// Structural shape of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelKind {
    Simple(ScalarKind),
    Collection { element_type: ModelType },
    Dictionary { value_type: ModelType },
    Complex,
}

/// Where a value is expected to come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    Path,
    Query,
    Form,
    Header,
    Body,
    Custom(String),
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Form => write!(f, "form"),
            Self::Header => write!(f, "header"),
            Self::Body => write!(f, "body"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Declarative validation rules attached to a type, property or parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationAnnotation {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Range { min: f64, max: f64 },
    Pattern(String),
    Email,
    Url,
    OneOf(Vec<String>),
    MinItems(usize),
    MaxItems(usize),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Model Metadata
// ═══════════════════════════════════════════════════════════════════════════════

/// Structural facts about one type, property or parameter.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    identity: MetadataIdentity,
    kind: ModelKind,
    is_required: bool,
    is_binding_required: bool,
    is_nullable: bool,
    display_name: Option<String>,
    binder_model_name: Option<String>,
    binding_source: Option<BindingSource>,
    validate_children: bool,
    annotations: Vec<ValidationAnnotation>,
    messages: Arc<ModelBindingMessageProvider>,
}

impl ModelMetadata {
    /// Start building metadata. Nullable by default, not required.
    pub fn builder(identity: MetadataIdentity, kind: ModelKind) -> ModelMetadataBuilder {
        ModelMetadataBuilder {
            metadata: ModelMetadata {
                identity,
                kind,
                is_required: false,
                is_binding_required: false,
                is_nullable: true,
                display_name: None,
                binder_model_name: None,
                binding_source: None,
                validate_children: true,
                annotations: Vec::new(),
                messages: Arc::new(ModelBindingMessageProvider::default()),
            },
        }
    }

    pub fn identity(&self) -> &MetadataIdentity {
        &self.identity
    }

    pub fn model_type(&self) -> &ModelType {
        &self.identity.model_type
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    /// Property name for property metadata.
    pub fn property_name(&self) -> Option<&str> {
        match &self.identity.kind {
            MetadataKind::Property { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn container_type(&self) -> Option<&ModelType> {
        match &self.identity.kind {
            MetadataKind::Property { container, .. } => Some(container),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn is_binding_required(&self) -> bool {
        self.is_binding_required
    }

    /// Whether `null` is a legal value for the declared type.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Explicit name used to look values up, overriding the member name.
    pub fn binder_model_name(&self) -> Option<&str> {
        self.binder_model_name.as_deref()
    }

    pub fn binding_source(&self) -> Option<&BindingSource> {
        self.binding_source.as_ref()
    }

    pub fn validate_children(&self) -> bool {
        self.validate_children
    }

    pub fn annotations(&self) -> &[ValidationAnnotation] {
        &self.annotations
    }

    pub fn messages(&self) -> &ModelBindingMessageProvider {
        &self.messages
    }

    pub fn is_complex_type(&self) -> bool {
        matches!(self.kind, ModelKind::Complex)
    }

    pub fn is_collection_type(&self) -> bool {
        matches!(self.kind, ModelKind::Collection { .. } | ModelKind::Dictionary { .. })
    }

    /// Name used in messages: display name, then member name, then type name.
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .or_else(|| self.identity.name())
            .unwrap_or_else(|| self.identity.model_type.name())
    }
}

/// Builder for [`ModelMetadata`].
#[derive(Debug, Clone)]
pub struct ModelMetadataBuilder {
    metadata: ModelMetadata,
}

impl ModelMetadataBuilder {
    pub fn required(mut self, value: bool) -> Self {
        self.metadata.is_required = value;
        self
    }

    pub fn binding_required(mut self, value: bool) -> Self {
        self.metadata.is_binding_required = value;
        self
    }

    pub fn nullable(mut self, value: bool) -> Self {
        self.metadata.is_nullable = value;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.display_name = Some(name.into());
        self
    }

    pub fn binder_model_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.binder_model_name = Some(name.into());
        self
    }

    pub fn binding_source(mut self, source: BindingSource) -> Self {
        self.metadata.binding_source = Some(source);
        self
    }

    pub fn validate_children(mut self, value: bool) -> Self {
        self.metadata.validate_children = value;
        self
    }

    pub fn annotation(mut self, annotation: ValidationAnnotation) -> Self {
        self.metadata.annotations.push(annotation);
        self
    }

    pub fn annotations(mut self, annotations: impl IntoIterator<Item = ValidationAnnotation>) -> Self {
        self.metadata.annotations.extend(annotations);
        self
    }

    pub fn messages(mut self, messages: Arc<ModelBindingMessageProvider>) -> Self {
        self.metadata.messages = messages;
        self
    }

    pub fn build(self) -> Arc<ModelMetadata> {
        Arc::new(self.metadata)
    }
}
