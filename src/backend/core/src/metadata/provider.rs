//! Metadata providers.
//!
//! [`DefaultModelMetadataProvider`] is backed by a registry of
//! [`TypeDescriptor`]s built once at startup. Type and property metadata are
//! computed eagerly when the registry is built; parameter metadata is computed
//! on first use and cached.

use super::{
    BindingSource, MetadataIdentity, ModelBindingMessageProvider, ModelKind, ModelMetadata,
    ScalarKind, ValidationAnnotation,
};
use crate::binding::{ActionDescriptor, ParameterDescriptor};
use crate::error::{BindingError, Result};
use crate::model::ModelType;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Provider Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Supplies metadata for model types and their members.
pub trait ModelMetadataProvider: Send + Sync {
    /// Metadata describing a type.
    fn metadata_for_type(&self, model_type: &ModelType) -> Result<Arc<ModelMetadata>>;

    /// Metadata for every member of a composite type, in declaration order.
    /// Non-composite types have no members.
    fn metadata_for_properties(&self, model_type: &ModelType) -> Result<Vec<Arc<ModelMetadata>>>;

    /// Access to parameter-level metadata, when the provider supports it.
    fn as_extended(&self) -> Option<&dyn ExtendedModelMetadataProvider> {
        None
    }
}

/// A provider that can also describe action parameters.
pub trait ExtendedModelMetadataProvider: ModelMetadataProvider {
    fn metadata_for_parameter(
        &self,
        action: &ActionDescriptor,
        parameter: &ParameterDescriptor,
    ) -> Result<Arc<ModelMetadata>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Descriptors
// ═══════════════════════════════════════════════════════════════════════════════

/// Registration for one model type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    model_type: ModelType,
    kind: ModelKind,
    nullable: bool,
    display_name: Option<String>,
    annotations: Vec<ValidationAnnotation>,
    properties: Vec<PropertyDescriptor>,
    validate_children: bool,
}

impl TypeDescriptor {
    fn new(name: impl AsRef<str>, kind: ModelKind, nullable: bool) -> Self {
        Self {
            model_type: ModelType::new(name),
            kind,
            nullable,
            display_name: None,
            annotations: Vec::new(),
            properties: Vec::new(),
            validate_children: true,
        }
    }

    /// A composite type with named members. Nullable.
    pub fn complex(name: impl AsRef<str>) -> Self {
        Self::new(name, ModelKind::Complex, true)
    }

    /// An ordered collection of `element`. Nullable.
    pub fn collection(name: impl AsRef<str>, element: impl AsRef<str>) -> Self {
        Self::new(
            name,
            ModelKind::Collection {
                element_type: ModelType::new(element),
            },
            true,
        )
    }

    /// A keyed collection with values of type `value`. Nullable.
    pub fn dictionary(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        Self::new(
            name,
            ModelKind::Dictionary {
                value_type: ModelType::new(value),
            },
            true,
        )
    }

    pub fn scalar(name: impl AsRef<str>, kind: ScalarKind, nullable: bool) -> Self {
        Self::new(name, ModelKind::Simple(kind), nullable)
    }

    /// Values of this type can never be null.
    pub fn non_nullable(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn annotate(mut self, annotation: ValidationAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Do not descend into members or items of this type during validation.
    pub fn skip_child_validation(mut self) -> Self {
        self.validate_children = false;
        self
    }

    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }
}

/// Registration for one member of a composite type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    model_type: ModelType,
    binding_required: bool,
    binder_model_name: Option<String>,
    display_name: Option<String>,
    binding_source: Option<BindingSource>,
    annotations: Vec<ValidationAnnotation>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, model_type: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            model_type: ModelType::new(model_type),
            binding_required: false,
            binder_model_name: None,
            display_name: None,
            binding_source: None,
            annotations: Vec::new(),
        }
    }

    /// The request must supply a value for this member.
    pub fn bind_required(mut self) -> Self {
        self.binding_required = true;
        self
    }

    pub fn binder_model_name(mut self, name: impl Into<String>) -> Self {
        self.binder_model_name = Some(name.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn binding_source(mut self, source: BindingSource) -> Self {
        self.binding_source = Some(source);
        self
    }

    pub fn annotate(mut self, annotation: ValidationAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Default Provider
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry-backed metadata provider.
#[derive(Debug)]
pub struct DefaultModelMetadataProvider {
    types: HashMap<ModelType, TypeDescriptor>,
    type_metadata: HashMap<ModelType, Arc<ModelMetadata>>,
    property_metadata: HashMap<ModelType, Vec<Arc<ModelMetadata>>>,
    parameter_metadata: DashMap<MetadataIdentity, Arc<ModelMetadata>>,
    messages: Arc<ModelBindingMessageProvider>,
}

impl DefaultModelMetadataProvider {
    pub fn builder() -> MetadataRegistryBuilder {
        MetadataRegistryBuilder::new()
    }

    pub fn messages(&self) -> &Arc<ModelBindingMessageProvider> {
        &self.messages
    }

    fn descriptor(&self, model_type: &ModelType) -> Result<&TypeDescriptor> {
        self.types
            .get(model_type)
            .ok_or_else(|| BindingError::unknown_type(model_type.name()))
    }

    fn build_type_metadata(
        descriptor: &TypeDescriptor,
        messages: &Arc<ModelBindingMessageProvider>,
    ) -> Arc<ModelMetadata> {
        let mut builder = ModelMetadata::builder(
            MetadataIdentity::for_type(descriptor.model_type.clone()),
            descriptor.kind.clone(),
        )
        .required(!descriptor.nullable)
        .nullable(descriptor.nullable)
        .validate_children(descriptor.validate_children)
        .annotations(descriptor.annotations.iter().cloned())
        .messages(messages.clone());
        if let Some(name) = &descriptor.display_name {
            builder = builder.display_name(name.clone());
        }
        builder.build()
    }

    fn build_property_metadata(
        container: &ModelType,
        property: &PropertyDescriptor,
        property_type: &TypeDescriptor,
        messages: &Arc<ModelBindingMessageProvider>,
    ) -> Arc<ModelMetadata> {
        let required = !property_type.nullable
            || property.annotations.contains(&ValidationAnnotation::Required);
        let mut builder = ModelMetadata::builder(
            MetadataIdentity::for_property(
                container.clone(),
                property.name.clone(),
                property.model_type.clone(),
            ),
            property_type.kind.clone(),
        )
        .required(required)
        .binding_required(property.binding_required)
        .nullable(property_type.nullable)
        .validate_children(property_type.validate_children)
        .annotations(property_type.annotations.iter().cloned())
        .annotations(property.annotations.iter().cloned())
        .messages(messages.clone());
        if let Some(name) = &property.display_name {
            builder = builder.display_name(name.clone());
        }
        if let Some(name) = &property.binder_model_name {
            builder = builder.binder_model_name(name.clone());
        }
        if let Some(source) = &property.binding_source {
            builder = builder.binding_source(source.clone());
        }
        builder.build()
    }
}

impl ModelMetadataProvider for DefaultModelMetadataProvider {
    fn metadata_for_type(&self, model_type: &ModelType) -> Result<Arc<ModelMetadata>> {
        self.type_metadata
            .get(model_type)
            .cloned()
            .ok_or_else(|| BindingError::unknown_type(model_type.name()))
    }

    fn metadata_for_properties(&self, model_type: &ModelType) -> Result<Vec<Arc<ModelMetadata>>> {
        if !self.types.contains_key(model_type) {
            return Err(BindingError::unknown_type(model_type.name()));
        }
        Ok(self
            .property_metadata
            .get(model_type)
            .cloned()
            .unwrap_or_default())
    }

    fn as_extended(&self) -> Option<&dyn ExtendedModelMetadataProvider> {
        Some(self)
    }
}

impl ExtendedModelMetadataProvider for DefaultModelMetadataProvider {
    fn metadata_for_parameter(
        &self,
        action: &ActionDescriptor,
        parameter: &ParameterDescriptor,
    ) -> Result<Arc<ModelMetadata>> {
        let identity = MetadataIdentity::for_parameter(
            action.id(),
            parameter.name(),
            parameter.parameter_type().clone(),
        );
        if let Some(cached) = self.parameter_metadata.get(&identity) {
            return Ok(cached.clone());
        }

        let descriptor = self.descriptor(parameter.parameter_type())?;
        let required = !descriptor.nullable
            || parameter.annotations().contains(&ValidationAnnotation::Required);
        let mut builder = ModelMetadata::builder(identity.clone(), descriptor.kind.clone())
            .required(required)
            .binding_required(parameter.is_binding_required())
            .nullable(descriptor.nullable)
            .validate_children(descriptor.validate_children)
            .annotations(descriptor.annotations.iter().cloned())
            .annotations(parameter.annotations().iter().cloned())
            .messages(self.messages.clone());
        if let Some(info) = parameter.binding_info() {
            if let Some(name) = info.binder_model_name() {
                builder = builder.binder_model_name(name);
            }
            if let Some(source) = info.binding_source() {
                builder = builder.binding_source(source.clone());
            }
        }
        let metadata = builder.build();

        debug!(
            action = %action.id(),
            parameter = %parameter.name(),
            model_type = %parameter.parameter_type(),
            "Built parameter metadata"
        );
        self.parameter_metadata.insert(identity, metadata.clone());
        Ok(metadata)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects type registrations and produces a [`DefaultModelMetadataProvider`].
///
/// The scalar types `bool`, `int`, `float` (non-nullable), their nullable
/// forms `bool?`, `int?`, `float?`, and `string` (nullable) are predefined.
#[derive(Debug)]
pub struct MetadataRegistryBuilder {
    types: Vec<TypeDescriptor>,
    messages: ModelBindingMessageProvider,
}

impl MetadataRegistryBuilder {
    fn new() -> Self {
        let types = vec![
            TypeDescriptor::scalar("bool", ScalarKind::Boolean, false),
            TypeDescriptor::scalar("int", ScalarKind::Integer, false),
            TypeDescriptor::scalar("float", ScalarKind::Float, false),
            TypeDescriptor::scalar("bool?", ScalarKind::Boolean, true),
            TypeDescriptor::scalar("int?", ScalarKind::Integer, true),
            TypeDescriptor::scalar("float?", ScalarKind::Float, true),
            TypeDescriptor::scalar("string", ScalarKind::Text, true),
        ];
        Self {
            types,
            messages: ModelBindingMessageProvider::default(),
        }
    }

    /// Register a type. A later registration with the same name replaces an
    /// earlier one.
    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.retain(|t| t.model_type != descriptor.model_type);
        self.types.push(descriptor);
        self
    }

    pub fn messages(mut self, messages: ModelBindingMessageProvider) -> Self {
        self.messages = messages;
        self
    }

    /// Build the provider. Every member, element and value type referenced by a
    /// registration must itself be registered.
    pub fn build(self) -> Result<DefaultModelMetadataProvider> {
        let messages = Arc::new(self.messages);
        let types: HashMap<ModelType, TypeDescriptor> = self
            .types
            .into_iter()
            .map(|t| (t.model_type.clone(), t))
            .collect();

        let mut type_metadata = HashMap::with_capacity(types.len());
        let mut property_metadata = HashMap::new();

        for descriptor in types.values() {
            match &descriptor.kind {
                ModelKind::Collection { element_type: referenced }
                | ModelKind::Dictionary { value_type: referenced } => {
                    if !types.contains_key(referenced) {
                        return Err(unregistered(&descriptor.model_type, referenced));
                    }
                }
                ModelKind::Simple(_) | ModelKind::Complex => {}
            }

            type_metadata.insert(
                descriptor.model_type.clone(),
                DefaultModelMetadataProvider::build_type_metadata(descriptor, &messages),
            );

            let mut members = Vec::with_capacity(descriptor.properties.len());
            for property in &descriptor.properties {
                let property_type = types
                    .get(&property.model_type)
                    .ok_or_else(|| unregistered(&descriptor.model_type, &property.model_type))?;
                members.push(DefaultModelMetadataProvider::build_property_metadata(
                    &descriptor.model_type,
                    property,
                    property_type,
                    &messages,
                ));
            }
            if !members.is_empty() {
                property_metadata.insert(descriptor.model_type.clone(), members);
            }
        }

        debug!(types = types.len(), "Metadata registry built");

        Ok(DefaultModelMetadataProvider {
            types,
            type_metadata,
            property_metadata,
            parameter_metadata: DashMap::new(),
            messages,
        })
    }
}

fn unregistered(owner: &ModelType, referenced: &ModelType) -> BindingError {
    BindingError::configuration(format!(
        "Type '{}' references unregistered type '{}'",
        owner, referenced
    ))
    .with_context("model_type", owner.name())
    .with_context("referenced_type", referenced.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ActionDescriptor, BindingInfo, ParameterDescriptor};
    use crate::error::ErrorCode;

    fn registry() -> DefaultModelMetadataProvider {
        DefaultModelMetadataProvider::builder()
            .register(
                TypeDescriptor::complex("Address")
                    .property(PropertyDescriptor::new("street", "string").annotate(ValidationAnnotation::Required))
                    .property(PropertyDescriptor::new("zip", "int").bind_required()),
            )
            .register(TypeDescriptor::collection("Address[]", "Address"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builtin_scalars() {
        let provider = registry();
        let int = provider.metadata_for_type(&ModelType::new("int")).unwrap();
        assert!(int.is_required());
        assert!(!int.is_nullable());

        let string = provider.metadata_for_type(&ModelType::new("string")).unwrap();
        assert!(!string.is_required());
        assert!(string.is_nullable());
    }

    #[test]
    fn test_unknown_type() {
        let provider = registry();
        let err = provider.metadata_for_type(&ModelType::new("Nope")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownModelType);
    }

    #[test]
    fn test_property_metadata() {
        let provider = registry();
        let props = provider.metadata_for_properties(&ModelType::new("Address")).unwrap();
        assert_eq!(props.len(), 2);

        let street = &props[0];
        assert_eq!(street.property_name(), Some("street"));
        assert!(street.is_required());
        assert!(!street.is_binding_required());

        let zip = &props[1];
        assert!(zip.is_required());
        assert!(zip.is_binding_required());

        let none = provider.metadata_for_properties(&ModelType::new("int")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_unregistered_reference_is_rejected() {
        let err = DefaultModelMetadataProvider::builder()
            .register(TypeDescriptor::collection("Widget[]", "Widget"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn test_parameter_metadata_is_cached() {
        let provider = registry();
        let parameter = ParameterDescriptor::new("q", "string")
            .bind_required()
            .with_binding_info(BindingInfo::new().with_binder_model_name("query"));
        let action = ActionDescriptor::new("search", vec![parameter.clone()]);

        let first = provider.metadata_for_parameter(&action, &parameter).unwrap();
        let second = provider.metadata_for_parameter(&action, &parameter).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_binding_required());
        assert!(!first.is_required());
        assert_eq!(first.binder_model_name(), Some("query"));
    }
}
