//! Validator contracts and provider composition.

use crate::binding::{ActionDescriptor, RequestHead};
use crate::metadata::{ModelMetadata, ValidationAnnotation};
use crate::model::Model;
use crate::validation::model_state::ModelError;
use std::fmt;
use std::sync::Arc;

// ═══════════════════════════════════════════════════════════════════════════════
// Validators
// ═══════════════════════════════════════════════════════════════════════════════

/// What a validator sees for one node of the model graph.
#[derive(Clone, Copy)]
pub struct ModelValidationContext<'a> {
    pub action: &'a ActionDescriptor,
    pub request: &'a RequestHead,
    pub metadata: &'a ModelMetadata,
    /// The object holding this node, for members and elements.
    pub container: Option<&'a Model>,
    pub model: &'a Model,
    /// Model-state key of this node.
    pub key: &'a str,
}

/// One failure reported by a validator.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelValidationResult {
    /// Member the failure belongs to, relative to the node. `None` targets
    /// the node itself.
    pub member_name: Option<String>,
    pub error: ModelError,
}

impl ModelValidationResult {
    pub fn new(error: ModelError) -> Self {
        Self {
            member_name: None,
            error,
        }
    }

    pub fn for_member(member_name: impl Into<String>, error: ModelError) -> Self {
        Self {
            member_name: Some(member_name.into()),
            error,
        }
    }
}

/// Checks one node. Returns no results when the node is valid.
pub trait ModelValidator: Send + Sync {
    fn validate(&self, ctx: &ModelValidationContext<'_>) -> Vec<ModelValidationResult>;
}

impl<F> ModelValidator for F
where
    F: Fn(&ModelValidationContext<'_>) -> Vec<ModelValidationResult> + Send + Sync,
{
    fn validate(&self, ctx: &ModelValidationContext<'_>) -> Vec<ModelValidationResult> {
        self(ctx)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Providers
// ═══════════════════════════════════════════════════════════════════════════════

/// A slot in the validator list for one metadata node.
#[derive(Clone, Default)]
pub struct ValidatorItem {
    /// The annotation this slot was created for, if any.
    pub annotation: Option<ValidationAnnotation>,
    pub validator: Option<Arc<dyn ModelValidator>>,
    /// Whether the validator may be cached and shared across requests.
    pub is_reusable: bool,
}

impl ValidatorItem {
    pub fn for_annotation(annotation: ValidationAnnotation) -> Self {
        Self {
            annotation: Some(annotation),
            validator: None,
            is_reusable: false,
        }
    }

    pub fn with_validator(validator: Arc<dyn ModelValidator>, is_reusable: bool) -> Self {
        Self {
            annotation: None,
            validator: Some(validator),
            is_reusable,
        }
    }
}

impl fmt::Debug for ValidatorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorItem")
            .field("annotation", &self.annotation)
            .field("has_validator", &self.validator.is_some())
            .field("is_reusable", &self.is_reusable)
            .finish()
    }
}

/// Collects validators for one metadata node.
///
/// Starts with one unassigned item per annotation on the metadata. Providers
/// may fill unassigned items and append new ones; they can never remove or
/// replace an item already holding a validator.
#[derive(Debug)]
pub struct ValidatorProviderContext<'a> {
    metadata: &'a ModelMetadata,
    results: Vec<ValidatorItem>,
}

impl<'a> ValidatorProviderContext<'a> {
    pub fn new(metadata: &'a ModelMetadata) -> Self {
        let results = metadata
            .annotations()
            .iter()
            .cloned()
            .map(ValidatorItem::for_annotation)
            .collect();
        Self { metadata, results }
    }

    pub fn metadata(&self) -> &'a ModelMetadata {
        self.metadata
    }

    pub fn results(&self) -> &[ValidatorItem] {
        &self.results
    }

    /// Items that do not hold a validator yet.
    pub fn unassigned_mut(&mut self) -> impl Iterator<Item = &mut ValidatorItem> {
        self.results.iter_mut().filter(|item| item.validator.is_none())
    }

    pub fn push(&mut self, item: ValidatorItem) {
        self.results.push(item);
    }

    pub fn into_results(self) -> Vec<ValidatorItem> {
        self.results
    }
}

/// Supplies validators for metadata nodes.
pub trait ModelValidatorProvider: Send + Sync {
    fn create_validators(&self, ctx: &mut ValidatorProviderContext<'_>);
}

/// Runs an ordered list of providers against the same context, so their
/// contributions are concatenated in list order.
#[derive(Clone, Default)]
pub struct CompositeModelValidatorProvider {
    providers: Vec<Arc<dyn ModelValidatorProvider>>,
}

impl CompositeModelValidatorProvider {
    pub fn new(providers: Vec<Arc<dyn ModelValidatorProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn ModelValidatorProvider>] {
        &self.providers
    }
}

impl ModelValidatorProvider for CompositeModelValidatorProvider {
    fn create_validators(&self, ctx: &mut ValidatorProviderContext<'_>) {
        for provider in &self.providers {
            provider.create_validators(ctx);
        }
    }
}

impl fmt::Debug for CompositeModelValidatorProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeModelValidatorProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataIdentity, ModelKind, ScalarKind};
    use crate::model::ModelType;
    use crate::validation::model_state::ModelErrorKind;

    struct Tagging(&'static str);

    impl ModelValidatorProvider for Tagging {
        fn create_validators(&self, ctx: &mut ValidatorProviderContext<'_>) {
            let tag = self.0;
            let validator = move |_: &ModelValidationContext<'_>| {
                vec![ModelValidationResult::new(ModelError::with_message(
                    ModelErrorKind::Custom { code: tag.into() },
                    tag,
                ))]
            };
            ctx.push(ValidatorItem::with_validator(Arc::new(validator), true));
        }
    }

    #[test]
    fn test_composite_preserves_source_order() {
        let metadata = ModelMetadata::builder(
            MetadataIdentity::for_type(ModelType::new("string")),
            ModelKind::Simple(ScalarKind::Text),
        )
        .annotation(ValidationAnnotation::Email)
        .build();
        let composite = CompositeModelValidatorProvider::new(vec![
            Arc::new(Tagging("first")),
            Arc::new(Tagging("second")),
        ]);

        let mut ctx = ValidatorProviderContext::new(&metadata);
        composite.create_validators(&mut ctx);
        let results = ctx.into_results();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].annotation, Some(ValidationAnnotation::Email));
        assert!(results[0].validator.is_none());
        assert!(results[1].validator.is_some());
        assert!(results[2].validator.is_some());
    }

    #[test]
    fn test_unassigned_items_only() {
        let metadata = ModelMetadata::builder(
            MetadataIdentity::for_type(ModelType::new("string")),
            ModelKind::Simple(ScalarKind::Text),
        )
        .annotation(ValidationAnnotation::Email)
        .build();
        let mut ctx = ValidatorProviderContext::new(&metadata);
        ctx.push(ValidatorItem::with_validator(
            Arc::new(|_: &ModelValidationContext<'_>| Vec::<ModelValidationResult>::new()),
            true,
        ));
        assert_eq!(ctx.unassigned_mut().count(), 1);
    }
}
