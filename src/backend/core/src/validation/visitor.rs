//! Depth-first validation of a bound model graph.

use super::cache::ValidatorCache;
use super::model_state::{ModelStateDictionary, ModelValidationState};
use super::state::ValidationStateDictionary;
use super::validator::{ModelValidationContext, ModelValidatorProvider};
use crate::binding::names::{create_index_model_name, create_property_model_name};
use crate::binding::{ActionContext, ActionDescriptor, RequestHead};
use crate::error::Result;
use crate::metadata::{MetadataIdentity, ModelKind, ModelMetadata, ModelMetadataProvider};
use crate::model::{Model, ModelIdentity};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Walks a model graph as described by its metadata, running validators at
/// every node and recording failures in the request's model state.
///
/// A visitor is good for one request. Each call to
/// [`validate`](Self::validate) is one traversal with its own visited set, so
/// a (metadata, object) pair is checked at most once per call and reference
/// cycles terminate.
pub struct ValidationVisitor<'a> {
    action: &'a ActionDescriptor,
    request: &'a RequestHead,
    model_state: &'a mut ModelStateDictionary,
    validator_provider: &'a dyn ModelValidatorProvider,
    cache: &'a ValidatorCache,
    metadata_provider: &'a dyn ModelMetadataProvider,
    validation_state: Option<&'a ValidationStateDictionary>,
    visited: HashSet<(MetadataIdentity, ModelIdentity)>,
}

impl<'a> ValidationVisitor<'a> {
    pub fn new(
        action_context: &'a mut ActionContext,
        validator_provider: &'a dyn ModelValidatorProvider,
        cache: &'a ValidatorCache,
        metadata_provider: &'a dyn ModelMetadataProvider,
    ) -> Self {
        let ActionContext {
            action,
            request,
            model_state,
            ..
        } = action_context;

        Self {
            action: &**action,
            request: &*request,
            model_state,
            validator_provider,
            cache,
            metadata_provider,
            validation_state: None,
            visited: HashSet::new(),
        }
    }

    /// Honour the per-object overrides recorded during binding.
    pub fn with_validation_state(mut self, validation_state: &'a ValidationStateDictionary) -> Self {
        self.validation_state = Some(validation_state);
        self
    }

    /// Validate `model` under `key`. Returns `true` when the subtree's fields
    /// are valid. A key that was already invalid before this call reports
    /// `false` even though nothing new is added for it.
    ///
    /// With `skip_null_at_top_level`, a null root is accepted without running
    /// any validator, and an existing entry for `key` is marked valid.
    pub fn validate(
        &mut self,
        metadata: &Arc<ModelMetadata>,
        key: &str,
        model: &Model,
        skip_null_at_top_level: bool,
    ) -> bool {
        self.visited.clear();

        if model.is_null() && skip_null_at_top_level {
            if self.model_state.contains_key(key) {
                self.model_state.mark_field_valid(key);
            }
            return true;
        }

        self.visit(metadata, key, None, model)
    }

    fn visit(
        &mut self,
        metadata: &Arc<ModelMetadata>,
        key: &str,
        container: Option<&Model>,
        model: &Model,
    ) -> bool {
        let entry = self
            .validation_state
            .and_then(|state| state.get(model));

        let key = entry.and_then(|e| e.key.as_deref()).unwrap_or(key);
        let metadata = entry
            .and_then(|e| e.metadata.clone())
            .unwrap_or_else(|| metadata.clone());

        if entry.is_some_and(|e| e.suppress_validation) {
            debug!(key = %key, "Validation suppressed for subtree");
            self.model_state.mark_subtree_skipped(key);
            return true;
        }

        if self.model_state.has_reached_max_errors() {
            self.model_state.mark_subtree_skipped(key);
            return false;
        }

        if let Some(identity) = model.identity() {
            if !self.visited.insert((metadata.identity().clone(), identity)) {
                trace!(key = %key, "Already visited in this traversal");
                return true;
            }
        }

        let node_valid = self.validate_node(&metadata, key, container, model);
        let children_valid = self.visit_children(&metadata, key, model);
        let is_valid = node_valid && children_valid;

        if is_valid && self.model_state.contains_key(key) {
            self.model_state.mark_field_valid(key);
        }
        is_valid
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node
    // ─────────────────────────────────────────────────────────────────────────

    fn validate_node(
        &mut self,
        metadata: &ModelMetadata,
        key: &str,
        container: Option<&Model>,
        model: &Model,
    ) -> bool {
        // A key that already failed (typically during binding) is not
        // validated again.
        if self.model_state.validation_state(key) == Some(ModelValidationState::Invalid) {
            trace!(key = %key, "Key already invalid, validators not run");
            return false;
        }

        let validators = self
            .cache
            .get_validators(metadata, self.validator_provider);
        if validators.is_empty() {
            return true;
        }

        let ctx = ModelValidationContext {
            action: self.action,
            request: self.request,
            metadata,
            container,
            model,
            key,
        };
        let failures: Vec<_> = validators
            .iter()
            .flat_map(|validator| validator.validate(&ctx))
            .collect();

        for failure in &failures {
            let error_key = match failure.member_name.as_deref() {
                Some(member) => create_property_model_name(key, member),
                None => key.to_string(),
            };
            self.model_state
                .try_add_model_error(error_key, failure.error.clone());
        }
        failures.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Children
    // ─────────────────────────────────────────────────────────────────────────

    fn visit_children(&mut self, metadata: &ModelMetadata, key: &str, model: &Model) -> bool {
        if model.is_null() {
            return true;
        }
        if !metadata.validate_children() {
            self.model_state.mark_subtree_skipped(key);
            return true;
        }

        match metadata.kind() {
            ModelKind::Simple(_) => true,
            ModelKind::Complex => self.visit_properties(metadata, key, model),
            ModelKind::Collection { element_type } => {
                let Some(items) = model.as_list() else {
                    return true;
                };
                let Some(element) = self.child_metadata(|p| p.metadata_for_type(element_type)) else {
                    return true;
                };
                let mut is_valid = true;
                for (index, item) in items.iter().enumerate() {
                    if self.model_state.has_reached_max_errors() {
                        return false;
                    }
                    let child_key = create_index_model_name(key, index);
                    is_valid &= self.visit(&element, &child_key, Some(model), item);
                }
                is_valid
            }
            ModelKind::Dictionary { value_type } => {
                let Model::Dictionary(entries) = model else {
                    return true;
                };
                let Some(value) = self.child_metadata(|p| p.metadata_for_type(value_type)) else {
                    return true;
                };
                let mut is_valid = true;
                for (entry_key, item) in entries {
                    if self.model_state.has_reached_max_errors() {
                        return false;
                    }
                    let child_key = create_index_model_name(key, entry_key);
                    is_valid &= self.visit(&value, &child_key, Some(model), item);
                }
                is_valid
            }
        }
    }

    fn visit_properties(&mut self, metadata: &ModelMetadata, key: &str, model: &Model) -> bool {
        let Some(object) = model.as_object() else {
            return true;
        };
        let Some(properties) = self.child_metadata(|p| p.metadata_for_properties(metadata.model_type()))
        else {
            return true;
        };

        let mut is_valid = true;
        for property in &properties {
            if self.model_state.has_reached_max_errors() {
                return false;
            }
            let Some(name) = property.property_name() else {
                continue;
            };
            let child_key = create_property_model_name(key, property.binder_model_name().unwrap_or(name));
            let value = object.get(name).unwrap_or_default();
            is_valid &= self.visit(property, &child_key, Some(model), &value);
        }
        is_valid
    }

    fn child_metadata<T>(
        &self,
        lookup: impl FnOnce(&dyn ModelMetadataProvider) -> Result<T>,
    ) -> Option<T> {
        match lookup(self.metadata_provider) {
            Ok(found) => Some(found),
            Err(err) => {
                warn!(error = %err, "Child metadata unavailable, skipping child validation");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ActionContext, ActionDescriptor, RequestHead};
    use crate::metadata::{
        DefaultModelMetadataProvider, PropertyDescriptor, ScalarKind, TypeDescriptor,
        ValidationAnnotation,
    };
    use crate::model::{ModelType, ObjectRef};
    use crate::validation::model_state::ModelErrorKind;
    use crate::validation::rules::AnnotationValidatorProvider;
    use crate::validation::state::ValidationStateEntry;

    fn provider() -> DefaultModelMetadataProvider {
        DefaultModelMetadataProvider::builder()
            .register(
                TypeDescriptor::complex("Person")
                    .property(
                        PropertyDescriptor::new("name", "string")
                            .annotate(ValidationAnnotation::Required),
                    )
                    .property(PropertyDescriptor::new("friend", "Person")),
            )
            .build()
            .unwrap()
    }

    fn action_context() -> ActionContext {
        ActionContext::new(
            Arc::new(ActionDescriptor::new("people.create", vec![])),
            RequestHead::default(),
        )
    }

    #[test]
    fn test_cycle_terminates() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Person"))
            .unwrap();
        let a = ObjectRef::from_fields([("name", Model::from("a"))]);
        let b = ObjectRef::from_fields([("name", Model::from("b"))]);
        a.set("friend", Model::Object(b.clone()));
        b.set("friend", Model::Object(a.clone()));

        let cache = ValidatorCache::new();
        let mut ctx = action_context();
        let mut visitor = ValidationVisitor::new(
            &mut ctx,
            &AnnotationValidatorProvider,
            &cache,
            &metadata_provider,
        );
        assert!(visitor.validate(&metadata, "person", &Model::Object(a), false));
        assert!(ctx.model_state.is_empty());
    }

    #[test]
    fn test_nested_errors_use_property_keys() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Person"))
            .unwrap();
        let friend = ObjectRef::new();
        let root = ObjectRef::from_fields([
            ("name", Model::from("root")),
            ("friend", Model::Object(friend)),
        ]);

        let cache = ValidatorCache::new();
        let mut ctx = action_context();
        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .validate(&metadata, "person", &Model::Object(root), false);

        assert!(!valid);
        assert_eq!(
            ctx.model_state.validation_state("person.friend.name"),
            Some(ModelValidationState::Invalid)
        );
        assert_eq!(ctx.model_state.error_count(), 1);
    }

    #[test]
    fn test_skip_null_at_top_level() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Person"))
            .unwrap();
        let cache = ValidatorCache::new();
        let mut ctx = action_context();
        ctx.model_state.set_model_value("person", Model::Null, None);

        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .validate(&metadata, "person", &Model::Null, true);

        assert!(valid);
        assert_eq!(
            ctx.model_state.validation_state("person"),
            Some(ModelValidationState::Valid)
        );
    }

    #[test]
    fn test_required_null_root_is_flagged() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("int"))
            .unwrap();
        let cache = ValidatorCache::new();
        let mut ctx = action_context();

        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .validate(&metadata, "id", &Model::Null, false);

        assert!(!valid);
        assert_eq!(ctx.model_state.errors("id").len(), 1);
    }

    #[test]
    fn test_suppressed_subtree_is_skipped() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Person"))
            .unwrap();
        let root = ObjectRef::new();
        let mut overrides = ValidationStateDictionary::new();
        overrides.insert(&root, ValidationStateEntry::suppressed());

        let cache = ValidatorCache::new();
        let mut ctx = action_context();
        ctx.model_state.set_model_value("person.name", Model::Null, None);

        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .with_validation_state(&overrides)
            .validate(&metadata, "person", &Model::Object(root), false);

        assert!(valid);
        assert_eq!(
            ctx.model_state.validation_state("person.name"),
            Some(ModelValidationState::Skipped)
        );
    }

    #[test]
    fn test_override_for_dropped_object_does_not_apply_to_new_object() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Person"))
            .unwrap();
        let cache = ValidatorCache::new();

        for _ in 0..20 {
            let mut overrides = ValidationStateDictionary::new();
            {
                let temporary = ObjectRef::new();
                overrides.insert(&temporary, ValidationStateEntry::suppressed());
            }
            let person = ObjectRef::new();

            let mut ctx = action_context();
            let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
                .with_validation_state(&overrides)
                .validate(&metadata, "person", &Model::Object(person), false);

            assert!(!valid);
            assert_eq!(ctx.model_state.errors("person.name").len(), 1);
        }
    }

    #[test]
    fn test_collection_elements_use_index_keys() {
        let metadata_provider = DefaultModelMetadataProvider::builder()
            .register(TypeDescriptor::collection("Tags", "Tag"))
            .register(TypeDescriptor::scalar("Tag", ScalarKind::Text, true).annotate(ValidationAnnotation::MaxLength(3)))
            .build()
            .unwrap();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("Tags"))
            .unwrap();
        let cache = ValidatorCache::new();
        let mut ctx = action_context();

        let tags = Model::List(vec![Model::from("ok"), Model::from("too long")]);
        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .validate(&metadata, "tags", &tags, false);

        assert!(!valid);
        assert!(ctx.model_state.errors("tags[0]").is_empty());
        assert_eq!(ctx.model_state.errors("tags[1]").len(), 1);
    }

    #[test]
    fn test_already_invalid_key_is_not_validated_again() {
        let metadata_provider = provider();
        let metadata = metadata_provider
            .metadata_for_type(&ModelType::new("int"))
            .unwrap();
        let cache = ValidatorCache::new();
        let mut ctx = action_context();
        ctx.model_state
            .add_model_error("id", ModelErrorKind::InvalidValue, "The value 'x' is not valid for id.");

        let valid = ValidationVisitor::new(&mut ctx, &AnnotationValidatorProvider, &cache, &metadata_provider)
            .validate(&metadata, "id", &Model::Null, false);

        assert!(!valid);
        assert_eq!(ctx.model_state.errors("id").len(), 1);
        assert_eq!(ctx.model_state.errors("id")[0].kind, ModelErrorKind::InvalidValue);
    }
}
