//! Integration tests for parameter binding.
//!
//! These tests drive `ParameterBinder` end to end: model-name resolution,
//! binder invocation, error recovery and the post-binding validation step.

use apex_binding::binding::{
    ActionContext, ActionDescriptor, BindingInfo, DictionaryValueProvider, FormatterExceptionPolicy,
    ModelBinder, ModelBinderFactory, ModelBindingContext, ModelBindingResult, ParameterBinder,
    ParameterDescriptor, RequestHead,
};
use apex_binding::config::BindingOptions;
use apex_binding::error::{BindingError, ErrorCode, Result};
use apex_binding::filters::{ActionExecutingContext, ActionFilter, AutoValidateModelFilter};
use apex_binding::invoker::ActionArguments;
use apex_binding::metadata::{
    DefaultModelMetadataProvider, ExtendedModelMetadataProvider, ModelMetadataProvider,
    PropertyDescriptor, TypeDescriptor, ValidationAnnotation,
};
use apex_binding::model::{Model, ModelType};
use apex_binding::validation::{
    AnnotationValidatorProvider, BindingScope, DefaultParameterValidator, ModelErrorKind,
    ModelValidationState, ParameterValidator,
};
use async_trait::async_trait;
use std::sync::Arc;

// ============================================================================
// Test Utilities
// ============================================================================

fn metadata_provider() -> Arc<DefaultModelMetadataProvider> {
    Arc::new(
        DefaultModelMetadataProvider::builder()
            .register(TypeDescriptor::collection("string[]", "string"))
            .register(
                TypeDescriptor::complex("Address")
                    .property(PropertyDescriptor::new("city", "string").bind_required())
                    .property(
                        PropertyDescriptor::new("zip", "string")
                            .annotate(ValidationAnnotation::Pattern("[0-9]{5}".to_string())),
                    ),
            )
            .build()
            .unwrap(),
    )
}

fn parameter_binder_with(options: BindingOptions) -> ParameterBinder {
    let metadata: Arc<dyn ModelMetadataProvider> = metadata_provider();
    let factory = Arc::new(ModelBinderFactory::with_default_providers(metadata.clone()));
    ParameterBinder::new(metadata, factory, vec![Arc::new(AnnotationValidatorProvider)])
        .with_options(options)
}

fn parameter_binder() -> ParameterBinder {
    parameter_binder_with(BindingOptions::default())
}

fn context_for(parameters: Vec<ParameterDescriptor>) -> ActionContext {
    let action = Arc::new(ActionDescriptor::new("test.action", parameters));
    ActionContext::new(action, RequestHead::default())
}

async fn bind_first(
    binder: &ParameterBinder,
    ctx: &mut ActionContext,
    values: &DictionaryValueProvider,
) -> Result<ModelBindingResult> {
    let action = ctx.action.clone();
    binder.bind_model(ctx, values, &action.parameters()[0]).await
}

/// Fails every bind with an input-format error.
struct MalformedInputBinder {
    policy: Option<bool>,
}

impl FormatterExceptionPolicy for MalformedInputBinder {
    fn send_bad_request_for_exceptions_during_deserialization(&self) -> bool {
        self.policy.unwrap_or(true)
    }
}

#[async_trait]
impl ModelBinder for MalformedInputBinder {
    async fn bind_model(&self, _ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        Err(BindingError::input_format("The JSON value could not be converted."))
    }

    fn exception_policy(&self) -> Option<&dyn FormatterExceptionPolicy> {
        self.policy.map(|_| self as &dyn FormatterExceptionPolicy)
    }
}

/// Sets a fixed result without touching model state.
struct FixedBinder(Model);

#[async_trait]
impl ModelBinder for FixedBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        ctx.set_result(ModelBindingResult::Success(self.0.clone()));
        Ok(())
    }
}

/// Records the attempted value and leaves the result unset.
struct RecordOnlyBinder;

#[async_trait]
impl ModelBinder for RecordOnlyBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let key = ctx.model_name().to_string();
        ctx.model_state()
            .set_model_value(key, Model::from("rust"), Some("rust".to_string()));
        Ok(())
    }
}

/// Fails every bind with the error it was built with.
struct FailingBinder(fn() -> BindingError);

#[async_trait]
impl ModelBinder for FailingBinder {
    async fn bind_model(&self, _ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        Err((self.0)())
    }
}

// ============================================================================
// Model Name Resolution
// ============================================================================

#[tokio::test]
async fn test_binder_model_name_override_wins() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int")
        .with_binding_info(BindingInfo::new().with_binder_model_name("user_id"));
    let mut ctx = context_for(vec![parameter]);

    // Even with a value under the parameter's own name
    let values = DictionaryValueProvider::from_pairs([("id", "1"), ("user_id", "2")]);
    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(result, ModelBindingResult::Success(Model::Integer(2)));
    assert!(ctx.model_state.contains_key("user_id"));
    assert!(!ctx.model_state.contains_key("id"));
}

#[tokio::test]
async fn test_override_used_when_no_values() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int")
        .with_binding_info(BindingInfo::new().with_binder_model_name("user_id"));
    let mut ctx = context_for(vec![parameter]);

    bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap();
    assert_eq!(ctx.model_state.errors("user_id").len(), 1);
}

#[tokio::test]
async fn test_parameter_name_used_when_prefix_present() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("address", "Address")]);
    let values = DictionaryValueProvider::from_pairs([("address.city", "Oslo"), ("city", "Bergen")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();
    let address = result.model().and_then(Model::as_object).cloned().unwrap();
    assert_eq!(address.get("city"), Some(Model::from("Oslo")));
    assert!(ctx.model_state.contains_key("address.city"));
}

#[tokio::test]
async fn test_empty_model_name_when_prefix_absent() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("address", "Address")]);
    let values = DictionaryValueProvider::from_pairs([("city", "Bergen"), ("zip", "12345")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();
    let address = result.model().and_then(Model::as_object).cloned().unwrap();
    assert_eq!(address.get("city"), Some(Model::from("Bergen")));
    assert!(ctx.model_state.contains_key("city"));
    assert!(ctx.model_state.is_valid());
}

// ============================================================================
// End-to-End Validation
// ============================================================================

#[tokio::test]
async fn test_required_int_without_value() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("id", "int")]);

    let result = bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    assert!(!ctx.model_state.is_valid());
    // Model name resolves to "" because the provider has no "id" prefix
    let errors = ctx.model_state.errors("");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::Required);
    assert_eq!(errors[0].message, "The id field is required.");
}

#[tokio::test]
async fn test_binding_required_string_without_value() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("name", "string").bind_required()]);

    let result = bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    let errors = ctx.model_state.errors("");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::MissingBindRequiredValue);
    assert_eq!(
        errors[0].message,
        "A value for the 'name' parameter or property was not provided."
    );
}

#[tokio::test]
async fn test_required_and_binding_required_reports_only_validation_error() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("id", "int").bind_required()]);

    bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap();

    assert_eq!(ctx.model_state.error_count(), 1);
    let errors = ctx.model_state.errors("");
    assert_eq!(errors[0].kind, ModelErrorKind::Required);
}

#[tokio::test]
async fn test_optional_string_without_value_is_not_validated() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("q", "string").annotate(ValidationAnnotation::MinLength(3));
    let mut ctx = context_for(vec![parameter]);

    let result = bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap();

    assert!(!result.is_model_set());
    assert!(ctx.model_state.is_empty());
}

#[tokio::test]
async fn test_bound_value_is_validated() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("q", "string").annotate(ValidationAnnotation::MinLength(3));
    let mut ctx = context_for(vec![parameter]);

    let values = DictionaryValueProvider::from_pairs([("q", "ab")]);
    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(result, ModelBindingResult::Success(Model::from("ab")));
    assert_eq!(ctx.model_state.validation_state("q"), Some(ModelValidationState::Invalid));
    assert_eq!(ctx.model_state.errors("q").len(), 1);
}

#[tokio::test]
async fn test_valid_value_marks_entry_valid() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("id", "int")]);
    let values = DictionaryValueProvider::from_pairs([("id", "42")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(result, ModelBindingResult::Success(Model::Integer(42)));
    assert_eq!(ctx.model_state.validation_state("id"), Some(ModelValidationState::Valid));
}

#[tokio::test]
async fn test_unconvertible_value_reports_one_error() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("id", "int")]);
    let values = DictionaryValueProvider::from_pairs([("id", "abc")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    let errors = ctx.model_state.errors("id");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::InvalidValue);
    assert_eq!(errors[0].message, "The value 'abc' is not valid for id.");
}

#[tokio::test]
async fn test_nested_property_errors() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("address", "Address")]);
    let values = DictionaryValueProvider::from_pairs([("address.zip", "12ab")]);

    bind_first(&binder, &mut ctx, &values).await.unwrap();

    let missing = ctx.model_state.errors("address.city");
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].kind, ModelErrorKind::MissingBindRequiredValue);
    assert_eq!(ctx.model_state.errors("address.zip").len(), 1);
}

#[tokio::test]
async fn test_collection_from_repeated_keys() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("tags", "string[]").annotate(ValidationAnnotation::MaxItems(2));
    let mut ctx = context_for(vec![parameter]);
    let values = DictionaryValueProvider::from_pairs([("tags", "a"), ("tags", "b"), ("tags", "c")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(
        result,
        ModelBindingResult::Success(Model::List(vec![
            Model::from("a"),
            Model::from("b"),
            Model::from("c"),
        ]))
    );
    assert_eq!(ctx.model_state.errors("tags").len(), 1);
}

// ============================================================================
// Request Predicate
// ============================================================================

#[tokio::test]
async fn test_predicate_rejection_skips_binding_and_validation() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int")
        .with_binding_info(BindingInfo::new().with_request_predicate(|_ctx: &ActionContext| false));
    let mut ctx = context_for(vec![parameter]);
    let values = DictionaryValueProvider::from_pairs([("id", "1")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    assert!(ctx.model_state.is_empty());
}

#[tokio::test]
async fn test_predicate_sees_request() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int").with_binding_info(
        BindingInfo::new().with_request_predicate(|ctx: &ActionContext| ctx.request.method == axum::http::Method::POST),
    );
    let mut ctx = context_for(vec![parameter]);
    let values = DictionaryValueProvider::from_pairs([("id", "1")]);

    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();
    assert_eq!(result, ModelBindingResult::Failed);

    ctx.request.method = axum::http::Method::POST;
    let result = bind_first(&binder, &mut ctx, &values).await.unwrap();
    assert_eq!(result, ModelBindingResult::Success(Model::Integer(1)));
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_empty_parameter_name_is_rejected() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("", "int")]);

    let err = bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
    assert!(ctx.model_state.is_empty());
}

#[tokio::test]
async fn test_unknown_parameter_type_is_rejected() {
    let binder = parameter_binder();
    let mut ctx = context_for(vec![ParameterDescriptor::new("x", "Unregistered")]);

    let err = bind_first(&binder, &mut ctx, &DictionaryValueProvider::new())
        .await
        .unwrap_err();
    assert!(err.is_contract_violation());
    assert!(ctx.model_state.is_empty());
}

#[tokio::test]
async fn test_metadata_type_mismatch_is_rejected() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("string"))
        .unwrap();

    let err = binder
        .bind_model_with(
            &mut ctx,
            &FixedBinder(Model::Integer(1)),
            &DictionaryValueProvider::new(),
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
}

#[tokio::test]
async fn test_input_format_error_becomes_model_error() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("int"))
        .unwrap();
    let values = DictionaryValueProvider::from_pairs([("id", "{")]);

    let result = binder
        .bind_model_with(
            &mut ctx,
            &MalformedInputBinder { policy: Some(true) },
            &values,
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    let errors = ctx.model_state.errors("id");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::InputFormat);
    assert_eq!(errors[0].message, "The JSON value could not be converted.");
}

#[tokio::test]
async fn test_input_format_error_propagates_when_policy_disallows() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("int"))
        .unwrap();

    let err = binder
        .bind_model_with(
            &mut ctx,
            &MalformedInputBinder { policy: Some(false) },
            &DictionaryValueProvider::new(),
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InputFormat);
    assert!(ctx.model_state.is_empty());
}

#[tokio::test]
async fn test_input_format_policy_falls_back_to_options() {
    let binder = parameter_binder_with(BindingOptions {
        input_format_errors_as_bad_request: false,
        ..BindingOptions::default()
    });
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("int"))
        .unwrap();

    let err = binder
        .bind_model_with(
            &mut ctx,
            &MalformedInputBinder { policy: None },
            &DictionaryValueProvider::new(),
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InputFormat);
}

#[tokio::test]
async fn test_cancelled_binder_surfaces_failed_result() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("int"))
        .unwrap();
    let values = DictionaryValueProvider::from_pairs([("id", "7")]);

    let result = binder
        .bind_model_with(
            &mut ctx,
            &FailingBinder(BindingError::cancelled),
            &values,
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    assert_eq!(ctx.model_state.error_count(), 1);
    let errors = ctx.model_state.errors("id");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::BindingFailed);
    assert_eq!(errors[0].message, "Model binding was cancelled");
}

#[tokio::test]
async fn test_binder_contract_error_propagates() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("id", "int");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("int"))
        .unwrap();

    let err = binder
        .bind_model_with(
            &mut ctx,
            &FailingBinder(|| BindingError::argument("context", "Binding context is incomplete")),
            &DictionaryValueProvider::from_pairs([("id", "7")]),
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ArgumentInvalid);
    assert!(ctx.model_state.is_empty());
}

// ============================================================================
// Unvalidated Entries
// ============================================================================

#[tokio::test]
async fn test_recorded_but_unvalidated_value_passes_auto_validation() {
    let binder = parameter_binder();
    let parameter = ParameterDescriptor::new("q", "string");
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = binder
        .metadata_provider()
        .metadata_for_type(&ModelType::new("string"))
        .unwrap();

    let result = binder
        .bind_model_with(
            &mut ctx,
            &RecordOnlyBinder,
            &DictionaryValueProvider::from_pairs([("q", "rust")]),
            &parameter,
            &metadata,
            None,
        )
        .await
        .unwrap();

    assert_eq!(result, ModelBindingResult::Failed);
    assert_eq!(ctx.model_state.error_count(), 0);
    assert_eq!(
        ctx.model_state.validation_state("q"),
        Some(ModelValidationState::Unvalidated)
    );
    assert!(ctx.model_state.is_valid());

    let args = ActionArguments::default();
    let mut executing = ActionExecutingContext::new(&mut ctx, &args);
    AutoValidateModelFilter::new().on_action_executing(&mut executing);
    assert!(executing.result.is_none());
}

// ============================================================================
// Parameter Validator
// ============================================================================

#[test]
fn test_parameter_validator_matches_binding_dispatch() {
    let provider = metadata_provider();
    let validator = DefaultParameterValidator::new(
        provider.clone(),
        vec![Arc::new(AnnotationValidatorProvider)],
    );
    assert!(validator.is_enabled());

    let parameter = ParameterDescriptor::new("name", "string").bind_required();
    let mut ctx = context_for(vec![parameter.clone()]);
    let metadata = provider
        .as_extended()
        .unwrap()
        .metadata_for_parameter(&ctx.action.clone(), &parameter)
        .unwrap();

    validator.validate(
        &mut ctx,
        &parameter,
        &metadata,
        false,
        &Model::Null,
        &BindingScope::new("name").with_field_name("name"),
    );

    let errors = ctx.model_state.errors("name");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ModelErrorKind::MissingBindRequiredValue);
}
