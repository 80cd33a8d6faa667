//! Validation of bound models.
//!
//! - **Model state**: per-request, field-keyed errors and validation states
//!   ([`ModelStateDictionary`])
//! - **Validators**: the [`ModelValidator`] contract, providers and their
//!   ordered composition ([`CompositeModelValidatorProvider`])
//! - **Rules**: validators built from metadata annotations
//!   ([`AnnotationValidatorProvider`])
//! - **Cache**: process-wide validator lists keyed by metadata identity
//! - **Visitor**: depth-first traversal of a model graph with a cycle guard
//! - **Dispatch**: the post-binding step deciding whether to validate and
//!   when to report a missing binding-required value
//! - **Parameter validation**: the same step for values supplied without a
//!   binder
//!
//! # Example
//!
//! ```rust,ignore
//! use apex_binding::validation::{BindingScope, ObjectModelValidator, AnnotationValidatorProvider};
//!
//! let validator = ObjectModelValidator::new(
//!     metadata_provider.clone(),
//!     vec![Arc::new(AnnotationValidatorProvider)],
//! );
//! let scope = BindingScope::new("order").with_field_name("order");
//! validator.validate_bound_model(&mut action_context, &metadata, &scope, true, &model);
//!
//! for (key, messages) in action_context.model_state.to_message_map() {
//!     println!("{}: {:?}", key, messages);
//! }
//! ```

pub mod cache;
pub mod dispatch;
pub mod model_state;
pub mod parameter;
pub mod rules;
pub mod state;
pub mod validator;
pub mod visitor;

// ═══════════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════════

pub use cache::{ValidatorCache, ValidatorList};
pub use dispatch::{BindingScope, ObjectModelValidator};
pub use model_state::{
    ModelError, ModelErrorKind, ModelStateDictionary, ModelStateEntry, ModelValidationState,
    DEFAULT_MAX_MODEL_ERRORS,
};
pub use parameter::{DefaultParameterValidator, ParameterValidator};
pub use rules::{AnnotationValidator, AnnotationValidatorProvider};
pub use state::{ValidationStateDictionary, ValidationStateEntry};
pub use validator::{
    CompositeModelValidatorProvider, ModelValidationContext, ModelValidationResult,
    ModelValidator, ModelValidatorProvider, ValidatorItem, ValidatorProviderContext,
};
pub use visitor::ValidationVisitor;
