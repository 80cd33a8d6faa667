#![allow(clippy::result_large_err)]
//! # Apex Binding
//!
//! Model binding and validation for request handlers.
//!
//! ## Architecture
//!
//! - **Metadata**: static descriptions of types, members and parameters
//! - **Binding**: value providers, binders and the per-parameter binder that
//!   resolves model names and invokes them
//! - **Validation**: model state, validator providers and caching, and a
//!   cycle-safe visitor over bound model graphs
//! - **Filters**: ordered hooks around handlers, including the filter that
//!   turns invalid model state into a 400 problem response
//! - **Invoker**: binds every parameter, runs filters, calls the handler
//! - **Server**: axum adapter serving actions through the invoker
//! - **Telemetry**: structured logging and binding metrics

pub mod binding;
pub mod config;
pub mod error;
pub mod filters;
pub mod invoker;
pub mod metadata;
pub mod model;
pub mod server;
pub mod telemetry;
pub mod validation;

pub use error::{BindingError, ErrorCode, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::binding::{
        ActionContext, ActionDescriptor, BindingInfo, CompositeValueProvider,
        DictionaryValueProvider, ModelBinder, ModelBinderFactory, ModelBindingContext,
        ModelBindingResult, ParameterBinder, ParameterDescriptor, RequestHead, ValueProvider,
    };
    pub use crate::config::{BindingOptions, Config};
    pub use crate::error::{BindingError, ErrorCode, ErrorDetails, ErrorSeverity, Result};
    pub use crate::filters::{
        ActionConvention, ActionFilter, ActionResult, ApiBehaviorConvention, AutoValidateModelFilter,
        ValidationProblemDetails,
    };
    pub use crate::invoker::{handler, ActionArguments, ActionHandler, ActionInvoker};
    pub use crate::metadata::{
        BindingSource, DefaultModelMetadataProvider, ModelMetadata, ModelMetadataProvider,
        PropertyDescriptor, ScalarKind, TypeDescriptor, ValidationAnnotation,
    };
    pub use crate::model::{Model, ModelType, ObjectRef};
    pub use crate::validation::{
        AnnotationValidatorProvider, BindingScope, DefaultParameterValidator,
        ModelStateDictionary, ModelValidator, ModelValidatorProvider, ObjectModelValidator,
        ParameterValidator, ValidationVisitor,
    };
}
