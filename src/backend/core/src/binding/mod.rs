//! Model binding: turning request values into models for action parameters.
//!
//! - **Descriptors**: actions, parameters and their binding overrides
//! - **Value providers**: prefix-aware lookup of raw request values
//! - **Binders**: the [`ModelBinder`] contract, the caching
//!   [`ModelBinderFactory`] and reference binders for scalars, collections
//!   and composite objects
//! - **Parameter binder**: model-name resolution, binder invocation and the
//!   post-binding validation step for one parameter
//!
//! # Example
//!
//! ```rust,ignore
//! use apex_binding::binding::{ActionContext, ParameterBinder, DictionaryValueProvider};
//!
//! let values = DictionaryValueProvider::from_pairs([("id", "42")]);
//! let mut ctx = ActionContext::new(action.clone(), request_head);
//! let result = binder.bind_model(&mut ctx, &values, &action.parameters()[0]).await?;
//! assert!(result.is_model_set());
//! assert!(ctx.model_state.is_valid());
//! ```

pub mod binder;
pub mod binders;
pub mod context;
pub mod descriptor;
pub mod names;
pub mod parameter_binder;
pub mod value_provider;

pub use binder::{
    FormatterExceptionPolicy, ModelBinder, ModelBinderFactory, ModelBinderFactoryContext,
    ModelBinderProvider, ModelBinderProviderContext,
};
pub use binders::{
    CollectionBinderProvider, CollectionModelBinder, ComplexTypeBinderProvider,
    ComplexTypeModelBinder, SimpleTypeBinderProvider, SimpleTypeModelBinder,
};
pub use context::{ActionContext, ModelBindingContext, ModelBindingResult, RequestHead};
pub use descriptor::{
    ActionDescriptor, BindingInfo, ParameterDescriptor, ParameterToken, RequestPredicate,
};
pub use names::{create_index_model_name, create_property_model_name};
pub use parameter_binder::ParameterBinder;
pub use value_provider::{
    CompositeValueProvider, DictionaryValueProvider, ValueProvider, ValueProviderResult,
};
