//! Binder contracts and the binder factory.

use super::binders::{CollectionBinderProvider, ComplexTypeBinderProvider, SimpleTypeBinderProvider};
use super::context::ModelBindingContext;
use super::descriptor::{BindingInfo, ParameterToken};
use crate::error::{BindingError, Result};
use crate::metadata::{MetadataIdentity, ModelMetadata, ModelMetadataProvider};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════════
// Binder Contracts
// ═══════════════════════════════════════════════════════════════════════════════

/// Decides how input-format errors raised while binding are surfaced.
pub trait FormatterExceptionPolicy: Send + Sync {
    /// `true` converts input-format errors into model-state errors (and so a
    /// client error); `false` lets them propagate as server faults.
    fn send_bad_request_for_exceptions_during_deserialization(&self) -> bool;
}

/// Produces a model from request values.
///
/// A binder reports its outcome through
/// [`ModelBindingContext::set_result`]. Returning an error is reserved for
/// failures that are not about the request data being absent or malformed
/// at the field level.
#[async_trait]
pub trait ModelBinder: Send + Sync {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()>;

    /// Policy for input-format errors this binder raises.
    fn exception_policy(&self) -> Option<&dyn FormatterExceptionPolicy> {
        None
    }

    /// Name used in logs.
    fn binder_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Chooses a binder for a piece of metadata.
pub trait ModelBinderProvider: Send + Sync {
    /// Return `Ok(None)` when this provider does not handle the metadata.
    fn get_binder(&self, ctx: &mut ModelBinderProviderContext<'_>) -> Result<Option<Arc<dyn ModelBinder>>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Provider Context
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BinderCacheKey {
    identity: MetadataIdentity,
    token: Option<ParameterToken>,
}

enum Visit {
    InProgress(Option<Arc<PlaceholderBinder>>),
    Done(Arc<dyn ModelBinder>),
}

/// What a [`ModelBinderProvider`] sees when asked for a binder.
pub struct ModelBinderProviderContext<'a> {
    factory: &'a ModelBinderFactory,
    visited: &'a mut HashMap<BinderCacheKey, Visit>,
    metadata: Arc<ModelMetadata>,
    binding_info: Option<&'a BindingInfo>,
}

impl<'a> ModelBinderProviderContext<'a> {
    pub fn metadata(&self) -> &Arc<ModelMetadata> {
        &self.metadata
    }

    pub fn binding_info(&self) -> Option<&BindingInfo> {
        self.binding_info
    }

    pub fn metadata_provider(&self) -> &dyn ModelMetadataProvider {
        self.factory.metadata_provider.as_ref()
    }

    /// Create the binder for a member or element.
    pub fn create_binder(&mut self, metadata: Arc<ModelMetadata>) -> Result<Arc<dyn ModelBinder>> {
        let key = BinderCacheKey {
            identity: metadata.identity().clone(),
            token: None,
        };
        self.factory.create_binder_core(self.visited, metadata, None, key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Factory
// ═══════════════════════════════════════════════════════════════════════════════

/// Input to [`ModelBinderFactory::create_binder`].
#[derive(Debug, Clone)]
pub struct ModelBinderFactoryContext {
    pub metadata: Arc<ModelMetadata>,
    pub binding_info: Option<BindingInfo>,
    /// Scopes the cached binder, typically to a parameter.
    pub cache_token: Option<ParameterToken>,
}

/// Builds binders from an ordered provider list and caches them.
pub struct ModelBinderFactory {
    providers: Vec<Arc<dyn ModelBinderProvider>>,
    metadata_provider: Arc<dyn ModelMetadataProvider>,
    cache: DashMap<BinderCacheKey, Arc<dyn ModelBinder>>,
}

impl ModelBinderFactory {
    pub fn new(
        metadata_provider: Arc<dyn ModelMetadataProvider>,
        providers: Vec<Arc<dyn ModelBinderProvider>>,
    ) -> Self {
        Self {
            providers,
            metadata_provider,
            cache: DashMap::new(),
        }
    }

    /// Factory with the simple, collection and complex-type providers.
    pub fn with_default_providers(metadata_provider: Arc<dyn ModelMetadataProvider>) -> Self {
        Self::new(
            metadata_provider,
            vec![
                Arc::new(SimpleTypeBinderProvider),
                Arc::new(CollectionBinderProvider),
                Arc::new(ComplexTypeBinderProvider),
            ],
        )
    }

    pub fn metadata_provider(&self) -> &Arc<dyn ModelMetadataProvider> {
        &self.metadata_provider
    }

    /// Return the binder for `ctx.metadata`. The same metadata and cache
    /// token always yield the same binder instance.
    pub fn create_binder(&self, ctx: ModelBinderFactoryContext) -> Result<Arc<dyn ModelBinder>> {
        let key = BinderCacheKey {
            identity: ctx.metadata.identity().clone(),
            token: ctx.cache_token,
        };
        if let Some(binder) = self.cache.get(&key) {
            return Ok(binder.clone());
        }

        debug!(
            model_type = %ctx.metadata.model_type(),
            "Binder cache miss"
        );
        let mut visited = HashMap::new();
        let binder = self.create_binder_core(&mut visited, ctx.metadata, ctx.binding_info.as_ref(), key.clone())?;
        Ok(self.cache.entry(key).or_insert(binder).clone())
    }

    fn create_binder_core(
        &self,
        visited: &mut HashMap<BinderCacheKey, Visit>,
        metadata: Arc<ModelMetadata>,
        binding_info: Option<&BindingInfo>,
        key: BinderCacheKey,
    ) -> Result<Arc<dyn ModelBinder>> {
        match visited.get_mut(&key) {
            Some(Visit::Done(binder)) => return Ok(binder.clone()),
            Some(Visit::InProgress(placeholder)) => {
                // Recursive type: hand out a placeholder resolved once the
                // outer binder is built.
                let placeholder = placeholder.get_or_insert_with(|| Arc::new(PlaceholderBinder::default()));
                return Ok(placeholder.clone());
            }
            None => {}
        }
        if key.token.is_none() {
            if let Some(binder) = self.cache.get(&key) {
                return Ok(binder.clone());
            }
        }

        visited.insert(key.clone(), Visit::InProgress(None));

        let model_type = metadata.model_type().clone();
        let mut provider_ctx = ModelBinderProviderContext {
            factory: self,
            visited: &mut *visited,
            metadata,
            binding_info,
        };
        let mut selected = None;
        for provider in &self.providers {
            if let Some(binder) = provider.get_binder(&mut provider_ctx)? {
                selected = Some(binder);
                break;
            }
        }

        let binder = match selected {
            Some(binder) => binder,
            None => {
                visited.remove(&key);
                return Err(BindingError::binder_unavailable(model_type.name()));
            }
        };

        if let Some(Visit::InProgress(Some(placeholder))) = visited.get(&key) {
            placeholder.resolve(binder.clone());
        }
        visited.insert(key, Visit::Done(binder.clone()));

        debug!(model_type = %model_type, binder = binder.binder_name(), "Binder selected");
        Ok(binder)
    }
}

impl std::fmt::Debug for ModelBinderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinderFactory")
            .field("providers", &self.providers.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Placeholder
// ═══════════════════════════════════════════════════════════════════════════════

/// Stands in for a binder that is still being built.
#[derive(Default)]
pub struct PlaceholderBinder {
    inner: OnceLock<Arc<dyn ModelBinder>>,
}

impl PlaceholderBinder {
    fn resolve(&self, binder: Arc<dyn ModelBinder>) {
        let _ = self.inner.set(binder);
    }
}

#[async_trait]
impl ModelBinder for PlaceholderBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        match self.inner.get() {
            Some(binder) => binder.bind_model(ctx).await,
            None => Err(BindingError::binder_unavailable(ctx.metadata().model_type().name())),
        }
    }

    fn exception_policy(&self) -> Option<&dyn FormatterExceptionPolicy> {
        self.inner.get().and_then(|binder| binder.exception_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::metadata::{DefaultModelMetadataProvider, PropertyDescriptor, TypeDescriptor};
    use crate::model::ModelType;

    fn factory() -> ModelBinderFactory {
        let provider = DefaultModelMetadataProvider::builder()
            .register(
                TypeDescriptor::complex("Node")
                    .property(PropertyDescriptor::new("value", "int"))
                    .property(PropertyDescriptor::new("next", "Node")),
            )
            .register(TypeDescriptor::dictionary("Map", "int"))
            .build()
            .unwrap();
        ModelBinderFactory::with_default_providers(Arc::new(provider))
    }

    fn context(factory: &ModelBinderFactory, type_name: &str, token: Option<ParameterToken>) -> ModelBinderFactoryContext {
        ModelBinderFactoryContext {
            metadata: factory
                .metadata_provider()
                .metadata_for_type(&ModelType::new(type_name))
                .unwrap(),
            binding_info: None,
            cache_token: token,
        }
    }

    #[test]
    fn test_same_token_reuses_binder() {
        let factory = factory();
        let token = crate::binding::ParameterDescriptor::new("id", "int").token();
        let a = factory.create_binder(context(&factory, "int", Some(token))).unwrap();
        let b = factory.create_binder(context(&factory, "int", Some(token))).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_recursive_type_terminates() {
        let factory = factory();
        let binder = factory.create_binder(context(&factory, "Node", None));
        assert!(binder.is_ok());
    }

    #[test]
    fn test_unhandled_shape_is_unavailable() {
        let factory = factory();
        let err = factory.create_binder(context(&factory, "Map", None)).err().unwrap();
        assert_eq!(err.code(), ErrorCode::BinderUnavailable);
    }
}
