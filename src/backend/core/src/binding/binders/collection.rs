//! Collection binding.
//!
//! Values are read either from a repeated key (`ids=1&ids=2`) or, when the
//! key itself holds nothing, from indexed keys (`ids[0]=1&ids[1]=2`).
//! Indexed keys are read until the first gap.

use crate::binding::binder::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext};
use crate::binding::context::{ModelBindingContext, ModelBindingResult};
use crate::binding::names::create_index_model_name;
use crate::binding::value_provider::ElementalValueProvider;
use crate::error::Result;
use crate::metadata::{ModelKind, ModelMetadata};
use crate::model::Model;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Selects [`CollectionModelBinder`] for ordered collections.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionBinderProvider;

impl ModelBinderProvider for CollectionBinderProvider {
    fn get_binder(&self, ctx: &mut ModelBinderProviderContext<'_>) -> Result<Option<Arc<dyn ModelBinder>>> {
        let element_type = match ctx.metadata().kind() {
            ModelKind::Collection { element_type } => element_type.clone(),
            _ => return Ok(None),
        };
        let element_metadata = ctx.metadata_provider().metadata_for_type(&element_type)?;
        let element_binder = ctx.create_binder(element_metadata.clone())?;
        Ok(Some(Arc::new(CollectionModelBinder {
            element_metadata,
            element_binder,
        })))
    }
}

/// Binds each element with the element type's binder.
pub struct CollectionModelBinder {
    element_metadata: Arc<ModelMetadata>,
    element_binder: Arc<dyn ModelBinder>,
}

impl CollectionModelBinder {
    pub fn new(element_metadata: Arc<ModelMetadata>, element_binder: Arc<dyn ModelBinder>) -> Self {
        Self {
            element_metadata,
            element_binder,
        }
    }
}

#[async_trait]
impl ModelBinder for CollectionModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let model_name = ctx.model_name().to_string();
        let field_name = ctx.field_name().to_string();
        let values = ctx.value_provider();

        if !values.contains_prefix(&model_name) {
            trace!(model_name = %model_name, "No collection values found");
            return Ok(());
        }

        let raw = values.get_value(&model_name);
        let mut items = Vec::new();

        if !raw.is_none() {
            for value in raw.values() {
                let elemental = ElementalValueProvider::new(model_name.clone(), value.clone());
                let mut child = ctx.nested_with_value_provider(
                    &elemental,
                    self.element_metadata.clone(),
                    field_name.clone(),
                    model_name.clone(),
                    None,
                );
                self.element_binder.bind_model(&mut child).await?;
                if let Some(item) = child.into_result().into_model() {
                    items.push(item);
                }
            }
        } else {
            let mut index = 0usize;
            loop {
                let key = create_index_model_name(&model_name, index);
                if !values.contains_prefix(&key) {
                    break;
                }
                let mut child = ctx.nested(self.element_metadata.clone(), key.clone(), key, None);
                self.element_binder.bind_model(&mut child).await?;
                items.push(child.into_result().into_model().unwrap_or_default());
                index += 1;
            }
            if index == 0 {
                return Ok(());
            }
        }

        let model = Model::List(items);
        let attempted = (!raw.is_none()).then(|| raw.joined());
        ctx.model_state().set_model_value(&model_name, model.clone(), attempted);
        ctx.set_result(ModelBindingResult::Success(model));
        Ok(())
    }
}
