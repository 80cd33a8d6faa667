//! Composite object binding.

use crate::binding::binder::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext};
use crate::binding::context::{ModelBindingContext, ModelBindingResult};
use crate::binding::names::create_property_model_name;
use crate::error::Result;
use crate::metadata::{ModelKind, ModelMetadata};
use crate::model::{Model, ObjectRef};
use crate::validation::ModelErrorKind;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Selects [`ComplexTypeModelBinder`] for composite types.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComplexTypeBinderProvider;

impl ModelBinderProvider for ComplexTypeBinderProvider {
    fn get_binder(&self, ctx: &mut ModelBinderProviderContext<'_>) -> Result<Option<Arc<dyn ModelBinder>>> {
        if !matches!(ctx.metadata().kind(), ModelKind::Complex) {
            return Ok(None);
        }
        let model_type = ctx.metadata().model_type().clone();
        let members = ctx.metadata_provider().metadata_for_properties(&model_type)?;
        let mut properties = Vec::with_capacity(members.len());
        for member in members {
            let binder = ctx.create_binder(member.clone())?;
            properties.push((member, binder));
        }
        Ok(Some(Arc::new(ComplexTypeModelBinder { properties })))
    }
}

/// Binds each member in its own nested scope.
pub struct ComplexTypeModelBinder {
    properties: Vec<(Arc<ModelMetadata>, Arc<dyn ModelBinder>)>,
}

#[async_trait]
impl ModelBinder for ComplexTypeModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let model_name = ctx.model_name().to_string();
        if !ctx.is_top_level_object() && !ctx.value_provider().contains_prefix(&model_name) {
            return Ok(());
        }

        let object = match ctx.model() {
            Some(Model::Object(existing)) => existing.clone(),
            _ => ObjectRef::new(),
        };

        for (metadata, binder) in &self.properties {
            let property_name = metadata.property_name().unwrap_or_default().to_string();
            let field_name = metadata
                .binder_model_name()
                .unwrap_or(&property_name)
                .to_string();
            let property_model_name = create_property_model_name(&model_name, &field_name);

            let result = {
                let existing = object.get(&property_name);
                let mut child = ctx.nested(
                    metadata.clone(),
                    field_name.clone(),
                    property_model_name.clone(),
                    existing,
                );
                binder.bind_model(&mut child).await?;
                child.into_result()
            };

            match result {
                ModelBindingResult::Success(value) => object.set(property_name, value),
                ModelBindingResult::Failed if metadata.is_binding_required() => {
                    debug!(
                        model_name = %property_model_name,
                        "Binding-required property was not supplied"
                    );
                    let message = metadata.messages().missing_bind_required_value(&field_name);
                    ctx.model_state().add_model_error(
                        property_model_name,
                        ModelErrorKind::MissingBindRequiredValue,
                        message,
                    );
                }
                ModelBindingResult::Failed => {}
            }
        }

        ctx.set_result(ModelBindingResult::Success(Model::Object(object)));
        Ok(())
    }
}
