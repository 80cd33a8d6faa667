//! Scalar binding.

use crate::binding::binder::{ModelBinder, ModelBinderProvider, ModelBinderProviderContext};
use crate::binding::context::{ModelBindingContext, ModelBindingResult};
use crate::error::Result;
use crate::metadata::{ModelKind, ScalarKind};
use crate::model::Model;
use crate::validation::ModelErrorKind;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Selects [`SimpleTypeModelBinder`] for scalar metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleTypeBinderProvider;

impl ModelBinderProvider for SimpleTypeBinderProvider {
    fn get_binder(&self, ctx: &mut ModelBinderProviderContext<'_>) -> Result<Option<Arc<dyn ModelBinder>>> {
        match ctx.metadata().kind() {
            ModelKind::Simple(kind) => Ok(Some(Arc::new(SimpleTypeModelBinder::new(*kind)))),
            _ => Ok(None),
        }
    }
}

/// Converts the first value found under the model name into a scalar.
#[derive(Debug, Clone, Copy)]
pub struct SimpleTypeModelBinder {
    kind: ScalarKind,
}

impl SimpleTypeModelBinder {
    pub fn new(kind: ScalarKind) -> Self {
        Self { kind }
    }

    fn convert(&self, value: &str) -> Option<Model> {
        let trimmed = value.trim();
        match self.kind {
            ScalarKind::Boolean => {
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Model::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Model::Bool(false))
                } else {
                    None
                }
            }
            ScalarKind::Integer => trimmed.parse::<i64>().ok().map(Model::Integer),
            ScalarKind::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Model::Float),
            ScalarKind::Text => Some(Model::Text(value.to_string())),
        }
    }
}

#[async_trait]
impl ModelBinder for SimpleTypeModelBinder {
    async fn bind_model(&self, ctx: &mut ModelBindingContext<'_>) -> Result<()> {
        let model_name = ctx.model_name().to_string();
        let values = ctx.value_provider().get_value(&model_name);
        let attempted = match values.first_value() {
            Some(value) => value.to_string(),
            None => {
                trace!(model_name = %model_name, "No value found");
                return Ok(());
            }
        };
        let metadata = ctx.metadata().clone();

        if attempted.trim().is_empty() {
            if metadata.is_nullable() {
                ctx.model_state()
                    .set_model_value(&model_name, Model::Null, Some(attempted));
                ctx.set_result(ModelBindingResult::Success(Model::Null));
            } else {
                let message = metadata.messages().value_must_not_be_null(&values.joined());
                let state = ctx.model_state();
                state.set_model_value(&model_name, Model::Text(attempted.clone()), Some(attempted));
                state.add_model_error(&model_name, ModelErrorKind::InvalidValue, message);
            }
            return Ok(());
        }

        match self.convert(&attempted) {
            Some(model) => {
                ctx.model_state()
                    .set_model_value(&model_name, model.clone(), Some(attempted));
                ctx.set_result(ModelBindingResult::Success(model));
            }
            None => {
                let message = metadata
                    .messages()
                    .attempted_value_is_invalid(&attempted, metadata.display_label());
                let state = ctx.model_state();
                state.set_model_value(&model_name, Model::Text(attempted.clone()), Some(attempted));
                state.add_model_error(&model_name, ModelErrorKind::InvalidValue, message);
            }
        }
        Ok(())
    }
}
