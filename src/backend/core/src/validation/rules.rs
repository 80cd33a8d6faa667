//! Validators built from declarative annotations.
//!
//! Every rule except `Required` accepts null, and a rule that does not apply
//! to a value's shape (a length rule on an integer, say) accepts it.

use super::model_state::{ModelError, ModelErrorKind};
use super::validator::{
    ModelValidationContext, ModelValidationResult, ModelValidator, ModelValidatorProvider,
    ValidatorItem, ValidatorProviderContext,
};
use crate::error::{BindingError, Result};
use crate::metadata::{ModelMetadata, ValidationAnnotation};
use crate::model::Model;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::warn;

// ═══════════════════════════════════════════════════════════════════════════════
// Pre-compiled Regex Patterns
// ═══════════════════════════════════════════════════════════════════════════════

/// Email validation regex (RFC 5322 simplified).
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

/// URL validation regex.
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)$"
    ).expect("Invalid URL regex")
});

// ═══════════════════════════════════════════════════════════════════════════════
// Annotation Validator
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Range { min: f64, max: f64 },
    Pattern { source: String, regex: Regex },
    Email,
    Url,
    OneOf(Vec<String>),
    MinItems(usize),
    MaxItems(usize),
}

/// Checks one annotation against a node.
#[derive(Debug, Clone)]
pub struct AnnotationValidator {
    rule: Rule,
}

impl AnnotationValidator {
    /// Compile an annotation. Fails only for a malformed `Pattern`.
    pub fn new(annotation: &ValidationAnnotation) -> Result<Self> {
        let rule = match annotation {
            ValidationAnnotation::Required => Rule::Required,
            ValidationAnnotation::MinLength(min) => Rule::MinLength(*min),
            ValidationAnnotation::MaxLength(max) => Rule::MaxLength(*max),
            ValidationAnnotation::Range { min, max } => Rule::Range {
                min: *min,
                max: *max,
            },
            ValidationAnnotation::Pattern(source) => {
                let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|err| {
                    BindingError::configuration(format!("Invalid validation pattern '{}'", source))
                        .with_source(err)
                })?;
                Rule::Pattern {
                    source: source.clone(),
                    regex,
                }
            }
            ValidationAnnotation::Email => Rule::Email,
            ValidationAnnotation::Url => Rule::Url,
            ValidationAnnotation::OneOf(allowed) => Rule::OneOf(allowed.clone()),
            ValidationAnnotation::MinItems(min) => Rule::MinItems(*min),
            ValidationAnnotation::MaxItems(max) => Rule::MaxItems(*max),
        };
        Ok(Self { rule })
    }

    /// The implicit rule for non-nullable or otherwise required values.
    pub fn required() -> Self {
        Self { rule: Rule::Required }
    }

    fn check(&self, model: &Model) -> Option<ModelErrorKind> {
        if let Rule::Required = self.rule {
            return match model {
                Model::Null => Some(ModelErrorKind::Required),
                Model::Text(s) if s.trim().is_empty() => Some(ModelErrorKind::Required),
                _ => None,
            };
        }
        if model.is_null() {
            return None;
        }

        match &self.rule {
            Rule::Required => None,
            Rule::MinLength(min) => {
                let actual = length_of(model)?;
                (actual < *min).then(|| ModelErrorKind::MinLength { min: *min, actual })
            }
            Rule::MaxLength(max) => {
                let actual = length_of(model)?;
                (actual > *max).then(|| ModelErrorKind::MaxLength { max: *max, actual })
            }
            Rule::Range { min, max } => {
                let actual = match model {
                    Model::Text(s) => s.trim().parse::<f64>().ok()?,
                    other => other.as_f64()?,
                };
                (actual < *min || actual > *max).then(|| ModelErrorKind::Range {
                    min: min.to_string(),
                    max: max.to_string(),
                    actual: actual.to_string(),
                })
            }
            Rule::Pattern { source, regex } => {
                let text = model.as_str()?;
                (!regex.is_match(text)).then(|| ModelErrorKind::Pattern {
                    pattern: source.clone(),
                })
            }
            Rule::Email => {
                let text = model.as_str()?;
                (!EMAIL_REGEX.is_match(text)).then_some(ModelErrorKind::InvalidEmail)
            }
            Rule::Url => {
                let text = model.as_str()?;
                (!URL_REGEX.is_match(text)).then_some(ModelErrorKind::InvalidUrl)
            }
            Rule::OneOf(allowed) => {
                let value = model.display_value()?;
                (!allowed.contains(&value)).then(|| ModelErrorKind::NotInSet {
                    allowed: allowed.clone(),
                })
            }
            Rule::MinItems(min) => {
                let actual = model.item_count()?;
                (actual < *min).then(|| ModelErrorKind::MinItems { min: *min, actual })
            }
            Rule::MaxItems(max) => {
                let actual = model.item_count()?;
                (actual > *max).then(|| ModelErrorKind::MaxItems { max: *max, actual })
            }
        }
    }

    fn message(metadata: &ModelMetadata, kind: &ModelErrorKind) -> String {
        match kind {
            ModelErrorKind::Required => metadata.messages().value_is_required(metadata.display_label()),
            other => format!("{} {}", metadata.display_label(), other),
        }
    }
}

/// Characters for text, items for collections.
fn length_of(model: &Model) -> Option<usize> {
    match model {
        Model::Text(s) => Some(s.chars().count()),
        other => other.item_count(),
    }
}

impl ModelValidator for AnnotationValidator {
    fn validate(&self, ctx: &ModelValidationContext<'_>) -> Vec<ModelValidationResult> {
        match self.check(ctx.model) {
            Some(kind) => {
                let message = Self::message(ctx.metadata, &kind);
                vec![ModelValidationResult::new(ModelError::with_message(kind, message))]
            }
            None => Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Provider
// ═══════════════════════════════════════════════════════════════════════════════

/// Turns metadata annotations into validators, adding an implicit required
/// validator for required metadata without an explicit `Required`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationValidatorProvider;

impl ModelValidatorProvider for AnnotationValidatorProvider {
    fn create_validators(&self, ctx: &mut ValidatorProviderContext<'_>) {
        let metadata = ctx.metadata();

        for item in ctx.unassigned_mut() {
            let Some(annotation) = item.annotation.as_ref() else {
                continue;
            };
            match AnnotationValidator::new(annotation) {
                Ok(validator) => {
                    item.validator = Some(Arc::new(validator));
                    item.is_reusable = true;
                }
                Err(err) => {
                    warn!(
                        model_type = %metadata.model_type(),
                        error = %err,
                        "Skipping invalid validation annotation"
                    );
                }
            }
        }

        let explicit = metadata
            .annotations()
            .contains(&ValidationAnnotation::Required);
        if metadata.is_required() && !explicit {
            ctx.push(ValidatorItem::with_validator(
                Arc::new(AnnotationValidator::required()),
                true,
            ));
        }
    }
}
