//! Message templates for binding errors.

use std::fmt;
use std::sync::Arc;

/// Template taking one argument.
pub type MessageAccessor = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Template taking two arguments.
pub type MessageAccessor2 = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Produces the user-facing messages the binding pipeline writes into model
/// state. Every template can be replaced.
#[derive(Clone)]
pub struct ModelBindingMessageProvider {
    missing_bind_required_value: MessageAccessor,
    value_must_not_be_null: MessageAccessor,
    attempted_value_is_invalid: MessageAccessor2,
    value_is_required: MessageAccessor,
}

impl ModelBindingMessageProvider {
    /// Message for a binding-required value that was not supplied.
    /// Argument: field name.
    pub fn missing_bind_required_value(&self, field_name: &str) -> String {
        (self.missing_bind_required_value)(field_name)
    }

    /// Message for an empty value bound to a non-nullable type.
    /// Argument: attempted value.
    pub fn value_must_not_be_null(&self, attempted: &str) -> String {
        (self.value_must_not_be_null)(attempted)
    }

    /// Message for a value that could not be converted.
    /// Arguments: attempted value, field display name.
    pub fn attempted_value_is_invalid(&self, attempted: &str, field: &str) -> String {
        (self.attempted_value_is_invalid)(attempted, field)
    }

    /// Message for a required value that is absent.
    /// Argument: field display name.
    pub fn value_is_required(&self, field: &str) -> String {
        (self.value_is_required)(field)
    }

    pub fn with_missing_bind_required_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.missing_bind_required_value = Arc::new(f);
        self
    }

    pub fn with_value_must_not_be_null<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.value_must_not_be_null = Arc::new(f);
        self
    }

    pub fn with_attempted_value_is_invalid<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.attempted_value_is_invalid = Arc::new(f);
        self
    }

    pub fn with_value_is_required<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.value_is_required = Arc::new(f);
        self
    }
}

impl Default for ModelBindingMessageProvider {
    fn default() -> Self {
        Self {
            missing_bind_required_value: Arc::new(|field| {
                format!("A value for the '{}' parameter or property was not provided.", field)
            }),
            value_must_not_be_null: Arc::new(|value| format!("The value '{}' is invalid.", value)),
            attempted_value_is_invalid: Arc::new(|value, field| {
                format!("The value '{}' is not valid for {}.", value, field)
            }),
            value_is_required: Arc::new(|field| format!("The {} field is required.", field)),
        }
    }
}

impl fmt::Debug for ModelBindingMessageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBindingMessageProvider").finish_non_exhaustive()
    }
}
