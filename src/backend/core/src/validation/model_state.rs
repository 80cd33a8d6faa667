//! Per-request model state: field-keyed binding and validation errors.
//!
//! Keys are model names as produced during binding (`"order"`,
//! `"order.lines[0].sku"`). The empty key holds errors that belong to the
//! request as a whole.

use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default cap on the number of errors a single request may accumulate.
pub const DEFAULT_MAX_MODEL_ERRORS: usize = 200;

// ═══════════════════════════════════════════════════════════════════════════════
// Model Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// The kind of error recorded against a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    /// A value was required but absent or null.
    Required,
    /// A binding-required value was not present in the request.
    MissingBindRequiredValue,
    /// The supplied value could not be converted.
    InvalidValue,
    /// The request body or value was not in the expected format.
    InputFormat,
    /// A binder failed for a reason other than the input format.
    BindingFailed,
    MinLength { min: usize, actual: usize },
    MaxLength { max: usize, actual: usize },
    Range { min: String, max: String, actual: String },
    InvalidEmail,
    InvalidUrl,
    Pattern { pattern: String },
    NotInSet { allowed: Vec<String> },
    MinItems { min: usize, actual: usize },
    MaxItems { max: usize, actual: usize },
    /// The error cap was reached; further errors were dropped.
    TooManyErrors { max: usize },
    Custom { code: String },
}

impl fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "field is required"),
            Self::MissingBindRequiredValue => write!(f, "a value was not provided"),
            Self::InvalidValue => write!(f, "the value is not valid"),
            Self::InputFormat => write!(f, "the input was not in a correct format"),
            Self::BindingFailed => write!(f, "the value could not be bound"),
            Self::MinLength { min, actual } => {
                write!(f, "must be at least {} characters (got {})", min, actual)
            }
            Self::MaxLength { max, actual } => {
                write!(f, "must be at most {} characters (got {})", max, actual)
            }
            Self::Range { min, max, actual } => {
                write!(f, "must be between {} and {} (got {})", min, max, actual)
            }
            Self::InvalidEmail => write!(f, "must be a valid email address"),
            Self::InvalidUrl => write!(f, "must be a valid URL"),
            Self::Pattern { pattern } => write!(f, "must match pattern: {}", pattern),
            Self::NotInSet { allowed } => write!(f, "must be one of: {}", allowed.join(", ")),
            Self::MinItems { min, actual } => {
                write!(f, "must have at least {} items (got {})", min, actual)
            }
            Self::MaxItems { max, actual } => {
                write!(f, "must have at most {} items (got {})", max, actual)
            }
            Self::TooManyErrors { max } => {
                write!(f, "the maximum number of allowed model errors ({}) has been reached", max)
            }
            Self::Custom { code } => write!(f, "validation failed: {}", code),
        }
    }
}

/// A single error recorded against a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    /// Create an error whose message is the kind's default text.
    pub fn new(kind: ModelErrorKind) -> Self {
        let message = kind.to_string();
        Self { kind, message }
    }

    pub fn with_message(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Entries
// ═══════════════════════════════════════════════════════════════════════════════

/// Validation status of a key, or aggregated over several keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelValidationState {
    #[default]
    Unvalidated,
    Invalid,
    Valid,
    Skipped,
}

/// State recorded for one key.
#[derive(Debug, Clone, Default)]
pub struct ModelStateEntry {
    /// The bound value, when the binder produced one.
    pub raw_value: Option<Model>,
    /// The raw request text the value was bound from.
    pub attempted_value: Option<String>,
    pub errors: Vec<ModelError>,
    pub validation_state: ModelValidationState,
}

impl ModelStateEntry {
    pub fn state(&self) -> ModelValidationState {
        self.validation_state
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Model State Dictionary
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulates binding and validation errors for one request.
#[derive(Debug, Clone)]
pub struct ModelStateDictionary {
    entries: BTreeMap<String, ModelStateEntry>,
    max_allowed_errors: usize,
    error_count: usize,
    has_recorded_max_error: bool,
}

impl Default for ModelStateDictionary {
    fn default() -> Self {
        Self::with_max_errors(DEFAULT_MAX_MODEL_ERRORS)
    }
}

impl ModelStateDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary that accepts at most `max` errors, the last slot
    /// being reserved for the "too many errors" marker.
    pub fn with_max_errors(max: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            max_allowed_errors: max.max(1),
            error_count: 0,
            has_recorded_max_error: false,
        }
    }

    pub fn max_allowed_errors(&self) -> usize {
        self.max_allowed_errors
    }

    /// Total errors recorded, including the "too many errors" marker.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_reached_max_errors(&self) -> bool {
        self.error_count >= self.max_allowed_errors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ModelStateEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelStateEntry)> {
        self.entries.iter()
    }

    /// Errors recorded under exactly `key`.
    pub fn errors(&self, key: &str) -> &[ModelError] {
        self.entries
            .get(key)
            .map(|e| e.errors.as_slice())
            .unwrap_or(&[])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Record an error. Returns `false` when the error cap has been reached,
    /// in which case a single "too many errors" marker is recorded under the
    /// empty key instead.
    pub fn try_add_model_error(&mut self, key: impl Into<String>, error: ModelError) -> bool {
        if self.error_count >= self.max_allowed_errors - 1 {
            self.ensure_max_errors_recorded();
            return false;
        }
        self.add_error_core(key.into(), error);
        true
    }

    /// Record an error of `kind` with `message`.
    pub fn add_model_error(
        &mut self,
        key: impl Into<String>,
        kind: ModelErrorKind,
        message: impl Into<String>,
    ) -> bool {
        self.try_add_model_error(key, ModelError::with_message(kind, message))
    }

    fn add_error_core(&mut self, key: String, error: ModelError) {
        let entry = self.entries.entry(key).or_default();
        entry.errors.push(error);
        entry.validation_state = ModelValidationState::Invalid;
        self.error_count += 1;
    }

    fn ensure_max_errors_recorded(&mut self) {
        if !self.has_recorded_max_error {
            self.has_recorded_max_error = true;
            let max = self.max_allowed_errors;
            self.add_error_core(String::new(), ModelError::new(ModelErrorKind::TooManyErrors { max }));
        }
    }

    /// Record the value bound for `key` and the raw text it came from.
    pub fn set_model_value(&mut self, key: impl Into<String>, raw_value: Model, attempted_value: Option<String>) {
        let entry = self.entries.entry(key.into()).or_default();
        entry.raw_value = Some(raw_value);
        entry.attempted_value = attempted_value;
    }

    /// Mark `key` valid. Keys that already carry errors stay invalid.
    pub fn mark_field_valid(&mut self, key: impl Into<String>) {
        let entry = self.entries.entry(key.into()).or_default();
        if entry.errors.is_empty() {
            entry.validation_state = ModelValidationState::Valid;
        }
    }

    /// Mark `key` skipped. Keys that already carry errors stay invalid.
    pub fn mark_field_skipped(&mut self, key: impl Into<String>) {
        let entry = self.entries.entry(key.into()).or_default();
        if entry.errors.is_empty() {
            entry.validation_state = ModelValidationState::Skipped;
        }
    }

    /// Mark every existing key under `prefix` skipped, without creating
    /// entries. Keys that already carry errors stay invalid.
    pub fn mark_subtree_skipped(&mut self, prefix: &str) {
        for (key, entry) in self.entries.iter_mut() {
            if is_key_or_subkey(key, prefix) && entry.errors.is_empty() {
                entry.validation_state = ModelValidationState::Skipped;
            }
        }
    }

    /// Remove errors from `prefix` and its sub-keys and reset them to
    /// `Unvalidated`.
    pub fn clear_validation_state(&mut self, prefix: &str) {
        let mut removed = 0;
        for (key, entry) in self.entries.iter_mut() {
            if is_key_or_subkey(key, prefix) {
                removed += entry.errors.len();
                entry.errors.clear();
                entry.validation_state = ModelValidationState::Unvalidated;
            }
        }
        self.error_count -= removed;
        self.has_recorded_max_error = self.errors("").iter().any(|err| {
            matches!(err.kind, ModelErrorKind::TooManyErrors { .. })
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// State recorded under exactly `key`, if any.
    pub fn validation_state(&self, key: &str) -> Option<ModelValidationState> {
        self.entries.get(key).map(ModelStateEntry::state)
    }

    /// Aggregate state of `prefix` and its sub-keys. `Unvalidated` when no
    /// such key exists.
    pub fn field_validation_state(&self, prefix: &str) -> ModelValidationState {
        let states = self
            .entries
            .iter()
            .filter(|(key, _)| is_key_or_subkey(key, prefix))
            .map(|(_, entry)| entry.state());
        aggregate(states).unwrap_or(ModelValidationState::Unvalidated)
    }

    /// True when no entry carries an error. Entries that were recorded but
    /// never validated do not make the dictionary invalid.
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(|entry| entry.errors.is_empty())
    }

    /// Field key to messages, for problem responses.
    pub fn to_message_map(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.errors.is_empty())
            .map(|(key, entry)| {
                (
                    key.clone(),
                    entry.errors.iter().map(|e| e.message.clone()).collect(),
                )
            })
            .collect()
    }
}

/// Invalid beats unvalidated beats skipped-or-valid.
fn aggregate(states: impl Iterator<Item = ModelValidationState>) -> Option<ModelValidationState> {
    let mut result = None;
    for state in states {
        result = Some(match (result, state) {
            (_, ModelValidationState::Invalid) => return Some(ModelValidationState::Invalid),
            (Some(ModelValidationState::Unvalidated), _) | (_, ModelValidationState::Unvalidated) => {
                ModelValidationState::Unvalidated
            }
            (Some(ModelValidationState::Valid), _) | (_, ModelValidationState::Valid) => {
                ModelValidationState::Valid
            }
            _ => ModelValidationState::Skipped,
        });
    }
    result
}

/// `prefix` matches itself, `prefix.x` and `prefix[i]`. The empty prefix
/// matches every key.
pub(crate) fn is_key_or_subkey(key: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match key.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}
