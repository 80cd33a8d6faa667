//! Sources of raw request values.
//!
//! Keys compare case-insensitively. A prefix `p` matches the keys `p`,
//! `p.anything` and `p[anything]`; the empty prefix matches any key.

use crate::metadata::BindingSource;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Raw values found under one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueProviderResult {
    values: Vec<String>,
}

impl ValueProviderResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn single(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
        }
    }

    pub fn is_none(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values joined with commas, as shown in messages.
    pub fn joined(&self) -> String {
        self.values.join(",")
    }
}

/// Abstract source of raw request values.
pub trait ValueProvider: Send + Sync {
    /// Whether any key starts with `prefix`.
    fn contains_prefix(&self, prefix: &str) -> bool;

    /// Values stored under exactly `key`.
    fn get_value(&self, key: &str) -> ValueProviderResult;
}

impl<T: ValueProvider + ?Sized> ValueProvider for Arc<T> {
    fn contains_prefix(&self, prefix: &str) -> bool {
        (**self).contains_prefix(prefix)
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        (**self).get_value(key)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Dictionary Provider
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory value provider over a key to values map.
#[derive(Debug, Clone, Default)]
pub struct DictionaryValueProvider {
    values: BTreeMap<String, Vec<String>>,
    source: Option<BindingSource>,
}

impl DictionaryValueProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs. Repeated keys accumulate values in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut provider = Self::new();
        for (key, value) in pairs {
            provider.insert(key, value);
        }
        provider
    }

    pub fn with_source(mut self, source: BindingSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .entry(key.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    pub fn source(&self) -> Option<&BindingSource> {
        self.source.as_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ValueProvider for DictionaryValueProvider {
    fn contains_prefix(&self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return !self.values.is_empty();
        }
        let prefix = prefix.to_ascii_lowercase();
        self.values
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .any(|(key, _)| {
                let rest = &key[prefix.len()..];
                rest.is_empty() || rest.starts_with('.') || rest.starts_with('[')
            })
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(|values| ValueProviderResult::new(values.clone()))
            .unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Composite Provider
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered list of providers. The first provider holding a value wins.
#[derive(Clone, Default)]
pub struct CompositeValueProvider {
    providers: Vec<Arc<dyn ValueProvider>>,
}

impl CompositeValueProvider {
    pub fn new(providers: Vec<Arc<dyn ValueProvider>>) -> Self {
        Self { providers }
    }

    pub fn push(&mut self, provider: Arc<dyn ValueProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl ValueProvider for CompositeValueProvider {
    fn contains_prefix(&self, prefix: &str) -> bool {
        self.providers.iter().any(|p| p.contains_prefix(prefix))
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        self.providers
            .iter()
            .map(|p| p.get_value(key))
            .find(|result| !result.is_none())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for CompositeValueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeValueProvider")
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// A provider holding a single value under one key. Used to bind the
/// individual values of a repeated key.
#[derive(Debug, Clone)]
pub(crate) struct ElementalValueProvider {
    key: String,
    value: String,
}

impl ElementalValueProvider {
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl ValueProvider for ElementalValueProvider {
    fn contains_prefix(&self, prefix: &str) -> bool {
        prefix.is_empty() || crate::validation::model_state::is_key_or_subkey(&self.key, prefix)
    }

    fn get_value(&self, key: &str) -> ValueProviderResult {
        if key.eq_ignore_ascii_case(&self.key) {
            ValueProviderResult::single(self.value.clone())
        } else {
            ValueProviderResult::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_semantics() {
        let provider = DictionaryValueProvider::from_pairs([
            ("order.id", "7"),
            ("tags[0]", "a"),
            ("name", "x"),
        ]);
        assert!(provider.contains_prefix(""));
        assert!(provider.contains_prefix("order"));
        assert!(provider.contains_prefix("ORDER"));
        assert!(provider.contains_prefix("tags"));
        assert!(provider.contains_prefix("name"));
        assert!(!provider.contains_prefix("ord"));
        assert!(!provider.contains_prefix("missing"));
        assert!(!DictionaryValueProvider::new().contains_prefix(""));
    }

    #[test]
    fn test_repeated_keys_accumulate() {
        let provider = DictionaryValueProvider::from_pairs([("id", "1"), ("id", "2")]);
        let result = provider.get_value("Id");
        assert_eq!(result.values(), ["1".to_string(), "2".to_string()]);
        assert_eq!(result.first_value(), Some("1"));
        assert_eq!(result.joined(), "1,2");
        assert!(provider.get_value("other").is_none());
    }

    #[test]
    fn test_composite_first_hit_wins() {
        let route: Arc<dyn ValueProvider> =
            Arc::new(DictionaryValueProvider::from_pairs([("id", "route")]));
        let query: Arc<dyn ValueProvider> =
            Arc::new(DictionaryValueProvider::from_pairs([("id", "query"), ("q", "rust")]));
        let composite = CompositeValueProvider::new(vec![route, query]);

        assert_eq!(composite.get_value("id").first_value(), Some("route"));
        assert_eq!(composite.get_value("q").first_value(), Some("rust"));
        assert!(composite.contains_prefix("q"));
        assert!(!composite.contains_prefix("z"));
    }

    #[test]
    fn test_elemental_provider() {
        let provider = ElementalValueProvider::new("ids", "3");
        assert!(provider.contains_prefix("ids"));
        assert_eq!(provider.get_value("ids").first_value(), Some("3"));
        assert!(provider.get_value("other").is_none());
    }
}
