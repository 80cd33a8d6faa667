//! Per-object validation overrides recorded during binding.

use crate::metadata::ModelMetadata;
use crate::model::{Model, ModelIdentity, ObjectRef};
use std::collections::HashMap;
use std::sync::Arc;

/// How the visitor should treat one object.
#[derive(Debug, Clone, Default)]
pub struct ValidationStateEntry {
    /// Model-state key to use instead of the computed one.
    pub key: Option<String>,
    /// Metadata to validate with instead of the declared one.
    pub metadata: Option<Arc<ModelMetadata>>,
    /// Skip validation of the object and everything below it.
    pub suppress_validation: bool,
}

impl ValidationStateEntry {
    pub fn suppressed() -> Self {
        Self {
            suppress_validation: true,
            ..Self::default()
        }
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }
}

/// Object identity to validation entry.
///
/// Each entry holds the object it was recorded for, so an identity cannot be
/// reused by another allocation while the dictionary is alive.
#[derive(Debug, Clone, Default)]
pub struct ValidationStateDictionary {
    entries: HashMap<ModelIdentity, (ObjectRef, ValidationStateEntry)>,
}

impl ValidationStateDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: &ObjectRef, entry: ValidationStateEntry) {
        self.entries.insert(object.identity(), (object.clone(), entry));
    }

    /// The entry recorded for `model`, when it is that exact object.
    pub fn get(&self, model: &Model) -> Option<&ValidationStateEntry> {
        let object = model.as_object()?;
        self.entries
            .get(&object.identity())
            .filter(|(recorded, _)| recorded.ptr_eq(object))
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_matches_only_its_object() {
        let recorded = ObjectRef::new();
        let other = ObjectRef::new();
        let mut state = ValidationStateDictionary::new();
        state.insert(&recorded, ValidationStateEntry::suppressed());

        assert!(state
            .get(&Model::Object(recorded.clone()))
            .is_some_and(|e| e.suppress_validation));
        assert!(state.get(&Model::Object(other)).is_none());
        assert!(state.get(&Model::Null).is_none());
    }

    #[test]
    fn test_dropped_temporary_does_not_leak_override() {
        let mut state = ValidationStateDictionary::new();
        for _ in 0..32 {
            let temporary = ObjectRef::new();
            state.insert(&temporary, ValidationStateEntry::suppressed());
        }

        // Every recorded object is still owned by the dictionary, so fresh
        // allocations never share an identity with a recorded one.
        for _ in 0..32 {
            let fresh = ObjectRef::new();
            assert!(state.get(&Model::Object(fresh)).is_none());
        }
        assert_eq!(state.len(), 32);
    }
}
