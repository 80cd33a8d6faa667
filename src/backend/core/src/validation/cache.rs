//! Process-wide cache of resolved validator lists.

use super::validator::{ModelValidator, ModelValidatorProvider, ValidatorProviderContext};
use crate::metadata::{MetadataIdentity, ModelMetadata};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Ordered validators for one metadata node.
pub type ValidatorList = Arc<[Arc<dyn ModelValidator>]>;

/// Maps metadata identity to its resolved validators.
///
/// A miss computes the list outside any lock and then inserts it. Racing
/// misses compute equivalent lists. Lists containing a non-reusable validator
/// are rebuilt on every lookup.
#[derive(Default)]
pub struct ValidatorCache {
    entries: DashMap<MetadataIdentity, ValidatorList>,
}

impl ValidatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_validators(
        &self,
        metadata: &ModelMetadata,
        provider: &dyn ModelValidatorProvider,
    ) -> ValidatorList {
        if let Some(cached) = self.entries.get(metadata.identity()) {
            return cached.clone();
        }

        let mut ctx = ValidatorProviderContext::new(metadata);
        provider.create_validators(&mut ctx);
        let items = ctx.into_results();

        let reusable = items.iter().all(|item| item.is_reusable);
        let validators: ValidatorList = items.into_iter().filter_map(|item| item.validator).collect();

        trace!(
            model_type = %metadata.model_type(),
            validators = validators.len(),
            reusable,
            "Resolved validators"
        );

        if reusable {
            self.entries
                .insert(metadata.identity().clone(), validators.clone());
        }
        validators
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
