//! Conventions applied to action descriptors at startup.

use super::{ActionFilter, AutoValidateModelFilter};
use crate::binding::ActionDescriptor;
use crate::config::BindingOptions;
use std::sync::Arc;
use tracing::debug;

/// A startup pass over action descriptors.
///
/// Conventions run in ascending [`order`](Self::order); equal orders keep
/// their registration order.
pub trait ActionConvention: Send + Sync {
    fn order(&self) -> i32 {
        0
    }

    fn apply(&self, action: &mut ActionDescriptor);
}

/// Apply `conventions` to `action` in order.
pub fn apply_conventions(conventions: &[&dyn ActionConvention], action: &mut ActionDescriptor) {
    let mut ordered = conventions.to_vec();
    ordered.sort_by_key(|convention| convention.order());
    for convention in ordered {
        convention.apply(action);
    }
}

/// Adds API behaviors to actions marked as API endpoints.
///
/// Currently this attaches one shared [`AutoValidateModelFilter`] to every
/// API action that does not already carry it, unless
/// `suppress_auto_validation` is set.
#[derive(Debug, Clone)]
pub struct ApiBehaviorConvention {
    filter: Arc<AutoValidateModelFilter>,
    suppress_auto_validation: bool,
}

impl ApiBehaviorConvention {
    pub const ORDER: i32 = -1000 + 10;

    pub fn new(options: &BindingOptions) -> Self {
        Self {
            filter: Arc::new(AutoValidateModelFilter::new()),
            suppress_auto_validation: options.suppress_auto_validation,
        }
    }

    /// Use `filter` instead of a default auto-validate filter.
    pub fn with_filter(mut self, filter: Arc<AutoValidateModelFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn apply_all<'a>(&self, actions: impl IntoIterator<Item = &'a mut ActionDescriptor>) {
        for action in actions {
            self.apply(action);
        }
    }
}

impl ActionConvention for ApiBehaviorConvention {
    fn order(&self) -> i32 {
        Self::ORDER
    }

    fn apply(&self, action: &mut ActionDescriptor) {
        if !action.is_api_action() || self.suppress_auto_validation {
            return;
        }
        let name = self.filter.filter_name();
        if action.filters().iter().any(|f| f.filter_name() == name) {
            return;
        }
        debug!(action = %action.id(), "Attaching auto-validate filter");
        action.add_filter(self.filter.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_attaches_to_api_actions_only() {
        let convention = ApiBehaviorConvention::new(&BindingOptions::default());
        let mut api = ActionDescriptor::new("a", vec![]).api();
        let mut page = ActionDescriptor::new("b", vec![]);

        convention.apply_all([&mut api, &mut page]);
        assert_eq!(api.filters().len(), 1);
        assert_eq!(api.filters()[0].order(), AutoValidateModelFilter::ORDER);
        assert!(page.filters().is_empty());
    }

    #[test]
    fn test_applying_twice_adds_one_filter() {
        let convention = ApiBehaviorConvention::new(&BindingOptions::default());
        let mut action = ActionDescriptor::new("a", vec![]).api();
        convention.apply(&mut action);
        convention.apply(&mut action);
        assert_eq!(action.filters().len(), 1);
    }

    #[test]
    fn test_suppressed() {
        let options = BindingOptions {
            suppress_auto_validation: true,
            ..BindingOptions::default()
        };
        let mut action = ActionDescriptor::new("a", vec![]).api();
        ApiBehaviorConvention::new(&options).apply(&mut action);
        assert!(action.filters().is_empty());
    }

    /// Appends its tag to a shared log.
    struct Tagging {
        tag: &'static str,
        order: i32,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ActionConvention for Tagging {
        fn order(&self) -> i32 {
            self.order
        }

        fn apply(&self, _action: &mut ActionDescriptor) {
            self.log.lock().push(self.tag);
        }
    }

    #[test]
    fn test_conventions_apply_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = Tagging { tag: "late", order: 0, log: log.clone() };
        let tie = Tagging { tag: "tie", order: 0, log: log.clone() };
        let early = Tagging { tag: "early", order: -2000, log: log.clone() };
        let api = ApiBehaviorConvention::new(&BindingOptions::default());
        let mut action = ActionDescriptor::new("a", vec![]).api();

        apply_conventions(&[&late, &api, &tie, &early], &mut action);

        assert_eq!(*log.lock(), vec!["early", "late", "tie"]);
        assert_eq!(api.order(), -990);
        assert_eq!(action.filters().len(), 1);
    }
}
