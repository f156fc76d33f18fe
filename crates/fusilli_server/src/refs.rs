//! Reverse reference index over the component graph.
//!
//! For every identifier `x`, tracks the set of components whose values embed
//! a reference to `x`. The scene engine consults this index before removing
//! anything from the registry: a component with a non-empty incoming set is
//! deferred instead of deleted.

use std::collections::{HashMap, HashSet};

use fusilli_types::{AnyId, Component, VisitRefs};

/// Maps each referenced identifier to the set of components referring to it.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    incoming: HashMap<AnyId, HashSet<AnyId>>,
}

impl ReferenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every reference embedded in `component` as coming from
    /// `referrer`.
    pub fn add(&mut self, referrer: AnyId, component: &Component) {
        let incoming = &mut self.incoming;
        component.visit_refs(&mut |target| {
            incoming.entry(target).or_default().insert(referrer);
        });
    }

    /// Remove every reference embedded in `component` as coming from
    /// `referrer`. The inverse of [`add`](Self::add) over the same value.
    pub fn remove(&mut self, referrer: AnyId, component: &Component) {
        let incoming = &mut self.incoming;
        component.visit_refs(&mut |target| {
            let emptied = if let Some(referrers) = incoming.get_mut(&target) {
                referrers.remove(&referrer);
                referrers.is_empty()
            } else {
                false
            };
            if emptied {
                incoming.remove(&target);
            }
        });
    }

    /// The components currently referring to `id`, if any.
    #[must_use]
    pub fn incoming(&self, id: AnyId) -> Option<&HashSet<AnyId>> {
        self.incoming.get(&id)
    }

    /// Whether any live component refers to `id`.
    #[must_use]
    pub fn is_referenced(&self, id: AnyId) -> bool {
        self.incoming.get(&id).is_some_and(|set| !set.is_empty())
    }
}
