//! Invalidation plan generation.
//!
//! Folds a batch of cache events into the exact keys and patterns to delete, deduplicated
//! and expanded through the dependency graph.

use std::collections::BTreeSet;
use std::fmt;

use super::deps::DependencyGraph;
use super::events::{CacheEvent, EventKind};
use super::keys;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Item keys deleted one by one.
    pub item_keys: BTreeSet<String>,
    /// Glob patterns swept with a pattern delete.
    pub patterns: BTreeSet<String>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ items: {}, patterns: {} }}",
            self.item_keys.len(),
            self.patterns.len()
        )
    }
}

impl InvalidationPlan {
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a CacheEvent>,
        graph: &DependencyGraph,
    ) -> Self {
        let mut plan = Self::default();

        for event in events {
            let CacheEvent {
                namespace,
                tenant,
                kind,
            } = *event;

            if let Some(id) = kind.stale_item() {
                plan.item_keys.insert(keys::item_key(namespace, tenant, id));
            }
            if kind == EventKind::Purged {
                plan.patterns.insert(keys::item_pattern(namespace, tenant));
            }

            plan.patterns.insert(keys::list_pattern(namespace, tenant));
            for dependent in graph.dependents_of(namespace) {
                plan.patterns.insert(keys::list_pattern(dependent, tenant));
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.item_keys.is_empty() && self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.item_keys.len() + self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TenantId;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn update_evicts_item_and_sweeps_lists() {
        let tenant = TenantId::new(7);
        let plan = InvalidationPlan::from_events(
            &[CacheEvent::upserted("blog_post", tenant, 3)],
            &DependencyGraph::portfolio(),
        );
        assert_eq!(plan.item_keys, set(&["blog_post:7:3"]));
        assert_eq!(plan.patterns, set(&["blog_post:list:7:*"]));
    }

    #[test]
    fn create_only_sweeps_lists() {
        let plan = InvalidationPlan::from_events(
            &[CacheEvent::created("technology", TenantId::new(1), 10)],
            &DependencyGraph::portfolio(),
        );
        assert!(plan.item_keys.is_empty());
        assert_eq!(plan.patterns, set(&["technology:list:1:*"]));
    }

    #[test]
    fn milestone_changes_fan_out_to_parent_lists() {
        let plan = InvalidationPlan::from_events(
            &[CacheEvent::deleted("work_milestone", TenantId::new(2), 5)],
            &DependencyGraph::portfolio(),
        );
        assert_eq!(plan.item_keys, set(&["work_milestone:2:5"]));
        assert_eq!(
            plan.patterns,
            set(&["work_experience:list:2:*", "work_milestone:list:2:*"])
        );
    }

    #[test]
    fn batches_are_deduplicated_per_tenant() {
        let graph = DependencyGraph::portfolio();
        let events = [
            CacheEvent::upserted("project", TenantId::new(1), 4),
            CacheEvent::upserted("project", TenantId::new(1), 4),
            CacheEvent::deleted("project", TenantId::new(2), 4),
        ];
        let plan = InvalidationPlan::from_events(&events, &graph);
        assert_eq!(plan.item_keys, set(&["project:1:4", "project:2:4"]));
        assert_eq!(
            plan.patterns,
            set(&["project:list:1:*", "project:list:2:*"])
        );
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn purge_sweeps_items_and_lists() {
        let plan = InvalidationPlan::from_events(
            &[CacheEvent::purged("music_track", TenantId::new(3))],
            &DependencyGraph::portfolio(),
        );
        assert!(plan.item_keys.is_empty());
        assert_eq!(
            plan.patterns,
            set(&["music_track:3:*", "music_track:list:3:*"])
        );
    }
}
