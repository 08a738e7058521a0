//! Cross-entity cache dependencies.
//!
//! Some entities are rendered inside another entity's listing (a milestone appears inside
//! its work experience). An edge `child -> parent` means a change to `child` must also sweep
//! the list caches of `parent`. Edges are followed transitively.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    parents: BTreeMap<&'static str, BTreeSet<&'static str>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies between the portfolio entities.
    pub fn portfolio() -> Self {
        Self::new().with_edge("work_milestone", "work_experience")
    }

    pub fn with_edge(mut self, child: &'static str, parent: &'static str) -> Self {
        self.add_edge(child, parent);
        self
    }

    pub fn add_edge(&mut self, child: &'static str, parent: &'static str) {
        if child != parent {
            self.parents.entry(child).or_default().insert(parent);
        }
    }

    pub fn direct_parents(&self, child: &str) -> impl Iterator<Item = &'static str> + '_ {
        self.parents.get(child).into_iter().flatten().copied()
    }

    /// Every namespace whose lists render `namespace`, directly or transitively. Never
    /// includes `namespace` itself, even when the graph contains a cycle.
    pub fn dependents_of(&self, namespace: &str) -> BTreeSet<&'static str> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&'static str> = self.direct_parents(namespace).collect();

        while let Some(next) = pending.pop() {
            if next == namespace || !seen.insert(next) {
                continue;
            }
            pending.extend(self.direct_parents(next));
        }

        seen
    }

    pub fn edges(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.parents
            .iter()
            .flat_map(|(child, parents)| parents.iter().map(move |parent| (*child, *parent)))
    }
}
