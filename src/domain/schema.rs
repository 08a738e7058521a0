//! Static per-entity declarations consulted by the query, cache and persistence layers.
//!
//! An [`EntitySchema`] is the single place where an entity declares which columns may be
//! sorted, searched, filtered and written. Anything not listed here never reaches SQL.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{FieldKind, RecordId, TenantId};

/// Volatility class of a cached entry; durations come from cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlTier {
    /// Frequently mutated listings (about a minute).
    Short,
    /// Item reads and moderately volatile listings (about an hour).
    Medium,
    /// Near-static reference listings (about a day).
    Long,
}

/// Scalar column accepted as an equality filter on list requests.
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FilterField {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug)]
pub struct EntitySchema {
    /// Cache key namespace, e.g. `blog_post`.
    pub namespace: &'static str,
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Projection used by every read and `RETURNING` clause.
    pub columns: &'static [&'static str],
    pub sortable: &'static [&'static str],
    /// Text column matched case-insensitively by `search`.
    pub search_column: Option<&'static str>,
    pub filters: &'static [FilterField],
    pub writable: &'static [&'static str],
    pub list_ttl: TtlTier,
    pub item_ttl: TtlTier,
}

impl EntitySchema {
    /// Resolve a requested sort column against the whitelist.
    pub fn sortable_column(&self, requested: &str) -> Option<&'static str> {
        self.sortable
            .iter()
            .copied()
            .find(|column| column.eq_ignore_ascii_case(requested.trim()))
    }

    pub fn filter(&self, name: &str) -> Option<&'static FilterField> {
        self.filters.iter().find(|field| field.name == name)
    }

    pub fn writable_column(&self, name: &str) -> Option<&'static str> {
        self.writable.iter().copied().find(|column| *column == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key == column
    }
}

/// A tenant-scoped record managed by the pagination and caching engine.
pub trait Entity: Clone + Send + Sync + Unpin + Serialize + DeserializeOwned + 'static {
    const SCHEMA: &'static EntitySchema;

    fn id(&self) -> RecordId;

    fn tenant_id(&self) -> TenantId;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{BlogPost, WorkMilestone};

    #[test]
    fn sortable_lookup_is_whitelisted() {
        let schema = BlogPost::SCHEMA;
        assert_eq!(schema.sortable_column("title"), Some("title"));
        assert_eq!(schema.sortable_column(" TITLE "), Some("title"));
        assert_eq!(schema.sortable_column("title; DROP TABLE blog_posts"), None);
        assert_eq!(schema.sortable_column("tenant_id"), None);
    }

    #[test]
    fn tenant_column_is_never_a_filter_or_writable() {
        for schema in crate::domain::entities::ALL_SCHEMAS {
            assert!(schema.filter("tenant_id").is_none(), "{}", schema.namespace);
            assert!(
                schema.writable_column("tenant_id").is_none(),
                "{}",
                schema.namespace
            );
            assert!(
                schema.writable_column(schema.primary_key).is_none(),
                "{}",
                schema.namespace
            );
        }
    }

    #[test]
    fn milestones_filter_by_parent_experience() {
        let field = WorkMilestone::SCHEMA
            .filter("work_experience_id")
            .expect("declared filter");
        assert_eq!(field.kind, FieldKind::Int);
    }
}
