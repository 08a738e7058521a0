//! Filter normalisation: raw list parameters into a canonical [`QueryDescriptor`].
//!
//! Normalisation never fails. Malformed numbers, unknown sort columns and undeclared filter
//! keys are dropped so a list request always resolves to a valid query.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::application::pagination::{PaginationMode, is_cursor_compatible, select_mode};
use crate::domain::schema::EntitySchema;
use crate::domain::types::{FieldValue, RecordId, SortDirection, TenantId};

pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_OFFSET: &str = "offset";
pub const PARAM_CURSOR: &str = "cursor";
pub const PARAM_SEARCH: &str = "search";
pub const PARAM_SORT_BY: &str = "sortBy";
pub const PARAM_SORT_DIR: &str = "sortDir";

pub const DEFAULT_LIMIT: u32 = 20;
pub const DEFAULT_MAX_LIMIT: u32 = 100;

/// Raw list-request parameters as received from the transport.
pub type RawQuery = HashMap<String, String>;

/// Page size bounds applied to every list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationLimits {
    default_limit: u32,
    max_limit: u32,
}

impl PaginationLimits {
    /// `max_limit` wins when the two disagree; both are at least one.
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        Self {
            default_limit: default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    pub fn max_limit(&self) -> u32 {
        self.max_limit
    }

    pub fn clamp(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_limit)
    }
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_MAX_LIMIT)
    }
}

/// Whitelisted single-column ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sort {
    #[serde(rename = "by")]
    pub column: &'static str,
    #[serde(rename = "dir")]
    pub direction: SortDirection,
}

/// Canonical list query.
///
/// The serialised form doubles as the list cache fingerprint, so field order and
/// filter ordering are deterministic. The tenant is carried in the cache key itself and is
/// therefore not serialised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    #[serde(skip)]
    pub tenant: TenantId,
    pub limit: u32,
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<RecordId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<&'static str, FieldValue>,
}

impl QueryDescriptor {
    /// Unfiltered first page in default order.
    pub fn first_page(tenant: TenantId, limit: u32) -> Self {
        Self {
            tenant,
            limit,
            offset: 0,
            cursor: None,
            sort: None,
            search: None,
            filters: BTreeMap::new(),
        }
    }

    /// Pure pagination and sorting. Only clean queries are cached.
    pub fn is_clean(&self) -> bool {
        self.search.is_none() && self.filters.is_empty()
    }

    /// Cache fingerprint of the page this descriptor selects.
    ///
    /// Fields the selected mode ignores are cleared first: the offset in cursor mode, the
    /// cursor in offset mode, and a sort that spells out the default `id DESC` order.
    pub fn fingerprint(&self, schema: &EntitySchema) -> Result<String, serde_json::Error> {
        let mut canonical = self.clone();
        if canonical.sort.is_some() && is_cursor_compatible(schema, canonical.sort.as_ref()) {
            canonical.sort = None;
        }
        match select_mode(schema, &canonical) {
            PaginationMode::Cursor { .. } => canonical.offset = 0,
            PaginationMode::Offset { .. } => canonical.cursor = None,
        }
        serde_json::to_string(&canonical)
    }
}

/// Turns raw parameters into descriptors for one configured set of limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterNormalizer {
    limits: PaginationLimits,
}

impl FilterNormalizer {
    pub fn new(limits: PaginationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> PaginationLimits {
        self.limits
    }

    /// The tenant comes from the caller's context only; a `tenant_id` parameter is ignored.
    pub fn normalize(
        &self,
        schema: &'static EntitySchema,
        tenant: TenantId,
        raw: &RawQuery,
    ) -> QueryDescriptor {
        let param = |name: &str| {
            raw.get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let limit = param(PARAM_LIMIT)
            .and_then(parse_limit)
            .map(|value| self.limits.clamp(value))
            .unwrap_or(self.limits.default_limit());

        let offset = param(PARAM_OFFSET)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);

        let cursor = param(PARAM_CURSOR)
            .and_then(|value| value.parse::<RecordId>().ok())
            .filter(|id| *id > 0);

        let sort = param(PARAM_SORT_BY)
            .and_then(|value| schema.sortable_column(value))
            .map(|column| Sort {
                column,
                direction: param(PARAM_SORT_DIR)
                    .and_then(|value| value.parse().ok())
                    .unwrap_or_default(),
            });

        let search = schema
            .search_column
            .and(param(PARAM_SEARCH))
            .map(str::to_string);

        let filters = schema
            .filters
            .iter()
            .filter_map(|field| {
                let value = field.kind.coerce(raw.get(field.name)?)?;
                Some((field.name, value))
            })
            .collect();

        QueryDescriptor {
            tenant,
            limit,
            offset,
            cursor,
            sort,
            search,
            filters,
        }
    }
}

/// Unsigned decimal, saturating at `u32::MAX` so oversized limits still clamp to the maximum.
fn parse_limit(raw: &str) -> Option<u32> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{BlogPost, Technology};
    use crate::domain::schema::Entity;

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn normalize(pairs: &[(&str, &str)]) -> QueryDescriptor {
        FilterNormalizer::default().normalize(BlogPost::SCHEMA, TenantId::new(7), &raw(pairs))
    }

    #[test]
    fn empty_request_uses_defaults() {
        let descriptor = normalize(&[]);
        assert_eq!(descriptor, QueryDescriptor::first_page(TenantId::new(7), 20));
        assert!(descriptor.is_clean());
    }

    #[test]
    fn limit_is_clamped_to_configured_bounds() {
        assert_eq!(normalize(&[("limit", "1000")]).limit, 100);
        assert_eq!(normalize(&[("limit", "5000000000")]).limit, 100);
        assert_eq!(
            normalize(&[("limit", "123456789012345678901234567890")]).limit,
            100
        );
        assert_eq!(normalize(&[("limit", "+7")]).limit, 7);
        assert_eq!(normalize(&[("limit", "0")]).limit, 1);
        assert_eq!(normalize(&[("limit", "-5")]).limit, 20);
        assert_eq!(normalize(&[("limit", "ten")]).limit, 20);
        assert_eq!(normalize(&[("limit", "12.5")]).limit, 20);
    }

    #[test]
    fn malformed_numbers_are_dropped() {
        let descriptor = normalize(&[("offset", "abc"), ("cursor", "-3")]);
        assert_eq!(descriptor.offset, 0);
        assert_eq!(descriptor.cursor, None);

        let descriptor = normalize(&[("cursor", "not-an-id")]);
        assert_eq!(descriptor.cursor, None);
    }

    #[test]
    fn sort_columns_are_whitelisted() {
        let descriptor = normalize(&[("sortBy", "title"), ("sortDir", "asc")]);
        assert_eq!(
            descriptor.sort,
            Some(Sort {
                column: "title",
                direction: SortDirection::Asc,
            })
        );

        assert_eq!(normalize(&[("sortBy", "password")]).sort, None);
        assert_eq!(normalize(&[("sortDir", "ASC")]).sort, None);
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        let descriptor = normalize(&[("sortBy", "created_at"), ("sortDir", "sideways")]);
        assert_eq!(
            descriptor.sort.map(|sort| sort.direction),
            Some(SortDirection::Desc)
        );
    }

    #[test]
    fn declared_filters_are_coerced_and_unknown_keys_ignored() {
        let descriptor = normalize(&[
            ("category_id", "3"),
            ("is_published", "true"),
            ("language", "en"),
            ("tenant_id", "99"),
            ("author", "someone"),
        ]);
        assert_eq!(descriptor.tenant, TenantId::new(7));
        assert_eq!(descriptor.filters.len(), 3);
        assert_eq!(descriptor.filters["category_id"], FieldValue::Int(3));
        assert_eq!(descriptor.filters["is_published"], FieldValue::Bool(true));
        assert!(!descriptor.is_clean());
    }

    #[test]
    fn malformed_filter_values_are_dropped() {
        let descriptor = normalize(&[("category_id", "three"), ("is_published", "maybe")]);
        assert!(descriptor.filters.is_empty());
        assert!(descriptor.is_clean());
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(normalize(&[("search", "   ")]).search, None);
        let descriptor = normalize(&[("search", " rust ")]);
        assert_eq!(descriptor.search.as_deref(), Some("rust"));
        assert!(!descriptor.is_clean());
    }

    #[test]
    fn fingerprint_is_deterministic_and_tenant_free() {
        let first = FilterNormalizer::default().normalize(
            Technology::SCHEMA,
            TenantId::new(1),
            &raw(&[("limit", "5"), ("sortBy", "name"), ("sortDir", "ASC")]),
        );
        let second = FilterNormalizer::default().normalize(
            Technology::SCHEMA,
            TenantId::new(2),
            &raw(&[("sortDir", "asc"), ("sortBy", "NAME"), ("limit", "5")]),
        );
        let fingerprint = first.fingerprint(Technology::SCHEMA).expect("fingerprint");
        assert_eq!(
            fingerprint,
            second.fingerprint(Technology::SCHEMA).expect("fingerprint")
        );
        assert_eq!(
            fingerprint,
            r#"{"limit":5,"offset":0,"sort":{"by":"name","dir":"ASC"}}"#
        );
    }

    #[test]
    fn fingerprint_ignores_fields_the_selected_mode_drops() {
        let fingerprint = |pairs: &[(&str, &str)]| {
            normalize(pairs)
                .fingerprint(BlogPost::SCHEMA)
                .expect("fingerprint")
        };

        // cursor mode: offset is irrelevant
        assert_eq!(
            fingerprint(&[("cursor", "16"), ("offset", "30")]),
            fingerprint(&[("cursor", "16")])
        );
        // incompatible sort: cursor is irrelevant
        assert_eq!(
            fingerprint(&[("sortBy", "title"), ("cursor", "16"), ("offset", "10")]),
            fingerprint(&[("sortBy", "title"), ("offset", "10")])
        );
        // explicit default order
        assert_eq!(
            fingerprint(&[("sortBy", "id"), ("sortDir", "desc")]),
            fingerprint(&[])
        );
        assert_ne!(
            fingerprint(&[("sortBy", "id"), ("sortDir", "asc")]),
            fingerprint(&[])
        );
        assert_ne!(fingerprint(&[("cursor", "16")]), fingerprint(&[("cursor", "6")]));
    }

    #[test]
    fn limits_keep_default_within_maximum() {
        let limits = PaginationLimits::new(50, 10);
        assert_eq!(limits.default_limit(), 10);
        assert_eq!(limits.max_limit(), 10);
        assert_eq!(PaginationLimits::new(0, 0).max_limit(), 1);
    }
}
