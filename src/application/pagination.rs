//! Pagination strategy selection and page envelope shaping.
//!
//! Keyset ("cursor") pagination walks the primary key downwards and never counts. Offset
//! pagination supports any whitelisted order and pairs each page with an exact total.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::application::query::{QueryDescriptor, Sort};
use crate::domain::schema::{Entity, EntitySchema};
use crate::domain::types::{FieldValue, RecordId, SortDirection, TenantId};

/// How a page is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    Cursor { before: RecordId },
    Offset { offset: u64 },
}

/// True when the requested order can be served by a descending primary key walk.
pub fn is_cursor_compatible(schema: &EntitySchema, sort: Option<&Sort>) -> bool {
    match sort {
        None => true,
        Some(sort) => {
            schema.is_primary_key(sort.column) && sort.direction == SortDirection::Desc
        }
    }
}

/// Cursor mode needs both a cursor and a compatible order; anything else falls back to
/// offset mode and the cursor is ignored.
pub fn select_mode(schema: &EntitySchema, descriptor: &QueryDescriptor) -> PaginationMode {
    match descriptor.cursor {
        Some(before) if is_cursor_compatible(schema, descriptor.sort.as_ref()) => {
            PaginationMode::Cursor { before }
        }
        _ => PaginationMode::Offset {
            offset: descriptor.offset,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

/// Row window of a list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Offset { offset: u64, limit: u32 },
    Keyset { before: RecordId, limit: u32 },
}

impl Window {
    pub fn limit(&self) -> u32 {
        match self {
            Window::Offset { limit, .. } | Window::Keyset { limit, .. } => *limit,
        }
    }

    /// Keyset pages over-fetch one row to learn whether another page exists.
    pub fn fetch_limit(&self) -> u32 {
        match self {
            Window::Offset { limit, .. } => *limit,
            Window::Keyset { limit, .. } => limit.saturating_add(1),
        }
    }

    pub fn needs_count(&self) -> bool {
        matches!(self, Window::Offset { .. })
    }
}

/// Fully resolved repository request. Every column name in here comes from a schema
/// whitelist.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub tenant: TenantId,
    pub filters: Vec<(&'static str, FieldValue)>,
    pub search: Option<(&'static str, String)>,
    pub order: OrderBy,
    pub window: Window,
}

impl ListRequest {
    pub fn plan(schema: &'static EntitySchema, descriptor: &QueryDescriptor) -> Self {
        let search = match (schema.search_column, descriptor.search.as_ref()) {
            (Some(column), Some(term)) => Some((column, term.clone())),
            _ => None,
        };

        let filters = descriptor
            .filters
            .iter()
            .map(|(name, value)| (*name, value.clone()))
            .collect();

        let (order, window) = match select_mode(schema, descriptor) {
            PaginationMode::Cursor { before } => (
                OrderBy {
                    column: schema.primary_key,
                    direction: SortDirection::Desc,
                },
                Window::Keyset {
                    before,
                    limit: descriptor.limit,
                },
            ),
            PaginationMode::Offset { offset } => {
                let order = descriptor
                    .sort
                    .map(|sort| OrderBy {
                        column: sort.column,
                        direction: sort.direction,
                    })
                    .unwrap_or(OrderBy {
                        column: schema.primary_key,
                        direction: SortDirection::Desc,
                    });
                (
                    order,
                    Window::Offset {
                        offset,
                        limit: descriptor.limit,
                    },
                )
            }
        };

        Self {
            tenant: descriptor.tenant,
            filters,
            search,
            order,
            window,
        }
    }

    pub fn mode(&self) -> PaginationMode {
        match self.window {
            Window::Keyset { before, .. } => PaginationMode::Cursor { before },
            Window::Offset { offset, .. } => PaginationMode::Offset { offset },
        }
    }
}

/// Total match count, or an explicit marker that it was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Count {
    Exact(u64),
    #[default]
    NotComputed,
}

impl Count {
    pub fn is_not_computed(&self) -> bool {
        matches!(self, Count::NotComputed)
    }

    pub fn exact(&self) -> Option<u64> {
        match self {
            Count::Exact(total) => Some(*total),
            Count::NotComputed => None,
        }
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Count::Exact(total) => serializer.serialize_u64(*total),
            Count::NotComputed => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?
            .map(Count::Exact)
            .unwrap_or(Count::NotComputed))
    }
}

/// Link to an adjacent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageToken {
    Cursor(RecordId),
    Offset(u64),
}

/// Page of results returned by every list operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Count::is_not_computed")]
    pub count: Count,
    pub next: Option<PageToken>,
    pub previous: Option<PageToken>,
}

impl<T> PageEnvelope<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            count: Count::NotComputed,
            next: None,
            previous: None,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Shape fetched rows into an envelope according to the request window.
pub fn shape_page<E: Entity>(
    request: &ListRequest,
    mut rows: Vec<E>,
    total: Option<u64>,
) -> PageEnvelope<E> {
    match request.window {
        Window::Keyset { limit, .. } => {
            let limit = limit as usize;
            let has_more = rows.len() > limit;
            rows.truncate(limit);
            let next = if has_more {
                rows.last().map(|row| PageToken::Cursor(row.id()))
            } else {
                None
            };
            PageEnvelope {
                results: rows,
                count: Count::NotComputed,
                next,
                previous: None,
            }
        }
        Window::Offset { offset, limit } => {
            rows.truncate(limit as usize);
            let limit = u64::from(limit);
            let count = total.map(Count::Exact).unwrap_or(Count::NotComputed);
            let next = match total {
                Some(total) if offset.saturating_add(limit) < total => {
                    Some(PageToken::Offset(offset + limit))
                }
                _ => None,
            };
            let previous = (offset > 0).then(|| PageToken::Offset(offset.saturating_sub(limit)));
            PageEnvelope {
                results: rows,
                count,
                next,
                previous,
            }
        }
    }
}
