//! Cache events published by write operations.

use std::fmt;

use crate::domain::types::{RecordId, TenantId};

/// What happened to the rows of one entity for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A row was inserted. No item key can be cached for it yet.
    Created { id: RecordId },
    /// A row was updated in place.
    Upserted { id: RecordId },
    /// A row was removed.
    Deleted { id: RecordId },
    /// Cached state of the tenant is suspect as a whole (operator purge).
    Purged,
}

impl EventKind {
    /// Item key that must be evicted, if any.
    pub fn stale_item(&self) -> Option<RecordId> {
        match self {
            EventKind::Upserted { id } | EventKind::Deleted { id } => Some(*id),
            EventKind::Created { .. } | EventKind::Purged => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheEvent {
    pub namespace: &'static str,
    pub tenant: TenantId,
    pub kind: EventKind,
}

impl CacheEvent {
    pub fn new(namespace: &'static str, tenant: TenantId, kind: EventKind) -> Self {
        Self {
            namespace,
            tenant,
            kind,
        }
    }

    pub fn created(namespace: &'static str, tenant: TenantId, id: RecordId) -> Self {
        Self::new(namespace, tenant, EventKind::Created { id })
    }

    pub fn upserted(namespace: &'static str, tenant: TenantId, id: RecordId) -> Self {
        Self::new(namespace, tenant, EventKind::Upserted { id })
    }

    pub fn deleted(namespace: &'static str, tenant: TenantId, id: RecordId) -> Self {
        Self::new(namespace, tenant, EventKind::Deleted { id })
    }

    pub fn purged(namespace: &'static str, tenant: TenantId) -> Self {
        Self::new(namespace, tenant, EventKind::Purged)
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Created { id } => write!(f, "{}#{id} created", self.namespace)?,
            EventKind::Upserted { id } => write!(f, "{}#{id} updated", self.namespace)?,
            EventKind::Deleted { id } => write!(f, "{}#{id} deleted", self.namespace)?,
            EventKind::Purged => write!(f, "{} purged", self.namespace)?,
        }
        write!(f, " for tenant {}", self.tenant)
    }
}
