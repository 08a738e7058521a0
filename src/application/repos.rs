//! Repository traits describing persistence adapters.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::ListRequest;
use crate::domain::error::DomainError;
use crate::domain::schema::EntitySchema;
use crate::domain::types::{FieldValue, RecordId, TenantId};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Column assignments for an insert or update, restricted to the entity's writable
/// whitelist.
#[derive(Debug, Clone, PartialEq)]
pub struct Changeset {
    namespace: &'static str,
    values: BTreeMap<&'static str, FieldValue>,
}

impl Changeset {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            namespace: schema.namespace,
            values: BTreeMap::new(),
        }
    }

    /// Build from caller-supplied pairs, rejecting any column outside the whitelist.
    pub fn from_pairs<I, K>(schema: &'static EntitySchema, pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::new(schema), |changeset, (column, value)| {
                changeset.set(schema, column.as_ref(), value)
            })
    }

    pub fn set(
        mut self,
        schema: &'static EntitySchema,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> Result<Self, DomainError> {
        if schema.namespace != self.namespace {
            return Err(DomainError::invariant(format!(
                "changeset for `{}` cannot write `{}` columns",
                self.namespace, schema.namespace
            )));
        }
        let column = schema.writable_column(column).ok_or_else(|| {
            DomainError::validation(format!(
                "column `{column}` is not writable on `{}`",
                schema.namespace
            ))
        })?;
        self.values.insert(column, value.into());
        Ok(self)
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> + '_ {
        self.values.iter().map(|(column, value)| (*column, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
pub trait ListRepository<E>: Send + Sync {
    /// Rows inside the request window. Keyset windows return up to `limit + 1` rows.
    async fn fetch_rows(&self, request: &ListRequest) -> Result<Vec<E>, RepoError>;

    /// Total matches for the request predicates, ignoring the window and cursor.
    async fn count_rows(&self, request: &ListRequest) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ItemRepository<E>: Send + Sync {
    async fn find_by_id(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError>;

    async fn insert(&self, tenant: TenantId, changeset: &Changeset) -> Result<E, RepoError>;

    /// `None` when no row with `id` exists for `tenant`.
    async fn update(
        &self,
        tenant: TenantId,
        id: RecordId,
        changeset: &Changeset,
    ) -> Result<Option<E>, RepoError>;

    /// Returns the removed row, `None` when nothing matched.
    async fn delete(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError>;
}

/// Full persistence surface for one entity.
pub trait EntityRepository<E>: ListRepository<E> + ItemRepository<E> {}

impl<E, T> EntityRepository<E> for T where T: ListRepository<E> + ItemRepository<E> + ?Sized {}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
