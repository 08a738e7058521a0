//! Generic single-row reads and writes. Every statement is tenant-scoped and returns the
//! full row projection.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;

use crate::application::repos::{Changeset, ItemRepository, RepoError};
use crate::domain::schema::{Entity, EntitySchema};
use crate::domain::types::{RecordId, TenantId};

use super::PostgresRepositories;
use super::list::TENANT_COLUMN;
use super::util::{map_sqlx_error, push_value};

pub fn find_query(
    schema: &EntitySchema,
    tenant: TenantId,
    id: RecordId,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(schema.columns.join(", "));
    qb.push(" FROM ");
    qb.push(schema.table);
    push_row_predicate(&mut qb, schema, tenant, id);
    qb
}

pub fn insert_query(
    schema: &EntitySchema,
    tenant: TenantId,
    changeset: &Changeset,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO ");
    qb.push(schema.table);
    qb.push(" (");
    qb.push(TENANT_COLUMN);
    for (column, _) in changeset.iter() {
        qb.push(", ");
        qb.push(column);
    }
    qb.push(") VALUES (");
    qb.push_bind(tenant);
    for (_, value) in changeset.iter() {
        qb.push(", ");
        push_value(&mut qb, value);
    }
    qb.push(")");
    push_returning(&mut qb, schema);
    qb
}

pub fn update_query(
    schema: &EntitySchema,
    tenant: TenantId,
    id: RecordId,
    changeset: &Changeset,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE ");
    qb.push(schema.table);
    qb.push(" SET ");
    for (column, value) in changeset.iter() {
        qb.push(column);
        qb.push(" = ");
        push_value(&mut qb, value);
        qb.push(", ");
    }
    qb.push("updated_at = NOW()");
    push_row_predicate(&mut qb, schema, tenant, id);
    push_returning(&mut qb, schema);
    qb
}

pub fn delete_query(
    schema: &EntitySchema,
    tenant: TenantId,
    id: RecordId,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("DELETE FROM ");
    qb.push(schema.table);
    push_row_predicate(&mut qb, schema, tenant, id);
    push_returning(&mut qb, schema);
    qb
}

fn push_row_predicate(
    qb: &mut QueryBuilder<'static, Postgres>,
    schema: &EntitySchema,
    tenant: TenantId,
    id: RecordId,
) {
    qb.push(" WHERE ");
    qb.push(TENANT_COLUMN);
    qb.push(" = ");
    qb.push_bind(tenant);
    qb.push(" AND ");
    qb.push(schema.primary_key);
    qb.push(" = ");
    qb.push_bind(id);
}

fn push_returning(qb: &mut QueryBuilder<'static, Postgres>, schema: &EntitySchema) {
    qb.push(" RETURNING ");
    qb.push(schema.columns.join(", "));
}

fn ensure_namespace<E: Entity>(changeset: &Changeset) -> Result<(), RepoError> {
    if changeset.namespace() == E::SCHEMA.namespace {
        Ok(())
    } else {
        Err(RepoError::InvalidInput {
            message: format!(
                "`{}` changeset cannot be written to `{}`",
                changeset.namespace(),
                E::SCHEMA.table
            ),
        })
    }
}

#[async_trait]
impl<E> ItemRepository<E> for PostgresRepositories
where
    E: Entity + for<'r> FromRow<'r, PgRow>,
{
    #[instrument(skip(self), fields(namespace = E::SCHEMA.namespace))]
    async fn find_by_id(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError> {
        let mut qb = find_query(E::SCHEMA, tenant, id);
        qb.build_query_as::<E>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    #[instrument(skip(self, changeset), fields(namespace = E::SCHEMA.namespace))]
    async fn insert(&self, tenant: TenantId, changeset: &Changeset) -> Result<E, RepoError> {
        ensure_namespace::<E>(changeset)?;
        let mut qb = insert_query(E::SCHEMA, tenant, changeset);
        qb.build_query_as::<E>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    #[instrument(skip(self, changeset), fields(namespace = E::SCHEMA.namespace))]
    async fn update(
        &self,
        tenant: TenantId,
        id: RecordId,
        changeset: &Changeset,
    ) -> Result<Option<E>, RepoError> {
        ensure_namespace::<E>(changeset)?;
        let mut qb = update_query(E::SCHEMA, tenant, id, changeset);
        qb.build_query_as::<E>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    #[instrument(skip(self), fields(namespace = E::SCHEMA.namespace))]
    async fn delete(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError> {
        let mut qb = delete_query(E::SCHEMA, tenant, id);
        qb.build_query_as::<E>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}
