//! Generic tenant-scoped list and count queries.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::instrument;

use crate::application::pagination::{ListRequest, Window};
use crate::application::repos::{ListRepository, RepoError};
use crate::domain::schema::{Entity, EntitySchema};
use crate::domain::types::{FieldValue, SortDirection};

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error, push_value};

pub(crate) const TENANT_COLUMN: &str = "tenant_id";

/// Page query for `request`. The tenant predicate is always the first condition.
pub fn list_query(
    schema: &EntitySchema,
    request: &ListRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(schema.columns.join(", "));
    qb.push(" FROM ");
    qb.push(schema.table);
    push_predicates(&mut qb, request);

    match request.window {
        Window::Keyset { before, .. } => {
            qb.push(" AND ");
            qb.push(schema.primary_key);
            qb.push(" < ");
            qb.push_bind(before);
            qb.push(" ORDER BY ");
            qb.push(schema.primary_key);
            qb.push(" DESC LIMIT ");
            qb.push_bind(i64::from(request.window.fetch_limit()));
        }
        Window::Offset { offset, limit } => {
            qb.push(" ORDER BY ");
            qb.push(request.order.column);
            qb.push(" ");
            qb.push(request.order.direction.as_sql());
            if request.order.column != schema.primary_key {
                qb.push(", ");
                qb.push(schema.primary_key);
                qb.push(" ");
                qb.push(SortDirection::Desc.as_sql());
            }
            qb.push(" LIMIT ");
            qb.push_bind(i64::from(limit));
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }
    }

    qb
}

/// Exact total for the request predicates. The window and cursor never apply.
pub fn count_query(
    schema: &EntitySchema,
    request: &ListRequest,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ");
    qb.push(schema.table);
    push_predicates(&mut qb, request);
    qb
}

fn push_predicates(qb: &mut QueryBuilder<'static, Postgres>, request: &ListRequest) {
    qb.push(" WHERE ");
    qb.push(TENANT_COLUMN);
    qb.push(" = ");
    qb.push_bind(request.tenant);

    for (column, value) in &request.filters {
        qb.push(" AND ");
        qb.push(*column);
        if matches!(value, FieldValue::Null) {
            qb.push(" IS NULL");
        } else {
            qb.push(" = ");
            push_value(qb, value);
        }
    }

    if let Some((column, term)) = request.search.as_ref() {
        qb.push(" AND ");
        qb.push(*column);
        qb.push(" ILIKE ");
        qb.push_bind(format!("%{}%", escape_like(term)));
        qb.push(" ESCAPE '\\'");
    }
}

/// Search terms match literally, so LIKE wildcards in the term are escaped.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl<E> ListRepository<E> for PostgresRepositories
where
    E: Entity + for<'r> FromRow<'r, PgRow>,
{
    #[instrument(skip_all, fields(namespace = E::SCHEMA.namespace, tenant = %request.tenant))]
    async fn fetch_rows(&self, request: &ListRequest) -> Result<Vec<E>, RepoError> {
        let mut qb = list_query(E::SCHEMA, request);
        qb.build_query_as::<E>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    #[instrument(skip_all, fields(namespace = E::SCHEMA.namespace, tenant = %request.tenant))]
    async fn count_rows(&self, request: &ListRequest) -> Result<u64, RepoError> {
        let mut qb = count_query(E::SCHEMA, request);
        let total: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(total)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::application::query::FilterNormalizer;
    use crate::domain::entities::{BlogPost, Technology};
    use crate::domain::types::TenantId;

    fn request<E: Entity>(pairs: &[(&str, &str)]) -> ListRequest {
        let raw: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let descriptor = FilterNormalizer::default().normalize(E::SCHEMA, TenantId::new(7), &raw);
        ListRequest::plan(E::SCHEMA, &descriptor)
    }

    fn tail(sql: &str) -> &str {
        let from = sql.find(" FROM ").expect("FROM clause");
        &sql[from..]
    }

    #[test]
    fn default_order_is_primary_key_descending() {
        let qb = list_query(Technology::SCHEMA, &request::<Technology>(&[]));
        assert_eq!(
            qb.sql(),
            "SELECT id, tenant_id, name, category, icon, created_at, updated_at \
             FROM technologies WHERE tenant_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn cursor_pages_use_keyset_and_over_fetch() {
        let qb = list_query(
            BlogPost::SCHEMA,
            &request::<BlogPost>(&[("cursor", "42"), ("limit", "10")]),
        );
        assert_eq!(
            tail(qb.sql()),
            " FROM blog_posts WHERE tenant_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3"
        );
    }

    #[test]
    fn filters_and_search_follow_tenant_predicate() {
        let qb = list_query(
            BlogPost::SCHEMA,
            &request::<BlogPost>(&[
                ("search", "rust"),
                ("is_published", "true"),
                ("language", "en"),
                ("sortBy", "title"),
                ("sortDir", "ASC"),
            ]),
        );
        assert_eq!(
            tail(qb.sql()),
            " FROM blog_posts WHERE tenant_id = $1 AND is_published = $2 AND language = $3 \
             AND title ILIKE $4 ESCAPE '\\' ORDER BY title ASC, id DESC LIMIT $5 OFFSET $6"
        );
    }

    #[test]
    fn search_wildcards_match_literally() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like(r"C:\path"), r"C:\\path");
        assert_eq!(escape_like("plain rust"), "plain rust");

        let qb = count_query(BlogPost::SCHEMA, &request::<BlogPost>(&[("search", "100%")]));
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM blog_posts WHERE tenant_id = $1 AND title ILIKE $2 ESCAPE '\\'"
        );
    }

    #[test]
    fn non_primary_sort_ignores_cursor() {
        let qb = list_query(
            BlogPost::SCHEMA,
            &request::<BlogPost>(&[("sortBy", "title"), ("sortDir", "ASC"), ("cursor", "42")]),
        );
        assert!(!qb.sql().contains("id <"));
        assert!(qb.sql().ends_with("ORDER BY title ASC, id DESC LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn count_skips_window_and_cursor() {
        let qb = count_query(
            BlogPost::SCHEMA,
            &request::<BlogPost>(&[("category_id", "3"), ("offset", "20")]),
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM blog_posts WHERE tenant_id = $1 AND category_id = $2"
        );
    }

    #[test]
    fn unknown_columns_never_reach_sql() {
        let qb = list_query(
            Technology::SCHEMA,
            &request::<Technology>(&[("sortBy", "name; DROP TABLE x"), ("owner", "1")]),
        );
        assert!(!qb.sql().contains("DROP"));
        assert!(!qb.sql().contains("owner"));
    }
}
