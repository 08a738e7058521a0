//! Shared fixtures for the integration suites: an in-memory repository that mirrors the
//! Postgres adapter's filtering and ordering, a cache gateway with injectable faults, and
//! row builders.

#![allow(dead_code)]

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use folio::application::pagination::{ListRequest, Window};
use folio::application::repos::{Changeset, HealthRepo, ItemRepository, ListRepository, RepoError};
use folio::application::services::{PortfolioServices, ServiceSettings};
use folio::cache::{CacheError, CacheGateway, MemoryCache, RetryPolicy};
use folio::domain::entities::{BlogPost, Technology, WorkExperience, WorkMilestone};
use folio::domain::schema::Entity;
use folio::domain::types::{FieldValue, RecordId, SortDirection, TenantId};
use serde_json::{Map, Value};
use time::macros::date;
use time::OffsetDateTime;

pub const TENANT_A: TenantId = TenantId::new(1);
pub const TENANT_B: TenantId = TenantId::new(2);

/// In-memory rows keyed by namespace, stored in their JSON form so one implementation
/// serves every entity.
#[derive(Default)]
pub struct InMemoryRepository {
    rows: Mutex<HashMap<&'static str, Vec<Value>>>,
    fetches: Mutex<HashMap<&'static str, usize>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    database_down: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed<E: Entity>(&self, records: impl IntoIterator<Item = E>) {
        let mut rows = self.rows.lock().expect("rows lock");
        let table = rows.entry(E::SCHEMA.namespace).or_default();
        for record in records {
            self.next_id.fetch_max(record.id(), Ordering::SeqCst);
            table.push(serde_json::to_value(&record).expect("encode seeded row"));
        }
    }

    /// Rewrite a stored row without going through any service, as an out-of-band writer would.
    pub fn overwrite<E: Entity>(&self, record: E) {
        let mut rows = self.rows.lock().expect("rows lock");
        let table = rows.entry(E::SCHEMA.namespace).or_default();
        let encoded = serde_json::to_value(&record).expect("encode row");
        match table
            .iter_mut()
            .find(|row| key_of(row) == (record.tenant_id().get(), record.id()))
        {
            Some(slot) => *slot = encoded,
            None => table.push(encoded),
        }
    }

    /// Number of `fetch_rows` calls served for `namespace`.
    pub fn fetch_calls(&self, namespace: &str) -> usize {
        self.fetches
            .lock()
            .expect("fetches lock")
            .get(namespace)
            .copied()
            .unwrap_or(0)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_database_down(&self, down: bool) {
        self.database_down.store(down, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("latency lock") = Some(latency);
    }

    fn available(&self) -> Result<(), RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection reset by peer".to_string()));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().expect("latency lock");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn matching(&self, namespace: &'static str, request: &ListRequest) -> Vec<Value> {
        let rows = self.rows.lock().expect("rows lock");
        rows.get(namespace)
            .into_iter()
            .flatten()
            .filter(|row| row["tenant_id"].as_i64() == Some(request.tenant.get()))
            .filter(|row| {
                request
                    .filters
                    .iter()
                    .all(|(column, expected)| field_matches(row.get(*column), expected))
            })
            .filter(|row| match request.search.as_ref() {
                Some((column, term)) => row
                    .get(*column)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&term.to_lowercase())),
                None => true,
            })
            .cloned()
            .collect()
    }
}

fn key_of(row: &Value) -> (i64, RecordId) {
    (
        row["tenant_id"].as_i64().unwrap_or_default(),
        row["id"].as_i64().unwrap_or_default(),
    )
}

fn id_of(row: &Value) -> RecordId {
    row["id"].as_i64().unwrap_or_default()
}

fn field_matches(field: Option<&Value>, expected: &FieldValue) -> bool {
    match expected {
        FieldValue::Null => field.is_none_or(Value::is_null),
        FieldValue::Int(value) => field.and_then(Value::as_i64) == Some(*value),
        FieldValue::Bool(value) => field.and_then(Value::as_bool) == Some(*value),
        FieldValue::Text(value) => field.and_then(Value::as_str) == Some(value.as_str()),
        other => field == serde_json::to_value(other).ok().as_ref(),
    }
}

/// Postgres ordering: NULL sorts above every value.
fn compare_values(left: &Value, right: &Value) -> CmpOrdering {
    match (left, right) {
        (Value::Null, Value::Null) => CmpOrdering::Equal,
        (Value::Null, _) => CmpOrdering::Greater,
        (_, Value::Null) => CmpOrdering::Less,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

fn decode<E: Entity>(row: Value) -> Result<E, RepoError> {
    serde_json::from_value(row).map_err(|err| RepoError::InvalidInput {
        message: err.to_string(),
    })
}

fn encode(value: &FieldValue) -> Result<Value, RepoError> {
    serde_json::to_value(value).map_err(|err| RepoError::InvalidInput {
        message: err.to_string(),
    })
}

fn now() -> Value {
    serde_json::to_value(OffsetDateTime::now_utc()).unwrap_or(Value::Null)
}

#[async_trait]
impl<E: Entity> ListRepository<E> for InMemoryRepository {
    async fn fetch_rows(&self, request: &ListRequest) -> Result<Vec<E>, RepoError> {
        *self
            .fetches
            .lock()
            .expect("fetches lock")
            .entry(E::SCHEMA.namespace)
            .or_default() += 1;
        self.simulate_latency().await;
        self.available()?;

        let mut rows = self.matching(E::SCHEMA.namespace, request);
        let rows: Vec<Value> = match request.window {
            Window::Keyset { before, .. } => {
                rows.retain(|row| id_of(row) < before);
                rows.sort_by_key(|row| std::cmp::Reverse(id_of(row)));
                rows.truncate(request.window.fetch_limit() as usize);
                rows
            }
            Window::Offset { offset, limit } => {
                let column = request.order.column;
                rows.sort_by(|a, b| {
                    let ordered = compare_values(&a[column], &b[column]);
                    let ordered = match request.order.direction {
                        SortDirection::Asc => ordered,
                        SortDirection::Desc => ordered.reverse(),
                    };
                    ordered.then_with(|| id_of(b).cmp(&id_of(a)))
                });
                rows.into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect()
            }
        };

        rows.into_iter().map(decode::<E>).collect()
    }

    async fn count_rows(&self, request: &ListRequest) -> Result<u64, RepoError> {
        self.available()?;
        Ok(self.matching(E::SCHEMA.namespace, request).len() as u64)
    }
}

#[async_trait]
impl<E: Entity> ItemRepository<E> for InMemoryRepository {
    async fn find_by_id(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError> {
        self.available()?;
        let rows = self.rows.lock().expect("rows lock");
        rows.get(E::SCHEMA.namespace)
            .into_iter()
            .flatten()
            .find(|row| key_of(row) == (tenant.get(), id))
            .cloned()
            .map(decode::<E>)
            .transpose()
    }

    async fn insert(&self, tenant: TenantId, changeset: &Changeset) -> Result<E, RepoError> {
        self.available()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        let mut object = Map::new();
        for (column, value) in changeset.iter() {
            object.insert(column.to_string(), encode(value)?);
        }
        object.insert("id".to_string(), Value::from(id));
        object.insert("tenant_id".to_string(), Value::from(tenant.get()));
        object.insert("created_at".to_string(), now());
        object.insert("updated_at".to_string(), now());

        let row = Value::Object(object);
        let record: E = decode(row.clone())?;
        self.rows
            .lock()
            .expect("rows lock")
            .entry(E::SCHEMA.namespace)
            .or_default()
            .push(row);
        Ok(record)
    }

    async fn update(
        &self,
        tenant: TenantId,
        id: RecordId,
        changeset: &Changeset,
    ) -> Result<Option<E>, RepoError> {
        self.available()?;
        let mut rows = self.rows.lock().expect("rows lock");
        let Some(slot) = rows
            .entry(E::SCHEMA.namespace)
            .or_default()
            .iter_mut()
            .find(|row| key_of(row) == (tenant.get(), id))
        else {
            return Ok(None);
        };

        let mut candidate = slot.clone();
        for (column, value) in changeset.iter() {
            candidate[column] = encode(value)?;
        }
        candidate["updated_at"] = now();

        let record: E = decode(candidate.clone())?;
        *slot = candidate;
        Ok(Some(record))
    }

    async fn delete(&self, tenant: TenantId, id: RecordId) -> Result<Option<E>, RepoError> {
        self.available()?;
        let mut rows = self.rows.lock().expect("rows lock");
        let table = rows.entry(E::SCHEMA.namespace).or_default();
        match table
            .iter()
            .position(|row| key_of(row) == (tenant.get(), id))
        {
            Some(index) => decode(table.remove(index)).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepository {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.database_down.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Memory-backed gateway whose operations can be made to fail one kind at a time.
pub struct FaultyGateway {
    inner: MemoryCache,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
}

impl FaultyGateway {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(std::num::NonZeroUsize::new(1_024).expect("non-zero")),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &MemoryCache {
        &self.inner
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.inner.keys();
        keys.sort();
        keys
    }

    pub fn has_key_with_prefix(&self, prefix: &str) -> bool {
        self.inner.keys().iter().any(|key| key.starts_with(prefix))
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), CacheError> {
        if flag.load(Ordering::SeqCst) {
            return Err(CacheError::backend(format!("{op}: connection refused")));
        }
        Ok(())
    }
}

impl Default for FaultyGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheGateway for FaultyGateway {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Self::check(&self.fail_get, "get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        Self::check(&self.fail_set, "set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(key).await
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        Self::check(&self.fail_delete, "delete_by_pattern")?;
        self.inner.delete_by_pattern(pattern).await
    }
}

pub struct Harness {
    pub repo: Arc<InMemoryRepository>,
    pub gateway: Arc<FaultyGateway>,
    pub services: PortfolioServices,
}

pub fn harness() -> Harness {
    harness_with(test_settings())
}

pub fn harness_with(settings: ServiceSettings) -> Harness {
    let repo = Arc::new(InMemoryRepository::new());
    let gateway = Arc::new(FaultyGateway::new());
    let services = PortfolioServices::build(repo.clone(), gateway.clone(), settings);
    Harness {
        repo,
        gateway,
        services,
    }
}

/// Default wiring with invalidation retries that never sleep.
pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        retry: RetryPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        },
        ..ServiceSettings::default()
    }
}

pub fn params(pairs: &[(&str, &str)]) -> folio::application::query::RawQuery {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn blog_post(id: RecordId, tenant: TenantId, title: &str) -> BlogPost {
    BlogPost {
        id,
        tenant_id: tenant,
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
        extract: None,
        content: format!("{title} body"),
        is_published: true,
        language: "en".to_string(),
        category_id: None,
        reading_time_minutes: Some(3),
        published_at: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn technology(id: RecordId, tenant: TenantId, name: &str, category: &str) -> Technology {
    Technology {
        id,
        tenant_id: tenant,
        name: name.to_string(),
        category: category.to_string(),
        icon: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn work_experience(id: RecordId, tenant: TenantId, company: &str) -> WorkExperience {
    WorkExperience {
        id,
        tenant_id: tenant,
        company: company.to_string(),
        position: "Engineer".to_string(),
        description: None,
        location: None,
        language: "en".to_string(),
        sort_order: 0,
        is_current: false,
        is_visible: true,
        start_date: date!(2020-01-01),
        end_date: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn work_milestone(
    id: RecordId,
    tenant: TenantId,
    work_experience_id: i64,
    title: &str,
) -> WorkMilestone {
    WorkMilestone {
        id,
        tenant_id: tenant,
        work_experience_id,
        title: title.to_string(),
        description: None,
        milestone_date: date!(2021-06-01),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}
