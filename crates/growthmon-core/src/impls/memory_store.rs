//! InMemoryJobStore - 開発用のジョブストア
//!
//! # 学習ポイント
//! - tokio の RwLock による非同期排他制御
//! - slug の一意性はストア全体で保証する

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::JobId;
use crate::ports::{JobRow, JobStore, RecordKey, StoreError};

/// InMemoryJobStore は開発用の正本
///
/// # 実装詳細
/// - `RecordKey` ごとに `BTreeMap<JobId, JobRow>`（ULID 順 = 作成順）
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryJobStore::new());
/// let repository = JobRepository::with_local_files(store, clock, config);
/// ```
#[derive(Default)]
pub struct InMemoryJobStore {
    tables: RwLock<HashMap<RecordKey, BTreeMap<JobId, JobRow>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows across every table.
    pub async fn len(&self) -> usize {
        self.tables.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn slug_owner(
    tables: &HashMap<RecordKey, BTreeMap<JobId, JobRow>>,
    slug: &str,
) -> Option<JobId> {
    tables
        .values()
        .flat_map(BTreeMap::values)
        .find(|row| row.slug == slug)
        .map(|row| row.id)
}

fn not_found(key: &RecordKey, id: JobId) -> StoreError {
    StoreError::NotFound {
        collection: key.collection.clone(),
        variant: key.variant.clone(),
        id,
    }
}

#[async_trait::async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, key: &RecordKey, row: JobRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.values().any(|table| table.contains_key(&row.id)) {
            return Err(StoreError::DuplicateId(row.id));
        }
        if slug_owner(&tables, &row.slug).is_some() {
            return Err(StoreError::SlugTaken(row.slug));
        }
        tables.entry(key.clone()).or_default().insert(row.id, row);
        Ok(())
    }

    async fn update(&self, key: &RecordKey, row: JobRow) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if slug_owner(&tables, &row.slug).is_some_and(|owner| owner != row.id) {
            return Err(StoreError::SlugTaken(row.slug));
        }
        let slot = tables
            .get_mut(key)
            .and_then(|table| table.get_mut(&row.id))
            .ok_or_else(|| not_found(key, row.id))?;
        *slot = row;
        Ok(())
    }

    async fn fetch(&self, key: &RecordKey, id: JobId) -> Result<JobRow, StoreError> {
        let tables = self.tables.read().await;
        tables
            .get(key)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| not_found(key, id))
    }

    async fn closing_before(
        &self,
        key: &RecordKey,
        at: DateTime<Utc>,
    ) -> Result<Vec<JobId>, StoreError> {
        let tables = self.tables.read().await;
        let ids = tables
            .get(key)
            .map(|table| {
                table
                    .values()
                    .filter(|row| row.closure.is_some_and(|closure| closure < at))
                    .map(|row| row.id)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    async fn delete(&self, key: &RecordKey, id: JobId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .get_mut(key)
            .and_then(|table| table.remove(&id))
            .map(|_| ())
            .ok_or_else(|| not_found(key, id))
    }
}
