//! JobStore port - ジョブレコードの正本（source of truth）
//!
//! リレーショナルストアを想定した最小限のインターフェースです。
//! レコード本体は JSON ドキュメントとして保存し、検索に使う列
//! （id, slug, closure）だけを別に持ちます。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::ids::JobId;

/// Which table a row lives in: the collection plus the concrete variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub collection: String,
    pub variant: String,
}

impl RecordKey {
    pub fn new(collection: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            variant: variant.into(),
        }
    }
}

/// A stored job: indexed columns + the serialized record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: JobId,
    pub slug: String,
    pub closure: Option<DateTime<Utc>>,
    pub document: serde_json::Value,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{collection}.{variant} {id} does not exist")]
    NotFound {
        collection: String,
        variant: String,
        id: JobId,
    },

    #[error("slug {0:?} is already taken")]
    SlugTaken(String),

    #[error("id {0} is already taken")]
    DuplicateId(JobId),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// JobStore は永続化レイヤーの抽象化
///
/// # 設計原則
/// - slug はストア全体で一意（`SlugTaken` で拒否）
/// - 見つからない場合は必ず `StoreError::NotFound` を返す
/// - 削除に伴うファイルの後始末は呼び出し側（JobRepository）が行う
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, key: &RecordKey, row: JobRow) -> Result<(), StoreError>;

    async fn update(&self, key: &RecordKey, row: JobRow) -> Result<(), StoreError>;

    async fn fetch(&self, key: &RecordKey, id: JobId) -> Result<JobRow, StoreError>;

    /// Ids of the rows whose closure is strictly before `at`.
    async fn closing_before(
        &self,
        key: &RecordKey,
        at: DateTime<Utc>,
    ) -> Result<Vec<JobId>, StoreError>;

    async fn delete(&self, key: &RecordKey, id: JobId) -> Result<(), StoreError>;
}
