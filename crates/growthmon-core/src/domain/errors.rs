//! Errors - エラー型と分類
//!
//! - `JobError`: ライフサイクル・ハンドル・リポジトリ操作のエラー
//! - ステップ自体の失敗は `typed::StepError` 側で表現し、レコードに記録する

use thiserror::Error;

use super::state::JobState;
use crate::ports::StoreError;

/// Error raised by lifecycle, handle and repository operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// The record does not exist (never persisted, or deleted concurrently).
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("{variant}.{field} is indicated as required, but no file could be found")]
    MissingRequiredFile { variant: String, field: String },

    #[error("misconfigured job variant: {0}")]
    Misconfigured(String),

    #[error("invalid identifier {0:?}: expected at most 32 characters in [a-zA-Z0-9]")]
    InvalidIdentifier(String),

    #[error("illegal state transition from {from} to {to}")]
    IllegalTransition { from: JobState, to: JobState },

    #[error("handle refers to variant {found}, expected {expected}")]
    VariantMismatch { expected: String, found: String },

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl JobError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, JobError::NotFound(_))
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => JobError::NotFound(err.to_string()),
            other => JobError::Store(other),
        }
    }
}
