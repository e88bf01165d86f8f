//! Step trait - 型付きのチェーンステップ
//!
//! # 学習ポイント
//! - ジェネリック trait (`Step<J>`)
//! - ステップ固有の引数は構造体のフィールドとして束縛する
//! - 失敗は 2 種類: レコードに記録する失敗 (`Failed`) と、そのまま伝播するインフラ系エラー (`Job`)

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::envelope::StepEnvelope;
use crate::app::{JobRepository, Lifecycle};
use crate::domain::{JobError, JobVariant};

/// A work-step failure: what went wrong, in a form that can be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct StepFailure {
    /// Kind of the error, e.g. `RuntimeError` or `ParseIntError`.
    pub kind: String,
    pub message: String,
}

impl StepFailure {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Build a failure from any error, using its type name as the kind.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::new(short_type_name::<E>(), err.to_string())
    }
}

/// `core::num::ParseIntError` -> `ParseIntError`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[derive(Debug, Error)]
pub enum StepError {
    /// Captured into the job record by the failure hook.
    #[error("step failed: {0}")]
    Failed(StepFailure),

    /// Persistence, codec or lookup errors around the step; they abort the chain.
    ///
    /// Returned from `Step::run` this becomes `Failed` (kind `JobError`).
    #[error(transparent)]
    Job(#[from] JobError),
}

impl StepError {
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed(StepFailure::new(kind, message))
    }

    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::Failed(StepFailure::from_error(err))
    }
}

impl From<StepFailure> for StepError {
    fn from(failure: StepFailure) -> Self {
        Self::Failed(failure)
    }
}

/// What a step can reach besides its envelope.
#[derive(Clone)]
pub struct StepContext {
    lifecycle: Arc<Lifecycle>,
}

impl StepContext {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        Self { lifecycle }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn repository(&self) -> &JobRepository {
        self.lifecycle.repository()
    }
}

/// Step は 1 つの作業単位
///
/// エンベロープは hydrate 済みの状態で渡され、戻り値は呼び出し側で
/// dehydrate されてから次のワーカーへ送られます。
///
/// # 使用例
/// ```ignore
/// struct Count {
///     extra: u32,
/// }
///
/// #[async_trait]
/// impl Step<ReportJob> for Count {
///     fn name(&self) -> &str {
///         "count"
///     }
///
///     async fn run(
///         &self,
///         _ctx: &StepContext,
///         envelope: StepEnvelope<ReportJob>,
///     ) -> Result<StepEnvelope<ReportJob>, StepError> {
///         Ok(envelope.push(serde_json::json!(self.extra)))
///     }
/// }
/// ```
#[async_trait]
pub trait Step<J: JobVariant>: Send + Sync + 'static {
    /// Name recorded as the failure origin.
    fn name(&self) -> &str;

    async fn run(
        &self,
        ctx: &StepContext,
        envelope: StepEnvelope<J>,
    ) -> Result<StepEnvelope<J>, StepError>;
}
