//! InlineTaskQueue - 同一プロセス内のタスクキュー
//!
//! # 学習ポイント
//! - payload は JSON バイト列にエンコードしてから渡す（ワーカー境界の再現）
//! - ステップは `tokio::spawn` した別タスクで動かす
//! - panic は `StepFailure("Panic")` に変換する

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::JobError;
use crate::ports::TaskQueue;
use crate::typed::{DynStep, StepError, StepFailure};

#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTaskQueue;

impl InlineTaskQueue {
    pub fn new() -> Self {
        Self
    }
}

fn encode(value: &serde_json::Value) -> Result<Vec<u8>, StepError> {
    Ok(serde_json::to_vec(value).map_err(JobError::from)?)
}

fn decode(bytes: &[u8]) -> Result<serde_json::Value, StepError> {
    Ok(serde_json::from_slice(bytes).map_err(JobError::from)?)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "step panicked".to_string()
    }
}

#[async_trait]
impl TaskQueue for InlineTaskQueue {
    async fn dispatch(
        &self,
        step: Arc<dyn DynStep>,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, StepError> {
        let wire = encode(&payload)?;

        let worker = tokio::spawn(async move {
            let payload = decode(&wire)?;
            let out = step.run_dyn(payload).await?;
            encode(&out)
        });

        let wire = match worker.await {
            Ok(result) => result?,
            Err(err) if err.is_panic() => {
                return Err(StepFailure::new("Panic", panic_message(err.into_panic())).into());
            }
            Err(err) => return Err(StepFailure::new("Cancelled", err.to_string()).into()),
        };
        decode(&wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Double;

    #[async_trait]
    impl DynStep for Double {
        fn name(&self) -> &str {
            "double"
        }

        async fn run_dyn(&self, payload: serde_json::Value) -> Result<serde_json::Value, StepError> {
            let n = payload.as_i64().ok_or_else(|| StepError::failed("TypeError", "not a number"))?;
            Ok(json!(n * 2))
        }

        async fn on_failure(
            &self,
            args: serde_json::Value,
            _failure: &StepFailure,
        ) -> Result<serde_json::Value, JobError> {
            Ok(args)
        }
    }

    struct Panics;

    #[async_trait]
    impl DynStep for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        async fn run_dyn(&self, _payload: serde_json::Value) -> Result<serde_json::Value, StepError> {
            panic!("kaboom");
        }

        async fn on_failure(
            &self,
            args: serde_json::Value,
            _failure: &StepFailure,
        ) -> Result<serde_json::Value, JobError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn dispatch_runs_the_step() {
        let out = InlineTaskQueue.dispatch(Arc::new(Double), json!(21)).await.unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn step_failures_are_returned() {
        let err = InlineTaskQueue
            .dispatch(Arc::new(Double), json!("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Failed(f) if f.kind == "TypeError"));
    }

    #[tokio::test]
    async fn panics_become_failures() {
        let err = InlineTaskQueue
            .dispatch(Arc::new(Panics), json!(null))
            .await
            .unwrap_err();
        match err {
            StepError::Failed(failure) => {
                assert_eq!(failure.kind, "Panic");
                assert_eq!(failure.message, "kaboom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
