//! DynStep - Step<J> の型消去
//!
//! # 学習ポイント
//! - Object-safe trait (DynStep)
//! - Type erasure パターン (TypedStep<J, S> → DynStep)
//! - ワーカー境界は JSON (`serde_json::Value`) のみ
//!
//! チェーンは異なる Step 実装を `Vec<Arc<dyn DynStep>>` として保持します。

use std::marker::PhantomData;

use async_trait::async_trait;

use super::envelope::StepEnvelope;
use super::step::{Step, StepContext, StepError, StepFailure};
use crate::domain::{FailurePayload, JobError, JobVariant};

/// DynStep は object-safe な Step の抽象化
///
/// # Object Safety
/// - メソッドはジェネリックではない（JSON で受けて JSON で返す）
#[async_trait]
pub trait DynStep: Send + Sync {
    fn name(&self) -> &str;

    /// Decode a dehydrated envelope, hydrate it, run, dehydrate again.
    ///
    /// A `JobError` from the step itself comes back as `StepError::Failed`;
    /// only decoding, hydration and dehydration yield `StepError::Job`.
    async fn run_dyn(&self, payload: serde_json::Value) -> Result<serde_json::Value, StepError>;

    /// Failure hook. `args` is the envelope the failing step received.
    ///
    /// Records the failure on the job, stops it and returns the
    /// dehydrated envelope.
    async fn on_failure(
        &self,
        args: serde_json::Value,
        failure: &StepFailure,
    ) -> Result<serde_json::Value, JobError>;
}

pub struct TypedStep<J: JobVariant, S: Step<J>> {
    step: S,
    ctx: StepContext,
    _marker: PhantomData<fn() -> J>,
}

impl<J: JobVariant, S: Step<J>> TypedStep<J, S> {
    pub fn new(step: S, ctx: StepContext) -> Self {
        Self {
            step,
            ctx,
            _marker: PhantomData,
        }
    }

    async fn open(&self, payload: serde_json::Value) -> Result<StepEnvelope<J>, JobError> {
        let mut envelope: StepEnvelope<J> = serde_json::from_value(payload)?;
        envelope.handle.hydrate(self.ctx.repository()).await?;
        Ok(envelope)
    }

    fn seal(envelope: StepEnvelope<J>) -> Result<serde_json::Value, JobError> {
        let (mut handle, results) = envelope.into_parts();
        handle.dehydrate()?;
        Ok(serde_json::to_value(StepEnvelope { handle, results })?)
    }
}

#[async_trait]
impl<J: JobVariant, S: Step<J>> DynStep for TypedStep<J, S> {
    fn name(&self) -> &str {
        self.step.name()
    }

    async fn run_dyn(&self, payload: serde_json::Value) -> Result<serde_json::Value, StepError> {
        let envelope = self.open(payload).await?;
        let envelope = match self.step.run(&self.ctx, envelope).await {
            Ok(envelope) => envelope,
            // repository errors inside the step are recorded like any failure
            Err(StepError::Job(err)) => return Err(StepFailure::from_error(&err).into()),
            Err(err) => return Err(err),
        };
        Ok(Self::seal(envelope)?)
    }

    async fn on_failure(
        &self,
        args: serde_json::Value,
        failure: &StepFailure,
    ) -> Result<serde_json::Value, JobError> {
        let mut envelope = self.open(args).await?;
        let payload = FailurePayload {
            task: self.step.name().to_string(),
            exception: failure.kind.clone(),
            msg: failure.message.clone(),
        };

        let lifecycle = self.ctx.lifecycle();
        if let Some(job) = envelope.handle.record_mut() {
            lifecycle.failed(job, payload).await?;
            lifecycle.stop(job).await?;
        }
        Self::seal(envelope)
    }
}
