//! ChainBuilder - ライフサイクルの bookend 付きパイプライン
//!
//! リンクの順番は固定:
//! `start` → 呼び出し側のステップ… → `stop` → `remove_expired`（TTL > 0 のときだけ）
//!
//! # 失敗時の挙動
//! - ステップが `StepError::Failed` を返したら、そのステップの失敗フック
//!   （`DynStep::on_failure`）が failed → stop でレコードを閉じる
//! - 残りの呼び出し側ステップはスキップし、末尾の bookend は実行する
//! - `StepError::Job`（永続化・コーデック・NotFound）はそのまま `Err` で返す

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::handle::JobHandle;
use super::lifecycle::Lifecycle;
use crate::domain::{JobError, JobState, JobVariant};
use crate::ports::TaskQueue;
use crate::typed::{DynStep, Step, StepContext, StepEnvelope, StepError, TypedStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Bookend,
    Work,
}

struct Link {
    step: Arc<dyn DynStep>,
    kind: LinkKind,
}

/// Collects the caller's steps for one job variant.
///
/// # 使用例
/// ```ignore
/// let chain = ChainBuilder::new(lifecycle.clone())
///     .step(Parse)
///     .step(Count { extra: 2 })
///     .build(JobHandle::new(job))
///     .await?;
/// let envelope = chain.run(&InlineTaskQueue).await?;
/// ```
pub struct ChainBuilder<J> {
    ctx: StepContext,
    expiry_enabled: bool,
    steps: Vec<Arc<dyn DynStep>>,
    _marker: PhantomData<fn() -> J>,
}

impl<J: JobVariant> ChainBuilder<J> {
    pub fn new(lifecycle: Arc<Lifecycle>) -> Self {
        let expiry_enabled = lifecycle.repository().config().expiry_enabled();
        Self {
            ctx: StepContext::new(lifecycle),
            expiry_enabled,
            steps: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn step<S: Step<J>>(mut self, step: S) -> Self {
        self.steps.push(self.erase(step));
        self
    }

    fn erase<S: Step<J>>(&self, step: S) -> Arc<dyn DynStep> {
        Arc::new(TypedStep::new(step, self.ctx.clone()))
    }

    /// Mark the job submitted and capture its identity.
    ///
    /// Fails with `NotFound` when the job was never persisted.
    pub async fn build(self, mut handle: JobHandle<J>) -> Result<Chain<J>, JobError> {
        if let Some(job) = handle.record_mut() {
            if job.record().state == JobState::Created {
                self.ctx.lifecycle().submit(job).await?;
            }
        }
        handle.dehydrate()?;
        let payload = serde_json::to_value(StepEnvelope::new(handle))?;

        let mut links = Vec::with_capacity(self.steps.len() + 3);
        links.push(Link {
            step: self.erase(StartStep),
            kind: LinkKind::Bookend,
        });
        links.extend(self.steps.iter().cloned().map(|step| Link {
            step,
            kind: LinkKind::Work,
        }));
        links.push(Link {
            step: self.erase(StopStep),
            kind: LinkKind::Bookend,
        });
        if self.expiry_enabled {
            links.push(Link {
                step: self.erase(RemoveExpiredStep),
                kind: LinkKind::Bookend,
            });
        }

        Ok(Chain {
            links,
            payload,
            _marker: PhantomData,
        })
    }
}

/// A built pipeline, ready to be dispatched link by link.
pub struct Chain<J> {
    links: Vec<Link>,
    payload: serde_json::Value,
    _marker: PhantomData<fn() -> J>,
}

impl<J: JobVariant> Chain<J> {
    pub fn step_names(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.step.name()).collect()
    }

    /// The dehydrated envelope handed to the first link.
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Run every link in order, each one's output feeding the next.
    pub async fn run(self, queue: &dyn TaskQueue) -> Result<StepEnvelope<J>, JobError> {
        let mut payload = self.payload;
        let mut failed = false;

        for link in &self.links {
            let name = link.step.name();
            if failed && link.kind == LinkKind::Work {
                debug!(step = name, "skipped after failure");
                continue;
            }
            match queue.dispatch(link.step.clone(), payload.clone()).await {
                Ok(next) => payload = next,
                Err(StepError::Failed(failure)) => {
                    warn!(step = name, %failure, "step failed, closing job");
                    payload = link.step.on_failure(payload, &failure).await?;
                    failed = true;
                }
                Err(StepError::Job(err)) => return Err(err),
            }
        }

        Ok(serde_json::from_value(payload)?)
    }
}

/// Head bookend.
pub struct StartStep;

#[async_trait]
impl<J: JobVariant> Step<J> for StartStep {
    fn name(&self) -> &str {
        "start"
    }

    async fn run(
        &self,
        ctx: &StepContext,
        mut envelope: StepEnvelope<J>,
    ) -> Result<StepEnvelope<J>, StepError> {
        envelope.handle.start(ctx.lifecycle()).await?;
        Ok(envelope)
    }
}

pub struct StopStep;

#[async_trait]
impl<J: JobVariant> Step<J> for StopStep {
    fn name(&self) -> &str {
        "stop"
    }

    async fn run(
        &self,
        ctx: &StepContext,
        mut envelope: StepEnvelope<J>,
    ) -> Result<StepEnvelope<J>, StepError> {
        envelope.handle.stop(ctx.lifecycle()).await?;
        Ok(envelope)
    }
}

/// Maintenance: deletes every record of `J` whose closure has passed.
pub struct RemoveExpiredStep;

#[async_trait]
impl<J: JobVariant> Step<J> for RemoveExpiredStep {
    fn name(&self) -> &str {
        "remove_expired"
    }

    async fn run(
        &self,
        ctx: &StepContext,
        envelope: StepEnvelope<J>,
    ) -> Result<StepEnvelope<J>, StepError> {
        ctx.repository().remove_expired::<J>().await?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;
    use crate::impls::InlineTaskQueue;
    use crate::testing::{TestJob, harness};
    use serde_json::json;

    struct Explode;

    #[async_trait]
    impl Step<TestJob> for Explode {
        fn name(&self) -> &str {
            "explode"
        }

        async fn run(
            &self,
            _ctx: &StepContext,
            _envelope: StepEnvelope<TestJob>,
        ) -> Result<StepEnvelope<TestJob>, StepError> {
            Err(StepError::failed("RuntimeError", "boom"))
        }
    }

    struct Emit(serde_json::Value);

    #[async_trait]
    impl Step<TestJob> for Emit {
        fn name(&self) -> &str {
            "emit"
        }

        async fn run(
            &self,
            _ctx: &StepContext,
            envelope: StepEnvelope<TestJob>,
        ) -> Result<StepEnvelope<TestJob>, StepError> {
            Ok(envelope.push(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn bookends_wrap_caller_steps() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();

        let chain = ChainBuilder::new(h.lifecycle.clone())
            .step(Emit(json!(1)))
            .build(JobHandle::new(job))
            .await
            .unwrap();
        assert_eq!(chain.step_names(), ["start", "emit", "stop", "remove_expired"]);
    }

    #[tokio::test]
    async fn no_maintenance_without_ttl() {
        let h = harness(0);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();

        let chain = ChainBuilder::new(h.lifecycle.clone())
            .build(JobHandle::new(job))
            .await
            .unwrap();
        assert_eq!(chain.step_names(), ["start", "stop"]);
    }

    #[tokio::test]
    async fn build_marks_submitted() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();
        let id = job.record().id.unwrap();

        ChainBuilder::new(h.lifecycle.clone())
            .build(JobHandle::new(job))
            .await
            .unwrap();
        let stored: TestJob = h.repository().load(id).await.unwrap();
        assert_eq!(stored.record().state, JobState::Submitted);
    }

    #[tokio::test]
    async fn build_rejects_unsaved_jobs() {
        let h = harness(60);
        let err = ChainBuilder::new(h.lifecycle.clone())
            .build(JobHandle::new(TestJob::new(h.now())))
            .await
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn failure_skips_remaining_work_but_still_closes() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();

        let envelope = ChainBuilder::new(h.lifecycle.clone())
            .step(Emit(json!("before")))
            .step(Explode)
            .step(Emit(json!("after")))
            .build(JobHandle::new(job))
            .await
            .unwrap()
            .run(&InlineTaskQueue)
            .await
            .unwrap();

        assert_eq!(envelope.results(), &[json!("before")]);
        let mut handle = envelope.handle;
        let job = handle.get_record(h.repository()).await.unwrap();
        let record = job.record();
        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.status, JobStatus::Failure);
        assert_eq!(record.error.as_ref().unwrap().task, "explode");
    }
}
