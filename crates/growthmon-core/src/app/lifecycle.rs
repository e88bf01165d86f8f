//! Lifecycle - ジョブの状態遷移と永続化
//!
//! 遷移は `JobRecord` のメソッドで行い、ここでは保存とログだけを担当します。
//! 永続化エラーはそのまま呼び出し側へ伝播し、リトライはしません。
//!
//! `failed()` は `stop()` を呼びません。閉じるのは失敗フックか
//! チェーンの stop ステップの役目です。

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error};

use super::repository::JobRepository;
use crate::domain::{FailurePayload, JobError, JobState, JobStatus, JobSummary, JobVariant};

#[derive(Clone)]
pub struct Lifecycle {
    repository: Arc<JobRepository>,
}

impl Lifecycle {
    pub fn new(repository: Arc<JobRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &JobRepository {
        &self.repository
    }

    pub fn shared_repository(&self) -> Arc<JobRepository> {
        self.repository.clone()
    }

    /// Set `state`, persist, and return the previous state.
    pub async fn progress<J: JobVariant>(
        &self,
        job: &mut J,
        new_state: JobState,
    ) -> Result<JobState, JobError> {
        let old_state = job.record_mut().advance(new_state)?;
        self.repository.save(job).await?;
        Ok(old_state)
    }

    pub async fn submit<J: JobVariant>(&self, job: &mut J) -> Result<JobState, JobError> {
        self.progress(job, JobState::Submitted).await
    }

    pub async fn start<J: JobVariant>(
        &self,
        job: &mut J,
    ) -> Result<(JobState, JobStatus, DateTime<Utc>), JobError> {
        let now = self.repository.now();
        let record = job.record_mut();
        record.advance(JobState::Running)?;
        record.mark_started(now);
        self.repository.save(job).await?;

        debug!(job = %JobSummary(&*job), "started");
        let record = job.record();
        Ok((record.state, record.status, now))
    }

    /// Close the job. A completed job is returned as is.
    pub async fn stop<J: JobVariant>(
        &self,
        job: &mut J,
    ) -> Result<(JobState, JobStatus, TimeDelta), JobError> {
        let now = self.repository.now();
        let record = job.record_mut();
        let (duration, computed) = record.settle_duration(now);

        if record.state != JobState::Completed {
            record.settle_status();
            record.advance(JobState::Completed)?;
        } else if !computed {
            return Ok((record.state, record.status, duration));
        }
        self.repository.save(job).await?;

        debug!(job = %JobSummary(&*job), ?duration, "stopped");
        let record = job.record();
        Ok((record.state, record.status, duration))
    }

    /// Record a step failure. The state is left alone.
    pub async fn failed<J: JobVariant>(
        &self,
        job: &mut J,
        payload: FailurePayload,
    ) -> Result<(), JobError> {
        let now = self.repository.now();
        let record = job.record_mut();
        record.settle_duration(now);
        error!(
            task = %payload.task,
            exception = %payload.exception,
            msg = %payload.msg,
            "job step failed"
        );
        record.record_failure(payload);
        self.repository.save(job).await
    }

    pub fn has_failed<J: JobVariant>(&self, job: &J) -> bool {
        job.record().has_failed()
    }
}
