//! JobHandle - シリアライズ可能なジョブ参照
//!
//! # 学習ポイント
//! - hydrated（ライブなレコードを保持）/ dehydrated（identity のみ）の 2 状態
//! - 具象型はジェネリクス `J` で固定し、実行時の型名解決はしない
//! - シリアライズされるのは `(id, collection, variant)` だけ
//!
//! ```ignore
//! let mut handle = JobHandle::new(job);
//! handle.dehydrate()?;                 // 未保存なら NotFound
//! let json = serde_json::to_value(&handle)?;
//!
//! let mut handle: JobHandle<ReportJob> = serde_json::from_value(json)?;
//! let job = handle.get_record(&repository).await?;
//! ```

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::lifecycle::Lifecycle;
use super::repository::JobRepository;
use crate::domain::{FailurePayload, JobError, JobId, JobState, JobStatus, JobVariant};

pub struct JobHandle<J> {
    job: Option<J>,
    id: Option<JobId>,
    collection: String,
    variant: String,
}

impl<J: JobVariant> JobHandle<J> {
    /// Hydrated handle around a live job.
    pub fn new(job: J) -> Self {
        Self {
            id: job.record().id,
            job: Some(job),
            collection: J::COLLECTION.to_string(),
            variant: J::VARIANT.to_string(),
        }
    }

    /// Dehydrated handle pointing at a persisted job.
    pub fn from_id(id: JobId) -> Self {
        Self {
            job: None,
            id: Some(id),
            collection: J::COLLECTION.to_string(),
            variant: J::VARIANT.to_string(),
        }
    }

    /// The live record's id, or the captured one.
    pub fn id(&self) -> Option<JobId> {
        self.job
            .as_ref()
            .and_then(|job| job.record().id)
            .or(self.id)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn is_hydrated(&self) -> bool {
        self.job.is_some()
    }

    pub fn record(&self) -> Option<&J> {
        self.job.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut J> {
        self.job.as_mut()
    }

    pub fn into_record(self) -> Option<J> {
        self.job
    }

    /// Capture the identity and drop the live record.
    ///
    /// Fails with `NotFound` when the record was never persisted.
    pub fn dehydrate(&mut self) -> Result<&mut Self, JobError> {
        let id = self.id().ok_or_else(|| {
            JobError::not_found(format!(
                "{} has no id; persist it before handing it over",
                self.variant
            ))
        })?;
        self.id = Some(id);
        self.job = None;
        Ok(self)
    }

    pub fn dehydrated(mut self) -> Result<Self, JobError> {
        self.dehydrate()?;
        Ok(self)
    }

    /// Load the record from the repository. A hydrated handle is left as is.
    pub async fn hydrate(&mut self, repository: &JobRepository) -> Result<&mut Self, JobError> {
        self.live(repository).await?;
        Ok(self)
    }

    /// The live record, hydrating first when needed.
    pub async fn get_record(&mut self, repository: &JobRepository) -> Result<&mut J, JobError> {
        self.live(repository).await
    }

    async fn live(&mut self, repository: &JobRepository) -> Result<&mut J, JobError> {
        if self.variant != J::VARIANT || self.collection != J::COLLECTION {
            return Err(JobError::VariantMismatch {
                expected: format!("{}.{}", J::COLLECTION, J::VARIANT),
                found: format!("{}.{}", self.collection, self.variant),
            });
        }
        let job = match self.job.take() {
            Some(job) => job,
            None => {
                let id = self.id.ok_or_else(|| {
                    JobError::not_found(format!("{} handle carries no id", self.variant))
                })?;
                repository.load::<J>(id).await?
            }
        };
        Ok(self.job.insert(job))
    }

    pub async fn start(
        &mut self,
        lifecycle: &Lifecycle,
    ) -> Result<(JobState, JobStatus, DateTime<Utc>), JobError> {
        let job = self.live(lifecycle.repository()).await?;
        lifecycle.start(job).await
    }

    pub async fn stop(
        &mut self,
        lifecycle: &Lifecycle,
    ) -> Result<(JobState, JobStatus, TimeDelta), JobError> {
        let job = self.live(lifecycle.repository()).await?;
        lifecycle.stop(job).await
    }

    pub async fn failed(
        &mut self,
        lifecycle: &Lifecycle,
        payload: FailurePayload,
    ) -> Result<(), JobError> {
        let job = self.live(lifecycle.repository()).await?;
        lifecycle.failed(job, payload).await
    }

    pub async fn has_failed(&mut self, lifecycle: &Lifecycle) -> Result<bool, JobError> {
        let job = self.live(lifecycle.repository()).await?;
        Ok(lifecycle.has_failed(job))
    }
}

impl<J> fmt::Debug for JobHandle<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .field("variant", &self.variant)
            .field("hydrated", &self.job.is_some())
            .finish()
    }
}

#[derive(Serialize)]
struct IdentityRef<'a> {
    id: JobId,
    collection: &'a str,
    variant: &'a str,
}

#[derive(Deserialize)]
struct Identity {
    id: JobId,
    collection: String,
    variant: String,
}

impl<J: JobVariant> Serialize for JobHandle<J> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let id = self.id().ok_or_else(|| {
            serde::ser::Error::custom(format!(
                "cannot serialize a {} handle without an id",
                self.variant
            ))
        })?;
        IdentityRef {
            id,
            collection: &self.collection,
            variant: &self.variant,
        }
        .serialize(serializer)
    }
}

impl<'de, J> Deserialize<'de> for JobHandle<J> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let identity = Identity::deserialize(deserializer)?;
        Ok(Self {
            job: None,
            id: Some(identity.id),
            collection: identity.collection,
            variant: identity.variant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CustomRootJob, TestJob, harness};
    use serde_json::json;

    #[test]
    fn dehydrating_an_unsaved_job_is_not_found() {
        let job = TestJob::new(chrono::Utc::now());
        let mut handle = JobHandle::new(job);
        let err = handle.dehydrate().unwrap_err();
        assert!(err.is_not_found());
        assert!(handle.is_hydrated());
    }

    #[test]
    fn serializing_an_unsaved_job_fails() {
        let handle = JobHandle::new(TestJob::new(chrono::Utc::now()));
        assert!(serde_json::to_value(&handle).is_err());
    }

    #[tokio::test]
    async fn dehydrate_then_hydrate_restores_the_record() {
        let h = harness(60);
        let mut job = TestJob::new(h.now()).with_identifier("hh");
        h.repository().create(&mut job).await.unwrap();
        let id = job.record().id.unwrap();

        let mut handle = JobHandle::new(job);
        handle.dehydrate().unwrap();
        assert!(!handle.is_hydrated());
        assert_eq!(
            serde_json::to_value(&handle).unwrap(),
            json!({
                "id": id.as_ulid().to_string(),
                "collection": "jobs",
                "variant": "TestJob",
            })
        );

        let job = handle.get_record(h.repository()).await.unwrap();
        assert_eq!(job.record().identifier, "hh");
    }

    #[tokio::test]
    async fn hydrate_after_delete_is_not_found() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();
        let mut handle = JobHandle::new(job.clone()).dehydrated().unwrap();

        h.repository().delete(&job).await.unwrap();
        let err = handle.hydrate(h.repository()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn hydrate_is_idempotent() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();
        let mut handle = JobHandle::new(job.clone());

        // no lookup happens once hydrated, so a deleted row goes unnoticed
        h.repository().delete(&job).await.unwrap();
        handle.hydrate(h.repository()).await.unwrap();
        handle.hydrate(h.repository()).await.unwrap();
        assert_eq!(handle.record().unwrap().record(), job.record());
    }

    #[tokio::test]
    async fn hydrating_as_another_variant_is_rejected() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();
        let json = serde_json::to_value(JobHandle::new(job)).unwrap();

        let mut wrong: JobHandle<CustomRootJob> = serde_json::from_value(json).unwrap();
        let err = wrong.hydrate(h.repository()).await.unwrap_err();
        assert!(matches!(err, JobError::VariantMismatch { .. }));
    }

    #[tokio::test]
    async fn delegates_hydrate_first() {
        let h = harness(60);
        let mut job = TestJob::new(h.now());
        h.repository().create(&mut job).await.unwrap();
        let mut handle = JobHandle::<TestJob>::from_id(job.record().id.unwrap());

        let (state, _, _) = handle.start(&h.lifecycle).await.unwrap();
        assert_eq!(state, JobState::Running);
        assert!(handle.is_hydrated());

        handle
            .failed(
                &h.lifecycle,
                FailurePayload {
                    task: "t".into(),
                    exception: "E".into(),
                    msg: "m".into(),
                },
            )
            .await
            .unwrap();
        assert!(handle.has_failed(&h.lifecycle).await.unwrap());
        let (state, status, _) = handle.stop(&h.lifecycle).await.unwrap();
        assert_eq!((state, status), (JobState::Completed, JobStatus::Failure));
    }
}
