//! JobRepository - 永続化・ロード・削除・パス計算
//!
//! # 学習ポイント
//! - ports（JobStore / FileStore / Clock / IdGenerator）を組み合わせるだけの層
//! - 必須ファイルは staging → 永続パスへ 2 段階で配置する
//! - slug の衝突はストアが検出し、ここで再試行する

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::layout::MediaLayout;
use crate::config::MonitorConfig;
use crate::domain::{
    DataFile, FileSlot, JobError, JobId, JobRecord, JobVariant, derive_slug, disambiguate_slug,
    validate_identifier,
};
use crate::impls::LocalFileStore;
use crate::ports::{
    Clock, FileStore, IdGenerator, JobRow, JobStore, RecordKey, StoreError, UlidGenerator,
};

/// How many times a taken slug is re-randomized before giving up.
pub const SLUG_RETRIES: usize = 5;

pub struct JobRepository {
    store: Arc<dyn JobStore>,
    files: Arc<dyn FileStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    layout: MediaLayout,
    config: MonitorConfig,
}

impl JobRepository {
    /// Files go through `files`; `config.media_root` is not consulted.
    pub fn new(
        store: Arc<dyn JobStore>,
        files: Arc<dyn FileStore>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            files,
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
            layout: MediaLayout::new(&config.app_root),
            config,
        }
    }

    /// Files live on the local disk under `config.media_root`.
    pub fn with_local_files(
        store: Arc<dyn JobStore>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
    ) -> Self {
        let files = Arc::new(LocalFileStore::new(config.media_root.clone()));
        Self::new(store, files, clock, config)
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A fresh record stamped with the current time.
    pub fn new_record(&self) -> JobRecord {
        JobRecord::new(self.now())
    }

    fn key<J: JobVariant>() -> RecordKey {
        RecordKey::new(J::COLLECTION, J::VARIANT)
    }

    fn row<J: JobVariant>(job: &J) -> Result<JobRow, JobError> {
        let record = job.record();
        let id = record.id.ok_or_else(unsaved::<J>)?;
        Ok(JobRow {
            id,
            slug: record.slug.clone(),
            closure: record.closure,
            document: serde_json::to_value(job)?,
        })
    }

    /// First persistence of a job.
    ///
    /// Validates the identifier, stages required files, derives the slug and
    /// the closure, assigns the id and inserts the row. Staged files are then
    /// moved under the job root and the results directory is created.
    /// A job that already has an id is simply saved.
    pub async fn create<J: JobVariant>(&self, job: &mut J) -> Result<(), JobError> {
        if job.record().id.is_some() {
            return self.save(job).await;
        }
        validate_identifier(&job.record().identifier)?;
        let closure = if self.config.expiry_enabled() {
            Some(self.closure_after(job.record().timestamp)?)
        } else {
            job.record().closure
        };

        let segment = job.root_segment();
        let staging_root = self
            .layout
            .staging_root(&segment, self.ids.generate_staging_id());
        let staged = match self.stage_required_files(job, &staging_root).await {
            Ok(staged) => staged,
            Err(err) => {
                self.files.remove_tree(&staging_root).await?;
                return Err(err);
            }
        };

        let record = job.record_mut();
        if record.slug.is_empty() {
            record.slug = derive_slug(&record.identifier, J::VARIANT, record.timestamp);
        }
        record.closure = closure;
        record.id = Some(self.ids.generate_job_id());

        if let Err(err) = self.insert_with_retry(job).await {
            job.record_mut().id = None;
            if staged {
                self.files.remove_tree(&staging_root).await?;
            }
            return Err(err);
        }

        let job_root = self.job_root(job)?;
        if staged {
            self.promote_staged_files(job, &staging_root, &job_root)
                .await?;
            self.save(job).await?;
        }
        self.files
            .create_dir_all(&MediaLayout::results_dir(&job_root, &job.results_segment()))
            .await?;

        debug!(variant = J::VARIANT, slug = %job.record().slug, "job created");
        Ok(())
    }

    /// `timestamp + TTL`, or `Misconfigured` when that is out of range.
    fn closure_after(&self, timestamp: DateTime<Utc>) -> Result<DateTime<Utc>, JobError> {
        self.config
            .ttl()
            .and_then(|ttl| timestamp.checked_add_signed(ttl))
            .ok_or_else(|| {
                JobError::Misconfigured(format!(
                    "ttl_secs = {} puts the closure out of range",
                    self.config.ttl_secs
                ))
            })
    }

    async fn insert_with_retry<J: JobVariant>(&self, job: &mut J) -> Result<(), JobError> {
        let key = Self::key::<J>();
        let mut attempt = 0;
        loop {
            match self.store.insert(&key, Self::row(job)?).await {
                Ok(()) => return Ok(()),
                Err(StoreError::SlugTaken(slug)) if attempt < SLUG_RETRIES => {
                    attempt += 1;
                    warn!(variant = J::VARIANT, %slug, attempt, "slug taken, retrying");
                    job.record_mut().slug = disambiguate_slug(&slug);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Write pending uploads of the required slots under `staging_root`.
    ///
    /// Every slot is checked before anything is written.
    async fn stage_required_files<J: JobVariant>(
        &self,
        job: &mut J,
        staging_root: &Path,
    ) -> Result<bool, JobError> {
        if !J::REQUIRES_FILES {
            return Ok(false);
        }
        let slots = job.required_files().ok_or_else(|| {
            JobError::Misconfigured(format!(
                "{} requires files but declares no file slots",
                J::VARIANT
            ))
        })?;
        if let Some(slot) = slots.iter().find(|slot| slot.file.is_none()) {
            return Err(JobError::MissingRequiredFile {
                variant: J::VARIANT.to_string(),
                field: slot.field.to_string(),
            });
        }

        let mut staged = false;
        for FileSlot { file, .. } in slots {
            let Some(file) = file.as_mut() else {
                continue;
            };
            if let Some(bytes) = file.take_content() {
                let path = MediaLayout::data_file(staging_root, &file.name)?;
                self.files.write(&path, &bytes).await?;
                file.path = Some(path);
                staged = true;
            }
        }
        Ok(staged)
    }

    async fn promote_staged_files<J: JobVariant>(
        &self,
        job: &mut J,
        staging_root: &Path,
        job_root: &Path,
    ) -> Result<(), JobError> {
        for FileSlot { file, .. } in job.required_files().into_iter().flatten() {
            let Some(file) = file.as_mut() else {
                continue;
            };
            let Some(from) = file.path.as_ref().filter(|p| p.starts_with(staging_root)) else {
                continue;
            };
            let to = MediaLayout::data_file(job_root, &file.name)?;
            self.files.rename(from, &to).await?;
            file.path = Some(to);
        }
        self.files.remove_tree(staging_root).await?;
        Ok(())
    }

    /// Persist an already created job.
    pub async fn save<J: JobVariant>(&self, job: &J) -> Result<(), JobError> {
        let row = Self::row(job)?;
        self.store.update(&Self::key::<J>(), row).await?;
        Ok(())
    }

    pub async fn load<J: JobVariant>(&self, id: JobId) -> Result<J, JobError> {
        let row = self.store.fetch(&Self::key::<J>(), id).await?;
        Ok(serde_json::from_value(row.document)?)
    }

    /// Delete the row, then the whole job directory.
    pub async fn delete<J: JobVariant>(&self, job: &J) -> Result<(), JobError> {
        let id = job.record().id.ok_or_else(unsaved::<J>)?;
        self.store.delete(&Self::key::<J>(), id).await?;
        self.files.remove_tree(&self.job_root(job)?).await?;
        debug!(variant = J::VARIANT, %id, "job deleted");
        Ok(())
    }

    /// Delete every job of `J` whose closure is in the past.
    ///
    /// Records that vanish in the meantime are skipped.
    pub async fn remove_expired<J: JobVariant>(&self) -> Result<usize, JobError> {
        let now = self.now();
        let expired = self.store.closing_before(&Self::key::<J>(), now).await?;

        let mut removed = 0;
        for id in expired {
            let job = match self.load::<J>(id).await {
                Ok(job) => job,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            match self.delete(&job).await {
                Ok(()) => removed += 1,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }

        info!(variant = J::VARIANT, removed, "expired jobs removed");
        Ok(removed)
    }

    /// Store an extra data file under the job's data directory.
    pub async fn attach_file<J: JobVariant>(
        &self,
        job: &mut J,
        name: &str,
        bytes: &[u8],
    ) -> Result<DataFile, JobError> {
        let path = MediaLayout::data_file(&self.job_root(job)?, name)?;
        self.files.write(&path, bytes).await?;

        let file = DataFile::stored(name, path);
        let attachments = &mut job.record_mut().attachments;
        attachments.retain(|existing| existing.name != name);
        attachments.push(file.clone());
        self.save(job).await?;
        Ok(file)
    }

    pub fn job_root<J: JobVariant>(&self, job: &J) -> Result<PathBuf, JobError> {
        let id = job.record().id.ok_or_else(unsaved::<J>)?;
        Ok(self.layout.job_root(&job.root_segment(), id))
    }

    pub fn results_dir<J: JobVariant>(&self, job: &J) -> Result<PathBuf, JobError> {
        Ok(MediaLayout::results_dir(
            &self.job_root(job)?,
            &job.results_segment(),
        ))
    }
}

fn unsaved<J: JobVariant>() -> JobError {
    JobError::not_found(format!("{} has not been persisted yet", J::VARIANT))
}
