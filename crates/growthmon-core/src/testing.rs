//! Test fixtures shared by the unit tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::app::{JobRepository, Lifecycle};
use crate::config::MonitorConfig;
use crate::domain::{DataFile, FileSlot, JobRecord, JobVariant};
use crate::impls::InMemoryJobStore;
use crate::ports::{Clock, FixedClock};
use crate::typed::StepContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestJob {
    #[serde(flatten)]
    pub record: JobRecord,
}

impl TestJob {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            record: JobRecord::new(timestamp),
        }
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.record.identifier = identifier.to_string();
        self
    }
}

impl JobVariant for TestJob {
    const VARIANT: &'static str = "TestJob";

    fn record(&self) -> &JobRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }
}

/// Requires one uploaded file, `input`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    #[serde(flatten)]
    pub record: JobRecord,
    pub input: Option<DataFile>,
}

impl UploadJob {
    pub fn new(timestamp: DateTime<Utc>, input: Option<DataFile>) -> Self {
        Self {
            record: JobRecord::new(timestamp),
            input,
        }
    }
}

impl JobVariant for UploadJob {
    const VARIANT: &'static str = "UploadJob";
    const REQUIRES_FILES: bool = true;

    fn record(&self) -> &JobRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }

    fn required_files(&mut self) -> Option<Vec<FileSlot<'_>>> {
        Some(vec![FileSlot::new("input", &mut self.input)])
    }
}

/// Claims to require files but never says which.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisconfiguredJob {
    #[serde(flatten)]
    pub record: JobRecord,
}

impl MisconfiguredJob {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            record: JobRecord::new(timestamp),
        }
    }
}

impl JobVariant for MisconfiguredJob {
    const VARIANT: &'static str = "MisconfiguredJob";
    const REQUIRES_FILES: bool = true;

    fn record(&self) -> &JobRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRootJob {
    #[serde(flatten)]
    pub record: JobRecord,
}

impl CustomRootJob {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            record: JobRecord::new(timestamp),
        }
    }
}

impl JobVariant for CustomRootJob {
    const VARIANT: &'static str = "CustomRootJob";

    fn record(&self) -> &JobRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }

    fn root_segment(&self) -> String {
        "custom".to_string()
    }

    fn results_segment(&self) -> String {
        "output".to_string()
    }
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub store: Arc<InMemoryJobStore>,
    pub lifecycle: Arc<Lifecycle>,
    media: TempDir,
}

impl Harness {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn repository(&self) -> &JobRepository {
        self.lifecycle.repository()
    }

    pub fn ctx(&self) -> StepContext {
        StepContext::new(self.lifecycle.clone())
    }

    /// Absolute path of a media-relative path.
    pub fn media_path(&self, relative: &Path) -> PathBuf {
        self.media.path().join(relative)
    }
}

/// In-memory store, temp media root, clock frozen at 2024-03-05 12:30 UTC.
pub fn harness(ttl_secs: i64) -> Harness {
    let media = tempfile::tempdir().expect("temp media root");
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 0).unwrap(),
    ));
    let store = Arc::new(InMemoryJobStore::new());
    let config = MonitorConfig::default()
        .with_ttl(ttl_secs)
        .with_media_root(media.path());

    let repository = JobRepository::with_local_files(store.clone(), clock.clone(), config);
    Harness {
        clock,
        store,
        lifecycle: Arc::new(Lifecycle::new(Arc::new(repository))),
        media,
    }
}
