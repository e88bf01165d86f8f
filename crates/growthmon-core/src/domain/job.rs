//! Job record: the persistent envelope around one monitored unit of work.
//!
//! Design:
//! - `JobRecord` holds the fields every job has; concrete job kinds embed it
//!   and expose it through [`JobVariant`] (composition, no base-class chain).
//! - State transitions happen through methods, never by poking fields from
//!   the outside. Persisting them is the job of `app::Lifecycle`.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::JobError;
use super::ids::JobId;
use super::state::{JobState, JobStatus};

pub const IDENTIFIER_MAX_LENGTH: usize = 32;
pub const SLUG_MAX_LENGTH: usize = 32;
pub const SLUG_RND_LENGTH: usize = 6;

/// Structured failure payload stored in `JobRecord::error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailurePayload {
    /// Name of the step that failed.
    pub task: String,
    /// Kind of the error (e.g. `RuntimeError`).
    pub exception: String,
    pub msg: String,
}

/// A data file that belongs to a job.
///
/// An upload carries its bytes until the repository writes it to disk; only
/// the name and the stored path are ever serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFile {
    pub name: String,
    /// Path relative to the media root, set once the file is stored.
    pub path: Option<PathBuf>,
    #[serde(skip)]
    content: Option<Vec<u8>>,
}

impl DataFile {
    pub fn upload(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            path: None,
            content: Some(content.into()),
        }
    }

    pub fn stored(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            content: None,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.path.is_some()
    }

    pub(crate) fn take_content(&mut self) -> Option<Vec<u8>> {
        self.content.take()
    }
}

/// A named file slot a variant declares as mandatory at creation time.
pub struct FileSlot<'a> {
    pub field: &'static str,
    pub file: &'a mut Option<DataFile>,
}

impl<'a> FileSlot<'a> {
    pub fn new(field: &'static str, file: &'a mut Option<DataFile>) -> Self {
        Self { field, file }
    }
}

/// Fields shared by every job variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Assigned at persistence time.
    pub id: Option<JobId>,
    /// Human readable identifier, as provided by the submitter.
    pub identifier: String,
    /// Unique human readable key; derived on first save when empty.
    pub slug: String,
    pub timestamp: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub state: JobState,
    pub status: JobStatus,
    duration_ms: Option<i64>,
    /// Timestamp of removal; set on first save when not given.
    pub closure: Option<DateTime<Utc>>,
    pub error: Option<FailurePayload>,
    #[serde(default)]
    pub attachments: Vec<DataFile>,
}

impl JobRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            identifier: String::new(),
            slug: String::new(),
            timestamp,
            started: None,
            state: JobState::Created,
            status: JobStatus::Active,
            duration_ms: None,
            closure: None,
            error: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn with_closure(mut self, closure: DateTime<Utc>) -> Self {
        self.closure = Some(closure);
        self
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        self.duration_ms.map(TimeDelta::milliseconds)
    }

    pub fn has_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Move to `new_state` and return the previous state.
    ///
    /// Staying in the same state is accepted; moving backward is not.
    pub fn advance(&mut self, new_state: JobState) -> Result<JobState, JobError> {
        let old_state = self.state;
        if new_state < old_state {
            return Err(JobError::IllegalTransition {
                from: old_state,
                to: new_state,
            });
        }
        self.state = new_state;
        Ok(old_state)
    }

    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.started = Some(now);
    }

    /// Compute the duration once; later calls return the cached value.
    ///
    /// Returns whether the duration was computed by this call.
    pub fn settle_duration(&mut self, now: DateTime<Utc>) -> (TimeDelta, bool) {
        if let Some(duration) = self.duration() {
            return (duration, false);
        }
        let since = self.started.unwrap_or(self.timestamp);
        let duration = now - since;
        self.duration_ms = Some(duration.num_milliseconds());
        (duration, true)
    }

    pub fn record_failure(&mut self, payload: FailurePayload) {
        self.error = Some(payload);
    }

    /// Derive the outcome status from the recorded error.
    pub fn settle_status(&mut self) -> JobStatus {
        self.status = if self.has_failed() {
            JobStatus::Failure
        } else {
            JobStatus::Success
        };
        self.status
    }
}

/// Capability interface of a concrete job kind.
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct ReportJob {
///     #[serde(flatten)]
///     record: JobRecord,
///     pages: u32,
/// }
///
/// impl JobVariant for ReportJob {
///     const VARIANT: &'static str = "ReportJob";
///     fn record(&self) -> &JobRecord { &self.record }
///     fn record_mut(&mut self) -> &mut JobRecord { &mut self.record }
/// }
/// ```
pub trait JobVariant: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Concrete variant name, stored with every handle.
    const VARIANT: &'static str;

    /// Persistence-layer collection the variant lives in.
    const COLLECTION: &'static str = "jobs";

    /// Whether files must be uploaded together with the job.
    const REQUIRES_FILES: bool = false;

    fn record(&self) -> &JobRecord;

    fn record_mut(&mut self) -> &mut JobRecord;

    /// Directory segment under the app root holding this variant's jobs.
    fn root_segment(&self) -> String {
        Self::VARIANT.to_lowercase()
    }

    /// Results sub-directory created for every job.
    fn results_segment(&self) -> String {
        "results".to_string()
    }

    /// Slots of the files required at creation.
    ///
    /// Must be overridden when `REQUIRES_FILES` is set.
    fn required_files(&mut self) -> Option<Vec<FileSlot<'_>>> {
        None
    }
}

/// `"<Variant> <id> (<state> and <status>)"`
pub struct JobSummary<'a, J>(pub &'a J);

impl<J: JobVariant> fmt::Display for JobSummary<'_, J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0.record();
        match record.id {
            Some(id) => write!(f, "{} {}", J::VARIANT, id)?,
            None => write!(f, "{} unsaved", J::VARIANT)?,
        }
        write!(f, " ({} and {})", record.state.label(), record.status.label())
    }
}

pub fn validate_identifier(identifier: &str) -> Result<(), JobError> {
    let valid = identifier.len() <= IDENTIFIER_MAX_LENGTH
        && identifier.chars().all(|c| c.is_ascii_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(JobError::InvalidIdentifier(identifier.to_string()))
    }
}

/// Default slug: identifier prefix (or the variant's initial) + `%y%m%d%H%M`.
pub fn derive_slug(identifier: &str, variant: &str, timestamp: DateTime<Utc>) -> String {
    let mut slug: String = if identifier.is_empty() {
        variant.chars().take(1).collect()
    } else {
        identifier.chars().take(SLUG_RND_LENGTH).collect()
    };
    slug.push_str(&timestamp.format("%y%m%d%H%M").to_string());
    if slug.len() > SLUG_MAX_LENGTH {
        slug = disambiguate_slug(&slug);
    }
    slug
}

/// Truncate and append a random number so the slug fits and is likely unique.
pub fn disambiguate_slug(slug: &str) -> String {
    let low = 10u32.pow(SLUG_RND_LENGTH as u32 - 1);
    let suffix = rand::thread_rng().gen_range(low..low * 10);
    let head: String = slug.chars().take(SLUG_MAX_LENGTH - SLUG_RND_LENGTH).collect();
    format!("{head}{suffix}")
}
