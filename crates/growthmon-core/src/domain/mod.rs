//! Domain model (ids, state machine, job record, errors).

pub mod errors;
pub mod ids;
pub mod job;
pub mod state;

pub use errors::JobError;
pub use ids::{JobId, StagingId};
pub use job::{
    DataFile, FailurePayload, FileSlot, JobRecord, JobSummary, JobVariant, derive_slug,
    disambiguate_slug, validate_identifier,
};
pub use state::{JobState, JobStatus};
