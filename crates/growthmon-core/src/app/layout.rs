//! MediaLayout - ジョブのファイル配置
//!
//! すべて media root からの相対パス:
//! - job root: `<app_root>/<segment>/<id>`
//! - staging root: `<app_root>/<segment>/tmp/<staging id>`
//! - data file: `<root>/data/<name>`
//! - results: `<job root>/<results segment>`

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::domain::{JobId, StagingId};

const STAGING_DIR: &str = "tmp";
const DATA_DIR: &str = "data";

#[derive(Debug, Clone)]
pub struct MediaLayout {
    app_root: PathBuf,
}

impl MediaLayout {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
        }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn job_root(&self, segment: &str, id: JobId) -> PathBuf {
        self.app_root.join(segment).join(id.as_ulid().to_string())
    }

    pub fn staging_root(&self, segment: &str, staging: StagingId) -> PathBuf {
        self.app_root
            .join(segment)
            .join(STAGING_DIR)
            .join(staging.as_ulid().to_string())
    }

    /// `<root>/data/<name>`; `name` must be a plain file name.
    pub fn data_file(root: &Path, name: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(root.join(DATA_DIR).join(name)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name:?} is not a plain file name"),
            )),
        }
    }

    pub fn results_dir(job_root: &Path, results_segment: &str) -> PathBuf {
        job_root.join(results_segment)
    }
}
