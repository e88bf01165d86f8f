//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type で型分けしています。
//! - `JobId`: 永続化時に割り当てられる Job Record の ID
//! - `StagingId`: ID 確定前のアップロードを一時的に置くための ID
//!
//! `JobId` と `StagingId` は同じ 128-bit の ULID ですが、型が違うので混同できません。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// Marker trait providing the display prefix of each id type.
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "job-"）
    fn prefix() -> &'static str;
}

/// Generic ULID-backed id.
///
/// `T` is only a compile-time marker and does not occupy memory.
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = ulid::DecodeError;

    /// Accepts both the prefixed display form and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw).map(Self::from_ulid)
    }
}

/// Job のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

/// Staging area のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Staging {}

impl IdMarker for Staging {
    fn prefix() -> &'static str {
        "staging-"
    }
}

/// Identifier of a persisted Job Record.
pub type JobId = Id<Job>;

/// Identifier of a temporary upload area used before a record has a `JobId`.
pub type StagingId = Id<Staging>;
