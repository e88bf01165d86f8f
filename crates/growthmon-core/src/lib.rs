//! growthmon-core
//!
//! Lifecycle tracking for jobs that run as chains of queued steps.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, job record, errors）
//! - **ports**: 抽象化レイヤー（JobStore, FileStore, TaskQueue, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（repository, lifecycle, handle, chain）
//! - **typed**: 型付き Step API（Step trait, DynStep, StepEnvelope）
//! - **impls**: 実装（InMemoryJobStore, LocalFileStore, InlineTaskQueue）
//! - **config**: MonitorConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::app::{Chain, ChainBuilder, JobHandle, JobRepository, Lifecycle};
pub use crate::config::MonitorConfig;
pub use crate::domain::{JobError, JobRecord, JobState, JobStatus, JobVariant};
pub use crate::typed::{Step, StepContext, StepEnvelope, StepError};
