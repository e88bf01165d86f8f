//! Ports - 抽象化レイヤー
//!
//! 外部コラボレーター（永続化レイヤー、ファイルシステム、タスクキュー）への
//! インターフェースを定義します。

pub mod clock;
pub mod file_store;
pub mod id_generator;
pub mod job_store;
pub mod task_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::file_store::FileStore;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_store::{JobRow, JobStore, RecordKey, StoreError};
pub use self::task_queue::TaskQueue;
