//! Impls - 実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryJobStore**: 開発用の正本
//! - **LocalFileStore**: ローカルディスクの media root
//! - **InlineTaskQueue**: 同一プロセスで JSON 境界を越えて実行するキュー

pub mod inline_queue;
pub mod local_files;
pub mod memory_store;

pub use self::inline_queue::InlineTaskQueue;
pub use self::local_files::LocalFileStore;
pub use self::memory_store::InMemoryJobStore;
