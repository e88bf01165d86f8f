//! App - アプリケーション層
//!
//! ports を組み合わせてジョブのライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **JobRepository**: 永続化・ロード・削除・パス計算
//! - **Lifecycle**: start / stop / failed / progress
//! - **JobHandle**: hydrate / dehydrate できるジョブ参照
//! - **ChainBuilder**: bookend 付きのステップチェーン

pub mod chain;
pub mod handle;
pub mod layout;
pub mod lifecycle;
pub mod repository;

pub use self::chain::{Chain, ChainBuilder, RemoveExpiredStep, StartStep, StopStep};
pub use self::handle::JobHandle;
pub use self::layout::MediaLayout;
pub use self::lifecycle::Lifecycle;
pub use self::repository::JobRepository;
