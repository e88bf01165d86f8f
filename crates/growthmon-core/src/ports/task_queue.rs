//! TaskQueue port - 分散タスクランナーの抽象化
//!
//! チェーンの各ステップは独立したタスクとして配送されます。
//! ステップ間で共有されるのは payload（JSON）だけです。

use std::sync::Arc;

use async_trait::async_trait;

use crate::typed::{DynStep, StepError};

/// TaskQueue runs one step on some worker and hands back its return value.
///
/// # 設計原則
/// - payload は必ずシリアライズ境界を越える（共有メモリ前提なし）
/// - ステップの失敗は `StepError::Failed` として返し、フックの呼び出しは呼び出し側に任せる
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn dispatch(
        &self,
        step: Arc<dyn DynStep>,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, StepError>;
}
