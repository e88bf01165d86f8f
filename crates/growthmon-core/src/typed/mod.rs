//! Typed - 型付き Step API
//!
//! # 二層構造
//! - **表層（Typed）**: `Step<J>` trait, `StepEnvelope<J>` - 型安全
//! - **内部（Dyn）**: `DynStep` trait - object-safe, JSON 境界

pub mod envelope;
pub mod handler;
pub mod step;

pub use self::envelope::StepEnvelope;
pub use self::handler::{DynStep, TypedStep};
pub use self::step::{Step, StepContext, StepError, StepFailure};
