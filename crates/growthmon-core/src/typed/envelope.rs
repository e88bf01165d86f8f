//! StepEnvelope - ステップ間で受け渡す唯一の形
//!
//! `(handle, results)` のペア。results は常にリスト（空でもよい）で、
//! ステップが追加した順番を保ちます。

use serde::{Deserialize, Serialize};

use crate::app::JobHandle;
use crate::domain::JobVariant;

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "J: JobVariant", deserialize = ""))]
pub struct StepEnvelope<J> {
    pub handle: JobHandle<J>,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

impl<J: JobVariant> StepEnvelope<J> {
    pub fn new(handle: JobHandle<J>) -> Self {
        Self {
            handle,
            results: Vec::new(),
        }
    }

    /// Append one result after the ones accumulated so far.
    pub fn push(mut self, value: serde_json::Value) -> Self {
        self.results.push(value);
        self
    }

    /// Append several results, keeping their order.
    pub fn extend<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = serde_json::Value>,
    {
        self.results.extend(values);
        self
    }

    pub fn results(&self) -> &[serde_json::Value] {
        &self.results
    }

    pub fn into_parts(self) -> (JobHandle<J>, Vec<serde_json::Value>) {
        (self.handle, self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobId;
    use crate::testing::TestJob;
    use serde_json::json;
    use ulid::Ulid;

    #[test]
    fn results_keep_call_order() {
        let handle = JobHandle::<TestJob>::from_id(JobId::from_ulid(Ulid::new()));
        let envelope = StepEnvelope::new(handle)
            .push(json!(true))
            .push(json!(2))
            .extend([json!("a"), json!("b")]);

        assert_eq!(
            envelope.results(),
            &[json!(true), json!(2), json!("a"), json!("b")]
        );
    }

    #[test]
    fn envelope_serializes_handle_identity_and_results() {
        let id = JobId::from_ulid(Ulid::new());
        let envelope = StepEnvelope::new(JobHandle::<TestJob>::from_id(id)).push(json!(1));

        let v = serde_json::to_value(&envelope).unwrap();
        assert_eq!(v["handle"]["id"], json!(id.as_ulid().to_string()));
        assert_eq!(v["handle"]["variant"], "TestJob");
        assert_eq!(v["results"], json!([1]));

        let back: StepEnvelope<TestJob> = serde_json::from_value(v).unwrap();
        assert_eq!(back.handle.id(), Some(id));
        assert!(!back.handle.is_hydrated());
    }
}
