use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use growthmon_core::app::{ChainBuilder, JobHandle, JobRepository, Lifecycle};
use growthmon_core::config::MonitorConfig;
use growthmon_core::domain::{JobRecord, JobSummary, JobVariant};
use growthmon_core::impls::{InMemoryJobStore, InlineTaskQueue};
use growthmon_core::ports::SystemClock;
use growthmon_core::typed::{Step, StepContext, StepEnvelope, StepError};

#[derive(Debug, Serialize, Deserialize)]
struct DemoJob {
    #[serde(flatten)]
    record: JobRecord,
    #[serde(default)]
    greeting: Option<String>,
}

impl JobVariant for DemoJob {
    const VARIANT: &'static str = "DemoJob";

    fn record(&self) -> &JobRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }
}

/// 挨拶を組み立ててレコードに保存する
struct Greet;

#[async_trait]
impl Step<DemoJob> for Greet {
    fn name(&self) -> &str {
        "greet"
    }

    async fn run(
        &self,
        ctx: &StepContext,
        mut envelope: StepEnvelope<DemoJob>,
    ) -> Result<StepEnvelope<DemoJob>, StepError> {
        let job = envelope.handle.get_record(ctx.repository()).await?;
        let greeting = format!("Hello, {}!", job.record.identifier);
        println!("{greeting}");
        job.greeting = Some(greeting.clone());
        ctx.repository().save(job).await?;
        Ok(envelope.push(json!(greeting)))
    }
}

/// 静的に束縛した引数（factor）を使うステップ
struct Multiply {
    factor: i64,
}

#[async_trait]
impl Step<DemoJob> for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    async fn run(
        &self,
        _ctx: &StepContext,
        envelope: StepEnvelope<DemoJob>,
    ) -> Result<StepEnvelope<DemoJob>, StepError> {
        let count = envelope.results().len() as i64;
        Ok(envelope.extend([json!(true), json!(count * self.factor)]))
    }
}

struct Explode;

#[async_trait]
impl Step<DemoJob> for Explode {
    fn name(&self) -> &str {
        "explode"
    }

    async fn run(
        &self,
        _ctx: &StepContext,
        _envelope: StepEnvelope<DemoJob>,
    ) -> Result<StepEnvelope<DemoJob>, StepError> {
        Err(StepError::failed("RuntimeError", "boom"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut identifier = "demo".to_string();
    let mut fail = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--fail" => fail = true,
            other => identifier = other.to_string(),
        }
    }

    let config = MonitorConfig::load().context("loading GROWTHMON_* configuration")?;
    info!(ttl_secs = config.ttl_secs, media_root = %config.media_root.display(), "config loaded");

    let repository = Arc::new(JobRepository::with_local_files(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(SystemClock),
        config,
    ));
    let lifecycle = Arc::new(Lifecycle::new(repository.clone()));

    let mut job = DemoJob {
        record: repository.new_record().with_identifier(identifier),
        greeting: None,
    };
    repository
        .create(&mut job)
        .await
        .context("creating the demo job")?;
    let id = job.record.id.context("created job has no id")?;

    let mut builder = ChainBuilder::new(lifecycle.clone())
        .step(Greet)
        .step(Multiply { factor: 2 });
    if fail {
        builder = builder.step(Explode);
    }
    let chain = builder.build(JobHandle::new(job)).await?;
    info!(steps = ?chain.step_names(), "running chain");

    let envelope = chain.run(&InlineTaskQueue).await?;
    let job: DemoJob = repository.load(id).await?;

    println!("{}", JobSummary(&job));
    let report = json!({
        "slug": job.record.slug,
        "state": job.record.state,
        "status": job.record.status,
        "duration_ms": job.record.duration().map(|d| d.num_milliseconds()),
        "closure": job.record.closure,
        "greeting": job.greeting,
        "error": job.record.error,
        "results": envelope.results(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
