use crate::config::{ConfigError, PipelineConfig};
use crate::deadline::Deadline;
use crate::pool::{PoolError, WorkerPool};
use crate::queue::TaskQueue;
use crate::worker::WorkerReport;
use chrono::{DateTime, Utc};
use polystats_client::{FetchError, Fetcher, HttpPolygonSource, PolygonSource};
use polystats_core::{Aggregate, Task};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Worker pool failed: {0}")]
    Pool(#[from] PoolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build polygon source: {0}")]
    Source(#[from] reqwest::Error),

    #[error("Run cancelled before all polygons were fetched")]
    Cancelled,
}

/// Everything known about a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub requested: usize,
    pub aggregate: Aggregate,
    pub workers: Vec<WorkerReport>,
}

impl RunReport {
    pub fn tasks_processed(&self) -> usize {
        self.aggregate.tasks_processed()
    }

    /// Tasks left untouched because the deadline expired
    pub fn tasks_skipped(&self) -> usize {
        self.requested.saturating_sub(self.tasks_processed())
    }

    /// True if every fetched polygon contributed to the aggregate
    pub fn is_complete(&self) -> bool {
        self.tasks_skipped() == 0
    }
}

/// Fetch, fan out, fold.
///
/// All polygons are fetched before any worker starts; a single fetch
/// failure aborts the run without an aggregate. Once the pool runs, an
/// expiring deadline only shrinks the set of tasks that contribute.
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn PolygonSource>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, source: Arc<dyn PolygonSource>) -> Self {
        Pipeline { config, source }
    }

    /// Pipeline reading polygons from the configured HTTP endpoint
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let source = HttpPolygonSource::new(config.source_url.clone(), config.request_timeout())?;
        Ok(Pipeline::new(config, Arc::new(source)))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run under a fresh deadline of the configured timeout
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let deadline = Deadline::start(self.config.timeout());
        self.run_with_deadline(&deadline).await
    }

    /// Run under an externally owned deadline
    pub async fn run_with_deadline(&self, deadline: &Deadline) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id);
        self.execute(run_id, deadline).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, deadline: &Deadline) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        let clock = std::time::Instant::now();
        let requested = self.config.polygons_num;
        let cancel = deadline.token();

        let pool = WorkerPool::new(self.config.pool_size, self.config.merge_strategy)?;
        let fetcher = Fetcher::new(self.source.clone());

        let polygons = tokio::select! {
            biased;

            fetched = fetcher.fetch_all(requested, deadline.expires_at()) => fetched?,
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        };

        let queue = TaskQueue::load(Task::from_polygons(polygons))?;
        let outcome = pool.run(queue, cancel).await?;

        let report = RunReport {
            run_id,
            started_at,
            elapsed: clock.elapsed(),
            requested,
            aggregate: outcome.aggregate,
            workers: outcome.reports,
        };

        info!(
            "Run finished in {:?}: {} processed, {} skipped, {} heavy",
            report.elapsed,
            report.tasks_processed(),
            report.tasks_skipped(),
            report.aggregate.heavy_count()
        );

        Ok(report)
    }
}
