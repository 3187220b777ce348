use crate::config::MergeStrategy;
use crate::queue::TaskQueue;
use crate::worker::{Sink, Worker, WorkerExit, WorkerReport};
use parking_lot::Mutex;
use polystats_core::{Aggregate, TaskIndex};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pool size must be at least 1")]
    InvalidPoolSize,

    #[error("Task queue rejected task {index}")]
    QueueRejected { index: TaskIndex },

    #[error("Worker failed: {0}")]
    WorkerFailed(#[from] JoinError),
}

/// Result of draining a task queue
#[derive(Debug, Clone)]
pub struct PoolOutcome {
    pub aggregate: Aggregate,
    /// One report per worker, ordered by worker id
    pub reports: Vec<WorkerReport>,
}

impl PoolOutcome {
    pub fn tasks_processed(&self) -> usize {
        self.reports.iter().map(|r| r.tasks_processed).sum()
    }

    /// Workers that stopped because the deadline expired
    pub fn workers_cancelled(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.exit == WorkerExit::DeadlineExpired)
            .count()
    }
}

/// Fixed-size pool of workers folding polygon statistics
pub struct WorkerPool {
    size: usize,
    strategy: MergeStrategy,
}

impl WorkerPool {
    pub fn new(size: usize, strategy: MergeStrategy) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidPoolSize);
        }
        Ok(WorkerPool { size, strategy })
    }

    /// Drain `queue` with every worker and fold their results.
    ///
    /// Returns once every worker has exited, either because the queue ran dry
    /// or because `cancel` fired. Tasks finished before cancellation stay in
    /// the aggregate.
    pub async fn run(&self, queue: TaskQueue, cancel: CancellationToken) -> Result<PoolOutcome, PoolError> {
        let queue = Arc::new(queue);
        let task_count = queue.len();

        info!(
            "Starting {} workers on {} tasks ({})",
            self.size, task_count, self.strategy
        );

        let shared = match self.strategy {
            MergeStrategy::PartialReduce => None,
            MergeStrategy::Locked => Some(Arc::new(Mutex::new(Aggregate::new()))),
        };

        // Every handle exists before the first join
        let handles: Vec<_> = (0..self.size)
            .map(|id| {
                let sink = match &shared {
                    Some(shared) => Sink::Shared(shared.clone()),
                    None => Sink::Partial,
                };
                let worker = Worker::new(id, queue.clone(), cancel.clone(), sink);
                tokio::spawn(worker.run())
            })
            .collect();

        let mut reports = Vec::with_capacity(self.size);
        let mut partials = Vec::with_capacity(self.size);
        let mut failure = None;

        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok((report, partial)) => {
                    reports.push(report);
                    partials.push(partial);
                }
                Err(e) => {
                    error!("Worker task failed: {}", e);
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(e) = failure {
            return Err(PoolError::WorkerFailed(e));
        }

        let mut aggregate = Aggregate::reduce(partials);
        if let Some(shared) = shared {
            let folded = match Arc::try_unwrap(shared) {
                Ok(mutex) => mutex.into_inner(),
                Err(shared) => shared.lock().clone(),
            };
            aggregate.merge(folded);
        }

        let outcome = PoolOutcome { aggregate, reports };
        let processed = outcome.tasks_processed();

        if processed < task_count {
            warn!(
                "Deadline cut processing short: {} of {} tasks processed",
                processed, task_count
            );
        } else {
            info!("All {} tasks processed", processed);
        }

        Ok(outcome)
    }
}
