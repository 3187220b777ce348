use crate::queue::TaskQueue;
use parking_lot::Mutex;
use polystats_core::{Aggregate, TaskStats};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Every task was handed out
    QueueExhausted,
    /// The deadline expired before the worker could pick up another task
    DeadlineExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub tasks_processed: usize,
    pub exit: WorkerExit,
}

/// Where a worker folds its task statistics
pub(crate) enum Sink {
    /// Private aggregate handed back when the worker exits
    Partial,
    /// Aggregate shared by the whole pool
    Shared(Arc<Mutex<Aggregate>>),
}

/// One pool member draining the task queue
pub(crate) struct Worker {
    id: usize,
    queue: Arc<TaskQueue>,
    cancel: CancellationToken,
    sink: Sink,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        queue: Arc<TaskQueue>,
        cancel: CancellationToken,
        sink: Sink,
    ) -> Self {
        Worker {
            id,
            queue,
            cancel,
            sink,
        }
    }

    /// Run until the queue is drained or the deadline expires.
    ///
    /// Returns the worker's private aggregate, which stays empty when folding
    /// into a shared sink.
    pub(crate) async fn run(self) -> (WorkerReport, Aggregate) {
        let mut partial = Aggregate::new();
        let mut tasks_processed = 0;

        let exit = loop {
            let task = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break WorkerExit::DeadlineExpired,

                next = self.queue.next() => match next {
                    Some(task) => task,
                    None => break WorkerExit::QueueExhausted,
                },
            };

            // Runs to completion even if the deadline fires meanwhile
            let stats = TaskStats::compute(&task);
            match &self.sink {
                Sink::Partial => partial.record(&stats, &task.polygon),
                Sink::Shared(shared) => shared.lock().record(&stats, &task.polygon),
            }
            tasks_processed += 1;
        };

        debug!(
            "Worker {} exited ({:?}) after {} tasks",
            self.id, exit, tasks_processed
        );

        let report = WorkerReport {
            worker_id: self.id,
            tasks_processed,
            exit,
        };
        (report, partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystats_core::{Bbox, Polygon, Task, WeightedPoint};
    use std::time::Duration;

    fn queue_of(polygons: Vec<Polygon>) -> Arc<TaskQueue> {
        Arc::new(TaskQueue::load(Task::from_polygons(polygons)).unwrap())
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let queue = queue_of(vec![
            Polygon::new(vec![WeightedPoint::new(1, 1, 101.0)]),
            Polygon::new(vec![WeightedPoint::new(-3, 7, 2.0)]),
        ]);
        let worker = Worker::new(0, queue.clone(), CancellationToken::new(), Sink::Partial);

        let (report, partial) = worker.run().await;

        assert_eq!(report.exit, WorkerExit::QueueExhausted);
        assert_eq!(report.tasks_processed, 2);
        assert_eq!(partial.bbox, Bbox::new(-3, 1, 1, 7));
        assert_eq!(partial.heavy_count(), 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_worker_takes_nothing() {
        let queue = queue_of(vec![Polygon::new(vec![WeightedPoint::new(0, 0, 1.0)])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (report, partial) = Worker::new(4, queue.clone(), cancel, Sink::Partial).run().await;

        assert_eq!(report.worker_id, 4);
        assert_eq!(report.exit, WorkerExit::DeadlineExpired);
        assert_eq!(report.tasks_processed, 0);
        assert_eq!(partial, Aggregate::new());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_sink_leaves_partial_empty() {
        let queue = queue_of(vec![Polygon::new(vec![WeightedPoint::new(2, 3, 50.0)])]);
        let shared = Arc::new(Mutex::new(Aggregate::new()));

        let (report, partial) = Worker::new(0, queue, CancellationToken::new(), Sink::Shared(shared.clone()))
            .run()
            .await;

        assert_eq!(report.tasks_processed, 1);
        assert!(partial.is_empty());
        assert_eq!(shared.lock().max_weight, 50.0);
        assert_eq!(shared.lock().bbox, Bbox::new(2, 3, 2, 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_in_flight_task_kept_after_cancel() {
        let tasks = Task::from_polygons(vec![
            Polygon::new(vec![WeightedPoint::new(-2, 4, 70.0), WeightedPoint::new(1, 0, 40.0)]),
            Polygon::new(vec![WeightedPoint::new(9, 9, 1.0)]),
            Polygon::new(vec![WeightedPoint::new(-9, -9, 1.0)]),
        ]);
        let queue = Arc::new(TaskQueue::load(tasks.clone()).unwrap());
        let shared = Arc::new(Mutex::new(Aggregate::new()));
        let cancel = CancellationToken::new();

        // Hold the sink so the worker stalls mid-task
        let guard = shared.lock();
        let worker = Worker::new(0, queue.clone(), cancel.clone(), Sink::Shared(shared.clone()));
        let handle = tokio::spawn(worker.run());

        while queue.len() == tasks.len() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
        drop(guard);

        let (report, partial) = handle.await.unwrap();

        assert_eq!(report.exit, WorkerExit::DeadlineExpired);
        assert_eq!(report.tasks_processed, 1);
        assert!(partial.is_empty());
        assert_eq!(*shared.lock(), Aggregate::from_tasks(&tasks[..1]));
        assert_eq!(queue.len(), tasks.len() - 1);
    }
}
