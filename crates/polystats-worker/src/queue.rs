use crate::pool::PoolError;
use polystats_core::Task;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};

/// Fixed set of tasks shared by the workers of a pool.
///
/// The queue is filled and closed for writes when it is built. `next`
/// yields tasks until the set is drained, then returns `None` to every
/// caller.
pub struct TaskQueue {
    receiver: Mutex<mpsc::Receiver<Task>>,
    remaining: AtomicUsize,
    capacity: usize,
}

impl TaskQueue {
    pub fn load(tasks: Vec<Task>) -> Result<Self, PoolError> {
        let capacity = tasks.len();
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        for task in tasks {
            let index = task.index;
            sender
                .try_send(task)
                .map_err(|_| PoolError::QueueRejected { index })?;
        }
        drop(sender);

        Ok(TaskQueue {
            receiver: Mutex::new(receiver),
            remaining: AtomicUsize::new(capacity),
            capacity,
        })
    }

    /// Queue still open for writes, fed by the returned sender
    #[cfg(test)]
    pub(crate) fn open(capacity: usize, expected: usize) -> (mpsc::Sender<Task>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let queue = TaskQueue {
            receiver: Mutex::new(receiver),
            remaining: AtomicUsize::new(expected),
            capacity: expected,
        };
        (sender, queue)
    }

    /// Next task, or `None` once the queue is drained.
    ///
    /// Cancel-safe: dropping the future never loses a task.
    pub async fn next(&self) -> Option<Task> {
        let mut receiver = self.receiver.lock().await;
        let task = receiver.recv().await;
        if task.is_some() {
            self.remaining.fetch_sub(1, Ordering::Relaxed);
        }
        task
    }

    /// Tasks not yet handed out
    pub fn len(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tasks the queue was loaded with
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystats_core::{Polygon, WeightedPoint};

    fn tasks(n: usize) -> Vec<Task> {
        Task::from_polygons(
            (0..n)
                .map(|i| Polygon::new(vec![WeightedPoint::new(i as i64, 0, 1.0)]))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_drains_in_fetch_order() {
        let queue = TaskQueue::load(tasks(3)).unwrap();
        assert_eq!(queue.len(), 3);

        for expected in 0..3 {
            assert_eq!(queue.next().await.unwrap().index, expected);
        }

        assert!(queue.is_empty());
        assert!(queue.next().await.is_none());
        assert!(queue.next().await.is_none());
        assert_eq!(queue.capacity(), 3);
    }

    #[tokio::test]
    async fn test_empty_queue_is_closed() {
        let queue = TaskQueue::load(Vec::new()).unwrap();

        assert!(queue.is_empty());
        assert!(queue.next().await.is_none());
    }
}
