pub mod config;
pub mod deadline;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod worker;

pub use config::{ConfigError, MergeStrategy, PipelineConfig};
pub use deadline::Deadline;
pub use pipeline::{Pipeline, PipelineError, RunReport};
pub use pool::{PoolError, PoolOutcome, WorkerPool};
pub use queue::TaskQueue;
pub use worker::{WorkerExit, WorkerReport};
