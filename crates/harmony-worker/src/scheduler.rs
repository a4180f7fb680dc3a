//! Scheduler abstraction: "run this job once".

use std::fmt;
use std::sync::Arc;

use harmony_core::AppResult;

use crate::executor::{Job, JobExecutor};

/// Accepts jobs for execution.
///
/// `schedule` must not run the job on a lock the caller might hold; it
/// either queues the job or runs it on the calling thread.
pub trait JobScheduler: Send + Sync + fmt::Debug {
    /// Schedule one execution of `job`.
    fn schedule(&self, job: Box<dyn Job>) -> AppResult<()>;
}

/// Runs every job synchronously on the scheduling thread.
#[derive(Debug, Default, Clone)]
pub struct ImmediateScheduler {
    executor: Arc<JobExecutor>,
}

impl ImmediateScheduler {
    /// Create a new immediate scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the executor, for outcome counters
    pub fn executor(&self) -> &Arc<JobExecutor> {
        &self.executor
    }
}

impl JobScheduler for ImmediateScheduler {
    fn schedule(&self, job: Box<dyn Job>) -> AppResult<()> {
        self.executor.execute(job.as_ref());
        Ok(())
    }
}
