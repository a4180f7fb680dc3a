//! Job queue handle for enqueuing jobs onto a worker runner.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use harmony_core::error::AppError;

use crate::executor::Job;
use crate::scheduler::JobScheduler;

/// Counters shared between a queue and its runner.
#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    pub(crate) enqueued: AtomicU64,
    pub(crate) started: AtomicU64,
}

/// Handle for enqueuing jobs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Sending half of the runner's queue
    sender: mpsc::UnboundedSender<Box<dyn Job>>,
    /// Worker identifier the queue feeds
    worker_id: String,
    counters: Arc<QueueCounters>,
}

impl JobQueue {
    pub(crate) fn new(
        sender: mpsc::UnboundedSender<Box<dyn Job>>,
        worker_id: String,
        counters: Arc<QueueCounters>,
    ) -> Self {
        Self {
            sender,
            worker_id,
            counters,
        }
    }

    /// Enqueue a job. Never blocks.
    pub fn enqueue(&self, job: Box<dyn Job>) -> Result<(), AppError> {
        let job_type = job.job_type().to_string();

        self.sender.send(job).map_err(|_| {
            AppError::scheduler(format!(
                "Worker '{}' is shut down, cannot enqueue '{}'",
                self.worker_id, job_type
            ))
        })?;
        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

        debug!(job_type = %job_type, worker_id = %self.worker_id, "Job enqueued");
        Ok(())
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        let enqueued = self.counters.enqueued.load(Ordering::Relaxed);
        let started = self.counters.started.load(Ordering::Relaxed);

        QueueStats {
            enqueued,
            pending: enqueued.saturating_sub(started),
            worker_id: self.worker_id.clone(),
        }
    }
}

impl JobScheduler for JobQueue {
    fn schedule(&self, job: Box<dyn Job>) -> Result<(), AppError> {
        self.enqueue(job)
    }
}

/// Queue statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of jobs ever enqueued
    pub enqueued: u64,
    /// Number of jobs not yet picked up by the runner
    pub pending: u64,
    /// Worker identifier
    pub worker_id: String,
}
