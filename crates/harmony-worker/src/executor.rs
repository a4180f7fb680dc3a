//! Job executor: runs a job and contains its failure.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, error, warn};

use harmony_core::error::AppError;

/// A unit of work run once by a scheduler.
pub trait Job: Send + Sync + fmt::Debug {
    /// Get the job type, used in logs.
    fn job_type(&self) -> &str;

    /// Execute the job.
    fn execute(&self) -> Result<(), JobExecutionError>;
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure. Jobs are never retried; a later job has to
    /// cover the same work.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Runs jobs, logging and counting their outcome. Nothing escapes
/// [`JobExecutor::execute`], not even a panic.
#[derive(Debug, Default)]
pub struct JobExecutor {
    completed: AtomicU64,
    failed: AtomicU64,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute a job, returning whether it completed successfully
    pub fn execute(&self, job: &dyn Job) -> bool {
        debug!(job_type = %job.job_type(), "Executing job");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.execute()));

        let succeeded = match outcome {
            Ok(Ok(())) => {
                debug!(job_type = %job.job_type(), "Job completed");
                true
            }
            Ok(Err(JobExecutionError::Transient(msg))) => {
                warn!(job_type = %job.job_type(), error = %msg, "Job failed (transient)");
                false
            }
            Ok(Err(JobExecutionError::Permanent(msg))) => {
                error!(job_type = %job.job_type(), error = %msg, "Job failed permanently");
                false
            }
            Ok(Err(JobExecutionError::Internal(err))) => {
                error!(job_type = %job.job_type(), error = %err, "Job internal error");
                false
            }
            Err(_) => {
                error!(job_type = %job.job_type(), "Job panicked");
                false
            }
        };

        if succeeded {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        succeeded
    }

    /// Number of jobs that completed successfully
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Number of jobs that failed or panicked
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
