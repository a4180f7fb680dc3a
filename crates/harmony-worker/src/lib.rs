//! Job scheduling and execution for Harmony.
//!
//! This crate provides:
//! - The `Job` trait and the job-boundary error type
//! - A job executor that runs jobs and contains their failures
//! - A queue handle implementing `JobScheduler`, drained by a worker runner
//! - An immediate scheduler that runs jobs on the calling thread

pub mod executor;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{Job, JobExecutionError, JobExecutor};
pub use queue::{JobQueue, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::{ImmediateScheduler, JobScheduler};
