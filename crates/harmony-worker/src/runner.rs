//! Worker runner: main loop that drains the job queue and executes jobs.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc, watch};
use tracing::{debug, info};

use harmony_core::config::WorkerConfig;

use crate::executor::{Job, JobExecutor};
use crate::queue::{JobQueue, QueueCounters};

/// Main worker runner that drains its queue and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Receiving half of the queue
    receiver: mpsc::UnboundedReceiver<Box<dyn Job>>,
    /// Job executor
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
    /// Worker identifier
    worker_id: String,
    counters: Arc<QueueCounters>,
}

impl WorkerRunner {
    /// Create a new worker runner and the queue handle feeding it
    pub fn new(config: WorkerConfig, worker_id: impl Into<String>) -> (JobQueue, Self) {
        let worker_id = worker_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());

        let queue = JobQueue::new(sender, worker_id.clone(), Arc::clone(&counters));
        let runner = Self {
            receiver,
            executor: Arc::new(JobExecutor::new()),
            config,
            worker_id,
            counters,
        };

        (queue, runner)
    }

    /// Returns the executor, for outcome counters
    pub fn executor(&self) -> Arc<JobExecutor> {
        Arc::clone(&self.executor)
    }

    /// Start the worker runner. Runs until the cancel signal is received or
    /// every queue handle has been dropped, then waits for in-flight jobs.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        let concurrency = self.config.concurrency.max(1);

        info!(
            worker_id = %self.worker_id,
            concurrency,
            enabled = self.config.enabled,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!(worker_id = %self.worker_id, "Worker received shutdown signal");
                        break;
                    }
                }
                job = self.receiver.recv() => {
                    let Some(job) = job else {
                        info!(worker_id = %self.worker_id, "Worker queue closed");
                        break;
                    };
                    self.counters.started.fetch_add(1, Ordering::Relaxed);

                    if !self.config.enabled {
                        debug!(job_type = %job.job_type(), "Worker disabled, dropping job");
                        continue;
                    }

                    let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                        break;
                    };
                    let executor = Arc::clone(&self.executor);

                    tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        executor.execute(job.as_ref());
                    });
                }
            }
        }

        info!(worker_id = %self.worker_id, "Waiting for in-flight jobs to complete");

        let _ = tokio::time::timeout(
            Duration::from_secs(30),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;

        info!(worker_id = %self.worker_id, "Worker shut down complete");
    }
}
