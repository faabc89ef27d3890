//! Preparation executor.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use vidbot_models::{DedupKey, FailureKind, JobStatus, PreparationJob, PreparationOutcome};

use crate::admission::{AdmissionGate, AdmissionGuard};
use crate::collaborators::Notifier;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics::{record_admission, record_job};
use crate::prepare::Preparer;

struct ExecutorContext {
    semaphore: Arc<Semaphore>,
    preparer: Arc<Preparer>,
    notifier: Arc<dyn Notifier>,
}

/// Admits jobs by dedup key and runs them detached under a concurrency ceiling.
#[derive(Clone)]
pub struct PreparationExecutor {
    gate: AdmissionGate,
    ctx: Arc<ExecutorContext>,
}

impl PreparationExecutor {
    pub fn new(preparer: Preparer, notifier: Arc<dyn Notifier>, max_concurrent_jobs: usize) -> Self {
        Self {
            gate: AdmissionGate::new(),
            ctx: Arc::new(ExecutorContext {
                semaphore: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
                preparer: Arc::new(preparer),
                notifier,
            }),
        }
    }

    /// Admit `job` under `key` and run it in the background.
    ///
    /// Returns `false` without doing anything if another job holds the key.
    /// Never waits for a permit; must be called within a Tokio runtime.
    pub fn start(&self, key: DedupKey, job: PreparationJob) -> bool {
        let Some(guard) = self.gate.try_admit(key.as_str()) else {
            record_admission(false);
            debug!(key = %key, "Preparation already in progress");
            return false;
        };
        record_admission(true);
        info!(key = %key, job_id = %job.job_id, "Preparation admitted");

        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            ctx.run_job(guard, job).await;
        });
        true
    }

    /// Admit `job` under its own dedup key.
    pub fn submit(&self, job: PreparationJob) -> bool {
        self.start(job.dedup_key(), job)
    }

    /// Like [`submit`](Self::submit), reporting a rejection as an error.
    pub fn try_submit(&self, job: PreparationJob) -> WorkerResult<()> {
        let key = job.dedup_key();
        if self.start(key.clone(), job) {
            Ok(())
        } else {
            Err(WorkerError::already_in_progress(key.as_str()))
        }
    }

    /// Number of admitted jobs that have not finished.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Wait until every admitted job has finished and released its key.
    pub async fn wait_idle(&self) {
        self.gate.wait_idle().await;
    }
}

impl ExecutorContext {
    async fn run_job(&self, guard: AdmissionGuard, mut job: PreparationJob) {
        let started = Instant::now();
        let job_id = job.job_id.clone();
        let requester = job.requester;

        let outcome = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => {
                job.status = JobStatus::Running;
                debug!(job_id = %job_id, key = guard.key(), "Preparation running");

                let preparer = Arc::clone(&self.preparer);
                // A separate task so a panic surfaces as a JoinError here.
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    preparer.run(job).await
                });

                match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => {
                        error!(job_id = %job_id, "Preparation panicked");
                        PreparationOutcome::failure(FailureKind::Internal)
                    }
                    Err(e) => {
                        error!(job_id = %job_id, error = %e, "Preparation task aborted");
                        PreparationOutcome::failure(FailureKind::Internal)
                    }
                }
            }
            Err(_) => {
                error!(job_id = %job_id, "Job semaphore closed");
                PreparationOutcome::failure(FailureKind::Internal)
            }
        };

        let status = if outcome.is_success() {
            JobStatus::Done
        } else {
            JobStatus::Failed
        };
        let elapsed = started.elapsed().as_secs_f64();
        record_job(outcome.label(), elapsed);
        info!(
            job_id = %job_id,
            status = %status,
            outcome = outcome.label(),
            elapsed_secs = elapsed,
            "Preparation finished"
        );

        if let Err(e) = self.notifier.notify(requester, &outcome).await {
            warn!(job_id = %job_id, error = %e, "Failed to notify requester");
        }

        drop(guard);
    }
}
