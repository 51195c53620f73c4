use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{FailurePolicy, JobSource, PollConfig, PollError, ProgressTracker};
use crate::models::{EnhanceJob, Id};

/// Poll loop driver for one view.
///
/// Loops are independent: each poller owns its cancellation token and its
/// progress tracker and shares nothing with other pollers.
pub struct JobPoller<S> {
    source: Arc<S>,
    config: PollConfig,
    cancel: CancellationToken,
}

/// A spawned poll loop. Dropping the handle cancels the loop.
pub struct PollHandle<T, U> {
    updates: watch::Receiver<U>,
    cancel: CancellationToken,
    task: JoinHandle<Result<T, PollError>>,
    _guard: DropGuard,
}

impl<T, U> PollHandle<T, U> {
    /// Latest published state; use `changed()` on the receiver to follow it
    pub fn updates(&self) -> watch::Receiver<U> {
        self.updates.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<T, PollError> {
        let PollHandle { task, _guard, .. } = self;
        let result = task.await.map_err(|e| PollError::Aborted(e.to_string()))?;
        drop(_guard);
        result
    }
}

impl<S: JobSource + 'static> JobPoller<S> {
    pub fn new(source: Arc<S>, config: PollConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the loop to an outer token, e.g. the owning view's
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll one job until it succeeds.
    ///
    /// Each record read is published to `observer` before the success check.
    /// A failed job ends the loop with [`PollError::JobFailed`] under
    /// [`FailurePolicy::Stop`] and keeps being polled under
    /// [`FailurePolicy::KeepPolling`].
    pub async fn poll_job(
        &self,
        id: &Id,
        observer: &watch::Sender<Option<EnhanceJob>>,
    ) -> Result<EnhanceJob, PollError> {
        let mut tracker = ProgressTracker::new();
        let mut attempts = 0u32;
        let mut last_error = None;

        loop {
            self.check_continue(attempts, &mut last_error)?;
            attempts += 1;

            match self.source.fetch_job(id).await {
                Ok(Some(mut job)) => {
                    last_error = None;
                    tracker.observe(&mut job);
                    tracing::debug!(
                        job_id = %id,
                        attempt = attempts,
                        status = job.status.code(),
                        progress = job.processing_progress,
                        "job status"
                    );
                    observer.send_replace(Some(job.clone()));

                    if job.status.is_success() {
                        tracing::info!(job_id = %id, attempts, "job finished");
                        return Ok(job);
                    }
                    if job.status.is_failure() && self.config.failure_policy == FailurePolicy::Stop {
                        tracing::warn!(job_id = %id, status = job.status.code(), "job failed, polling stopped");
                        return Err(PollError::JobFailed(Box::new(job)));
                    }
                }
                Ok(None) => {
                    last_error = None;
                    tracing::debug!(job_id = %id, attempt = attempts, "job status returned no record");
                }
                Err(e) => {
                    tracing::warn!(job_id = %id, attempt = attempts, error = %e, "error fetching job status, retrying");
                    last_error = Some(e.to_string());
                }
            }

            self.pause().await?;
        }
    }

    /// Poll the active-job list until it is empty.
    ///
    /// Under [`FailurePolicy::Stop`] the loop also ends once every listed job
    /// is terminal, returning those records; otherwise it waits for the
    /// backend to drop them from the list.
    pub async fn poll_active(
        &self,
        observer: &watch::Sender<Vec<EnhanceJob>>,
    ) -> Result<Vec<EnhanceJob>, PollError> {
        let mut tracker = ProgressTracker::new();
        let mut attempts = 0u32;
        let mut last_error = None;

        loop {
            self.check_continue(attempts, &mut last_error)?;
            attempts += 1;

            match self.source.fetch_active_jobs().await {
                Ok(mut jobs) => {
                    last_error = None;
                    for job in jobs.iter_mut() {
                        tracker.observe(job);
                    }
                    let ids: Vec<Id> = jobs.iter().map(|j| j.id.clone()).collect();
                    tracker.retain(&ids);

                    tracing::debug!(attempt = attempts, active = jobs.len(), "active jobs");
                    observer.send_replace(jobs.clone());

                    if jobs.is_empty() {
                        return Ok(jobs);
                    }
                    if self.config.failure_policy == FailurePolicy::Stop
                        && jobs.iter().all(|j| j.status.is_terminal())
                    {
                        tracing::info!(remaining = jobs.len(), "no queued or processing jobs left");
                        return Ok(jobs);
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt = attempts, error = %e, "error fetching active jobs, retrying");
                    last_error = Some(e.to_string());
                }
            }

            self.pause().await?;
        }
    }

    /// Run [`poll_job`](Self::poll_job) on the runtime
    pub fn spawn_job(mut self, id: Id) -> PollHandle<EnhanceJob, Option<EnhanceJob>> {
        let (tx, rx) = watch::channel(None);
        let cancel = self.detach_token();
        let task = tokio::spawn(async move { self.poll_job(&id, &tx).await });
        PollHandle {
            updates: rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// Run [`poll_active`](Self::poll_active) on the runtime
    pub fn spawn_active(mut self) -> PollHandle<Vec<EnhanceJob>, Vec<EnhanceJob>> {
        let (tx, rx) = watch::channel(Vec::new());
        let cancel = self.detach_token();
        let task = tokio::spawn(async move { self.poll_active(&tx).await });
        PollHandle {
            updates: rx,
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    // Spawned loops run on a child token so dropping the handle never
    // cancels an outer token passed to with_cancellation
    fn detach_token(&mut self) -> CancellationToken {
        self.cancel = self.cancel.child_token();
        self.cancel.clone()
    }

    // Checked before every fetch
    fn check_continue(&self, attempts: u32, last_error: &mut Option<String>) -> Result<(), PollError> {
        if self.cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }
        match self.config.max_attempts {
            Some(max) if attempts >= max => Err(PollError::AttemptsExhausted {
                attempts,
                last_error: last_error.take(),
            }),
            _ => Ok(()),
        }
    }

    async fn pause(&self) -> Result<(), PollError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(PollError::Cancelled),
            _ = tokio::time::sleep(self.config.interval) => Ok(()),
        }
    }
}
