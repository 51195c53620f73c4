//! Job status polling.
//!
//! A poll loop re-reads job state on a fixed interval until the backend
//! reports success. Fetch errors are logged and retried on the same cadence.
//! Every loop observes a [`CancellationToken`] at the top of each iteration
//! and while sleeping, so a torn-down view stops issuing requests.

pub mod progress;
pub mod runner;

pub use progress::ProgressTracker;
pub use runner::{JobPoller, PollHandle};
pub use tokio_util::sync::CancellationToken;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::PollSettings;
use crate::error::ClientResult;
use crate::models::{EnhanceJob, Id};

/// Read side of the job endpoints
#[async_trait]
pub trait JobSource: Send + Sync {
    /// `None` when the server answered without a record
    async fn fetch_job(&self, id: &Id) -> ClientResult<Option<EnhanceJob>>;

    async fn fetch_active_jobs(&self) -> ClientResult<Vec<EnhanceJob>>;
}

/// What a loop does when a job reports a failed status (`-1` / `-2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop polling the failed job
    Stop,
    /// Keep re-reading it, in case the backend retries the job
    KeepPolling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub failure_policy: FailurePolicy,
    /// Upper bound on fetch attempts; `None` polls until success or cancel
    pub max_attempts: Option<u32>,
}

impl PollConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            failure_policy: FailurePolicy::Stop,
            max_attempts: None,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Single-job cadence from settings
    pub fn for_job(settings: &PollSettings) -> Self {
        Self::new(settings.job_interval()).with_failure_policy(settings.failure_policy)
    }

    /// Active-list cadence from settings
    pub fn for_active_list(settings: &PollSettings) -> Self {
        Self::new(settings.active_interval()).with_failure_policy(settings.failure_policy)
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Polling cancelled")]
    Cancelled,

    #[error("Job {} failed with status {}", .0.id, .0.status.code())]
    JobFailed(Box<EnhanceJob>),

    #[error("Gave up after {attempts} attempts")]
    AttemptsExhausted {
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("Poll task aborted: {0}")]
    Aborted(String),
}
