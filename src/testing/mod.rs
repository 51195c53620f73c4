//! Fixtures shared by unit tests
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::error::{ClientError, ClientResult};
use crate::models::{EnhanceJob, Id, JobStatus};
use crate::poller::JobSource;

pub fn job(id: i64, status: JobStatus, progress: f64) -> EnhanceJob {
    EnhanceJob {
        id: Id::from(id),
        status,
        processing_progress: progress,
        started: None,
        finished: None,
        input_video: None,
        output_video: None,
        ml_models: Vec::new(),
        preview: false,
        description: None,
        cost_usd: None,
        eta_s: None,
        grain: None,
        codec: None,
        output_resolution: None,
        comparison: None,
        stabilization_smoothing: None,
        start_frame: None,
        end_frame: None,
    }
}

/// One scripted answer to `fetch_job`
#[derive(Debug, Clone)]
pub enum Step {
    Job { status: JobStatus, progress: f64 },
    Empty,
    Fail(String),
}

impl Step {
    pub fn job(status: JobStatus, progress: f64) -> Self {
        Step::Job { status, progress }
    }
}

type ListStep = Result<Vec<EnhanceJob>, String>;

/// Job source replaying a fixed script. The last step repeats once the
/// script runs out.
pub struct ScriptedJobSource {
    steps: Mutex<VecDeque<Step>>,
    lists: Mutex<VecDeque<ListStep>>,
    calls: AtomicUsize,
    times: Mutex<Vec<Instant>>,
}

impl ScriptedJobSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self::build(steps, Vec::new())
    }

    pub fn repeating(step: Step) -> Self {
        Self::build(vec![step], Vec::new())
    }

    pub fn with_lists(lists: Vec<ListStep>) -> Self {
        Self::build(Vec::new(), lists)
    }

    fn build(steps: Vec<Step>, lists: Vec<ListStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            lists: Mutex::new(lists.into()),
            calls: AtomicUsize::new(0),
            times: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.times.lock().unwrap().clone()
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.times.lock().unwrap().push(Instant::now());
    }

    fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl JobSource for ScriptedJobSource {
    async fn fetch_job(&self, id: &Id) -> ClientResult<Option<EnhanceJob>> {
        self.record();
        match Self::next(&self.steps) {
            Some(Step::Job { status, progress }) => {
                let mut record = job(0, status, progress);
                record.id = id.clone();
                Ok(Some(record))
            }
            Some(Step::Fail(message)) => Err(ClientError::invalid_response(message)),
            Some(Step::Empty) | None => Ok(None),
        }
    }

    async fn fetch_active_jobs(&self) -> ClientResult<Vec<EnhanceJob>> {
        self.record();
        match Self::next(&self.lists) {
            Some(Ok(jobs)) => Ok(jobs),
            Some(Err(message)) => Err(ClientError::invalid_response(message)),
            None => Ok(Vec::new()),
        }
    }
}
