use std::collections::HashMap;

use crate::models::{EnhanceJob, Id};

/// Keeps surfaced progress from moving backwards.
///
/// A stale or partial read can report less progress than a previous one;
/// the tracker raises it back to the highest value seen for that job.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    seen: HashMap<Id, f64>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, job: &mut EnhanceJob) {
        let current = if job.processing_progress.is_finite() {
            job.processing_progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let best = self
            .seen
            .get(&job.id)
            .map(|last| last.max(current))
            .unwrap_or(current);

        if best > current {
            tracing::debug!(job_id = %job.id, reported = current, kept = best, "progress regressed, clamping");
        }

        self.seen.insert(job.id.clone(), best);
        job.processing_progress = best;
    }

    pub fn last_seen(&self, id: &Id) -> Option<f64> {
        self.seen.get(id).copied()
    }

    /// Forget jobs no longer listed
    pub fn retain(&mut self, ids: &[Id]) {
        self.seen.retain(|id, _| ids.contains(id));
    }
}
