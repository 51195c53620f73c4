use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::video::{DownloadVideo, UploadedVideo};
use super::Id;

/// Server-side job state. Transitions are owned by the backend; the client
/// only re-reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum JobStatus {
    Queued,
    Processing,
    Succeeded,
    /// `-1` or `-2`; the raw code is kept
    Failed(i32),
    Unknown(i32),
}

impl JobStatus {
    pub fn code(&self) -> i32 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Succeeded => 2,
            JobStatus::Failed(code) | JobStatus::Unknown(code) => *code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed(_))
    }

    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    /// Queued or processing
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::Processing => "Processing",
            JobStatus::Succeeded => "Finished",
            JobStatus::Failed(_) => "Failed",
            JobStatus::Unknown(_) => "Unknown",
        }
    }
}

impl From<i32> for JobStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => JobStatus::Queued,
            1 => JobStatus::Processing,
            2 => JobStatus::Succeeded,
            -1 | -2 => JobStatus::Failed(code),
            other => JobStatus::Unknown(other),
        }
    }
}

impl From<JobStatus> for i32 {
    fn from(status: JobStatus) -> Self {
        status.code()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlModel {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub task: i32,
    #[serde(default)]
    pub cost_weight: f64,
    #[serde(default)]
    pub upscale_factor: f64,
    #[serde(default)]
    pub fps_boost_factor: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub max_resolution: u32,
    #[serde(default)]
    pub is_disabled: Option<bool>,
}

/// Enhancement feature group, e.g. upscale or stabilize, offering models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub ml_models: Vec<MlModel>,
}

impl Feature {
    /// Models that can still be selected
    pub fn available_models(&self) -> impl Iterator<Item = &MlModel> {
        self.ml_models.iter().filter(|m| m.is_disabled != Some(true))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credits {
    #[serde(default)]
    pub balance_usd: Option<Decimal>,
}

/// Enhancement job as returned by `GET /api/v1/enhance/<id>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceJob {
    pub id: Id,
    #[serde(default = "default_status")]
    pub status: JobStatus,
    #[serde(default)]
    pub processing_progress: f64,
    #[serde(default)]
    pub started: Option<String>,
    #[serde(default)]
    pub finished: Option<String>,
    #[serde(default)]
    pub input_video: Option<UploadedVideo>,
    #[serde(default)]
    pub output_video: Option<DownloadVideo>,
    #[serde(default)]
    pub ml_models: Vec<MlModel>,

    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cost_usd: Option<Decimal>,
    #[serde(default)]
    pub eta_s: Option<f64>,
    #[serde(default)]
    pub grain: Option<f64>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub output_resolution: Option<u32>,
    #[serde(default)]
    pub comparison: Option<bool>,
    #[serde(default)]
    pub stabilization_smoothing: Option<i32>,
    #[serde(default)]
    pub start_frame: Option<u64>,
    #[serde(default)]
    pub end_frame: Option<u64>,
}

fn default_status() -> JobStatus {
    JobStatus::Queued
}

impl EnhanceJob {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.started.as_deref())
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.finished.as_deref())
    }

    /// Progress as a whole percentage, 0..=100
    pub fn percent(&self) -> u8 {
        (self.processing_progress.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    pub fn video_name(&self) -> &str {
        self.input_video
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("")
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_both_ways() {
        assert_eq!(JobStatus::from(0), JobStatus::Queued);
        assert_eq!(JobStatus::from(2), JobStatus::Succeeded);
        assert_eq!(JobStatus::from(-2), JobStatus::Failed(-2));
        assert_eq!(JobStatus::from(7), JobStatus::Unknown(7));
        assert_eq!(i32::from(JobStatus::Failed(-1)), -1);
        assert!(JobStatus::Failed(-1).is_failure());
        assert!(!JobStatus::Unknown(7).is_active());
    }

    #[test]
    fn job_deserializes_with_partial_fields() {
        let json = r#"{
            "id": 17,
            "status": 1,
            "processingProgress": 0.42,
            "started": "2025-04-20T08:15:00.000Z",
            "finished": null,
            "costUsd": "0.35",
            "mlModels": [{ "id": 26, "name": "Stabilize" }]
        }"#;
        let job: EnhanceJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.id.as_i64(), Some(17));
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.percent(), 42);
        assert!(job.started_at().is_some());
        assert!(job.finished_at().is_none());
        assert_eq!(job.cost_usd, Some(Decimal::new(35, 2)));
        assert_eq!(job.ml_models[0].name, "Stabilize");
    }

    #[test]
    fn disabled_models_are_not_offered() {
        let json = r#"{
            "id": "67ff2a",
            "name": "Upscale",
            "mlModels": [
                { "id": 3, "name": "2x", "isDisabled": true },
                { "id": 4, "name": "4x" }
            ]
        }"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        let names: Vec<_> = feature.available_models().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["4x"]);
    }
}
