//! Enhancement job submission.
//!
//! Turns a source video plus the chosen settings into the payload accepted
//! by `POST /api/v1/enhance`.

pub mod settings;

pub use settings::{Setting, SettingKind, SettingValue};

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Id, UploadedVideo};
use settings::value_text;

/// Smoothing window sent with every job; the backend ignores it unless the
/// stabilization model is selected
pub const STABILIZATION_SMOOTHING: i32 = 40;

/// Let the backend pick the ProRes profile
pub const PRORES_PROFILE_AUTO: i32 = -1;

#[derive(Debug, Error, PartialEq)]
pub enum EnhanceError {
    #[error("Invalid encoding quality '{0}', expected very high, high or medium")]
    InvalidQuality(String),

    #[error("Invalid frame range {start}%..{end}%")]
    InvalidRange { start: f64, end: f64 },

    #[error("Video {0} has no frame count yet")]
    NoFrames(Id),

    #[error("Select at least one model")]
    NoModels,

    #[error("No value for the {0} setting")]
    MissingSetting(&'static str),

    #[error("Unknown {setting} value '{value}'")]
    UnknownValue { setting: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingQuality {
    VeryHigh,
    High,
    Medium,
}

impl EncodingQuality {
    /// Inclusive CRF range
    pub fn crf_range(&self) -> (u8, u8) {
        match self {
            EncodingQuality::VeryHigh => (0, 20),
            EncodingQuality::High => (21, 25),
            EncodingQuality::Medium => (26, 51),
        }
    }

    /// Inclusive qscale range
    pub fn qscale_range(&self) -> (u8, u8) {
        match self {
            EncodingQuality::VeryHigh => (0, 9),
            EncodingQuality::High => (10, 11),
            EncodingQuality::Medium => (12, 32),
        }
    }

    /// Midpoints of both ranges, rounded half up
    pub fn crf_qscale(&self) -> (u8, u8) {
        (midpoint(self.crf_range()), midpoint(self.qscale_range()))
    }
}

fn midpoint((min, max): (u8, u8)) -> u8 {
    ((min as f64 + max as f64) / 2.0).round() as u8
}

impl FromStr for EncodingQuality {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "very high" => Ok(EncodingQuality::VeryHigh),
            "high" => Ok(EncodingQuality::High),
            "medium" => Ok(EncodingQuality::Medium),
            _ => Err(EnhanceError::InvalidQuality(s.to_string())),
        }
    }
}

impl fmt::Display for EncodingQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EncodingQuality::VeryHigh => "very high",
            EncodingQuality::High => "high",
            EncodingQuality::Medium => "medium",
        };
        f.write_str(label)
    }
}

/// ffmpeg-style pixel format for the source, e.g. `yuv420p` or `yuv422p10le`.
/// Empty when the bit depth or subsampling is not one the encoder handles.
pub fn yuv_pixel_format(bit_depth: Option<u8>, chroma_subsampling: Option<&str>) -> String {
    let subsampling = match chroma_subsampling.map(str::trim) {
        Some("4:2:0") => "420",
        Some("4:2:2") => "422",
        Some("4:4:4") => "444",
        _ => return String::new(),
    };
    match bit_depth {
        Some(8) => format!("yuv{subsampling}p"),
        Some(10) => format!("yuv{subsampling}p10le"),
        _ => String::new(),
    }
}

/// Frame bounds for a percentage trim window over `n_frames`
pub fn frame_range(n_frames: u64, start_pct: f64, end_pct: f64) -> Result<(u64, u64), EnhanceError> {
    let valid = start_pct.is_finite()
        && end_pct.is_finite()
        && (0.0..=100.0).contains(&start_pct)
        && (0.0..=100.0).contains(&end_pct)
        && start_pct < end_pct;
    if !valid {
        return Err(EnhanceError::InvalidRange {
            start: start_pct,
            end: end_pct,
        });
    }
    let at = |pct: f64| ((pct / 100.0) * n_frames as f64).floor() as u64;
    Ok((at(start_pct), at(end_pct)))
}

/// User choices for one enhancement run
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceOptions {
    pub quality: EncodingQuality,
    pub codec: Value,
    pub container: Value,
    pub output_resolution: Value,
    pub grain: Value,
    pub comparison: Value,
    /// Trim window in percent of the source length
    pub start_pct: f64,
    pub end_pct: f64,
    pub ml_models: Vec<Id>,
}

impl EnhanceOptions {
    /// Options preselected from each setting's default value
    pub fn from_defaults(settings: &[Setting], ml_models: Vec<Id>) -> Result<Self, EnhanceError> {
        let default_of = |kind: SettingKind| -> Result<Value, EnhanceError> {
            kind.find(settings)
                .and_then(Setting::default_value)
                .map(|v| v.value.clone())
                .ok_or(EnhanceError::MissingSetting(kind.keyword()))
        };

        let quality = value_text(&default_of(SettingKind::Quality)?).parse()?;
        Ok(Self {
            quality,
            codec: default_of(SettingKind::Codec)?,
            container: default_of(SettingKind::Container)?,
            output_resolution: default_of(SettingKind::Resolution)?,
            grain: default_of(SettingKind::Grain)?,
            comparison: default_of(SettingKind::Comparison)?,
            start_pct: 0.0,
            end_pct: 100.0,
            ml_models,
        })
    }

    /// Replace one setting with the value named `wanted`
    pub fn choose(&mut self, settings: &[Setting], kind: SettingKind, wanted: &str) -> Result<(), EnhanceError> {
        let setting = kind
            .find(settings)
            .ok_or(EnhanceError::MissingSetting(kind.keyword()))?;
        let value = setting
            .find_value(wanted)
            .map(|v| v.value.clone())
            .ok_or_else(|| EnhanceError::UnknownValue {
                setting: kind.keyword(),
                value: wanted.to_string(),
            })?;

        match kind {
            SettingKind::Quality => self.quality = value_text(&value).parse()?,
            SettingKind::Codec => self.codec = value,
            SettingKind::Container => self.container = value,
            SettingKind::Resolution => self.output_resolution = value,
            SettingKind::Grain => self.grain = value,
            SettingKind::Comparison => self.comparison = value,
        }
        Ok(())
    }

    pub fn with_range(mut self, start_pct: f64, end_pct: f64) -> Self {
        self.start_pct = start_pct;
        self.end_pct = end_pct;
        self
    }
}

/// Body of `POST /api/v1/enhance`. Keys are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhanceRequest {
    pub codec: Value,
    pub crf: u8,
    pub qscale: u8,
    pub container: Value,
    pub chroma_subsampling: String,
    pub preview: bool,
    pub start_frame: u64,
    pub end_frame: u64,
    pub input_video: Id,
    pub output_video: Option<Id>,
    pub ml_models: Vec<Id>,
    pub output_resolution: Value,
    pub grain: Value,
    pub comparison: Value,
    pub stabilization_smoothing: i32,
    pub prores_profile: i32,
}

impl EnhanceRequest {
    pub fn build(video: &UploadedVideo, options: &EnhanceOptions) -> Result<Self, EnhanceError> {
        if options.ml_models.is_empty() {
            return Err(EnhanceError::NoModels);
        }
        if video.n_frames == 0 {
            return Err(EnhanceError::NoFrames(video.id.clone()));
        }

        let (start_frame, end_frame) = frame_range(video.n_frames, options.start_pct, options.end_pct)?;
        let (crf, qscale) = options.quality.crf_qscale();
        let chroma_subsampling = yuv_pixel_format(video.bit_depth, video.chroma_subsampling.as_deref());
        if chroma_subsampling.is_empty() {
            tracing::warn!(
                video_id = %video.id,
                bit_depth = ?video.bit_depth,
                chroma = ?video.chroma_subsampling,
                "unrecognized pixel format, sending empty chroma_subsampling"
            );
        }

        Ok(Self {
            codec: options.codec.clone(),
            crf,
            qscale,
            container: options.container.clone(),
            chroma_subsampling,
            preview: true,
            start_frame,
            end_frame,
            input_video: video.id.clone(),
            output_video: None,
            ml_models: options.ml_models.clone(),
            output_resolution: options.output_resolution.clone(),
            grain: options.grain.clone(),
            comparison: options.comparison.clone(),
            stabilization_smoothing: STABILIZATION_SMOOTHING,
            prores_profile: PRORES_PROFILE_AUTO,
        })
    }
}
