use serde::{Deserialize, Serialize};

use super::Id;

/// Source video uploaded to the worksheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedVideo {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub n_frames: u64,
    #[serde(default)]
    pub framerate: f64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub owner: Option<Id>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub codec_id: Option<String>,
    #[serde(default)]
    pub bit_depth: Option<u8>,
    #[serde(default)]
    pub chroma_subsampling: Option<String>,
    #[serde(default)]
    pub color_space: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewVideos {
    pub before_video: String,
    pub after_video: String,
}

/// Processed output of an enhancement job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadVideo {
    pub id: Id,
    #[serde(default)]
    pub job_id: Option<Id>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub preview_videos: Option<PreviewVideos>,
    #[serde(default)]
    pub deleted: Option<String>,
    #[serde(default)]
    pub framerate: f64,
    #[serde(default)]
    pub n_frames: u64,
    #[serde(default)]
    pub bitrate: Option<u64>,
    #[serde(default)]
    pub codec_id: Option<String>,
    #[serde(default)]
    pub bit_depth: Option<u8>,
    #[serde(default)]
    pub chroma_subsampling: Option<String>,
    #[serde(default)]
    pub color_space: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub owner: Option<Id>,
    #[serde(default)]
    pub created_at: Option<String>,
}
