//! Formatting helpers for video listings
use std::fmt;

use crate::models::{DownloadVideo, UploadedVideo};

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Byte count in base-1024 units with at most `decimals` fraction digits,
/// trailing zeros dropped: `1536` -> `"1.5 KB"`
pub fn human_size(bytes: u64, decimals: usize) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(SIZE_UNITS.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(exp as i32);
    format!("{} {}", trim_decimal(format!("{scaled:.decimals$}")), SIZE_UNITS[exp])
}

fn trim_decimal(mut s: String) -> String {
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    s
}

/// `"1d 2h 3m 4s"`; zero units are skipped, `"0s"` when everything is zero
pub fn human_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }
    parts.join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VideoQuality {
    Low,
    Sd,
    Hd,
    FullHd,
    QuadHd,
    UltraHd,
}

impl VideoQuality {
    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::Low => "Low Quality",
            VideoQuality::Sd => "SD",
            VideoQuality::Hd => "HD",
            VideoQuality::FullHd => "Full HD",
            VideoQuality::QuadHd => "2K Quad HD",
            VideoQuality::UltraHd => "4K Ultra HD",
        }
    }

    fn from_resolution(width: u32, height: u32) -> Self {
        match width.max(height) {
            r if r >= 3840 => VideoQuality::UltraHd,
            r if r >= 2560 => VideoQuality::QuadHd,
            r if r >= 1920 => VideoQuality::FullHd,
            r if r >= 1280 => VideoQuality::Hd,
            r if r >= 640 => VideoQuality::Sd,
            _ => VideoQuality::Low,
        }
    }

    // One step down when the bitrate cannot carry the resolution
    fn downgrade_for(self, mbps: f64) -> Self {
        match self {
            VideoQuality::UltraHd if mbps < 15.0 => VideoQuality::FullHd,
            VideoQuality::QuadHd if mbps < 10.0 => VideoQuality::Hd,
            VideoQuality::FullHd if mbps < 5.0 => VideoQuality::Hd,
            VideoQuality::Hd if mbps < 2.5 => VideoQuality::Sd,
            VideoQuality::Sd if mbps < 0.4 => VideoQuality::Low,
            other => other,
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quality class from the larger dimension, downgraded when the bitrate
/// (bits per second) is too low for it
pub fn video_quality(width: u32, height: u32, bitrate: Option<u64>) -> VideoQuality {
    let by_resolution = VideoQuality::from_resolution(width, height);
    match bitrate {
        Some(bps) => by_resolution.downgrade_for(bps as f64 / 1_000_000.0),
        None => by_resolution,
    }
}

/// Playback length from frame count and rate
pub fn video_length_secs(n_frames: u64, framerate: f64) -> Option<f64> {
    (framerate > 0.0 && framerate.is_finite()).then(|| n_frames as f64 / framerate)
}

impl UploadedVideo {
    pub fn quality(&self) -> VideoQuality {
        video_quality(self.width, self.height, self.bitrate)
    }

    pub fn length_secs(&self) -> Option<f64> {
        video_length_secs(self.n_frames, self.framerate)
    }
}

impl DownloadVideo {
    pub fn quality(&self) -> VideoQuality {
        video_quality(self.width, self.height, self.bitrate)
    }
}
