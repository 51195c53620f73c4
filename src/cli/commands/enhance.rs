use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::config::Session;
use crate::cli::utils::{ensure_can, output_collection, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::enhance::{EnhanceOptions, EnhanceRequest, SettingKind};
use crate::models::{DownloadVideo, Id};
use crate::types::PageQuery;
use crate::video::human_size;

#[derive(Subcommand)]
pub enum EnhanceCommands {
    #[command(about = "Submit an enhancement job for an uploaded video")]
    Submit {
        #[arg(help = "Source video id")]
        video_id: String,
        #[arg(long = "model", required = true, help = "ML model id (repeatable)")]
        models: Vec<String>,
        #[arg(long, help = "Encoding quality: very high, high or medium")]
        quality: Option<String>,
        #[arg(long)]
        codec: Option<String>,
        #[arg(long)]
        container: Option<String>,
        #[arg(long)]
        resolution: Option<String>,
        #[arg(long)]
        grain: Option<String>,
        #[arg(long)]
        comparison: Option<String>,
        #[arg(long, default_value_t = 0.0, help = "Trim start in percent")]
        start: f64,
        #[arg(long, default_value_t = 100.0, help = "Trim end in percent")]
        end: f64,
    },

    #[command(about = "List enhancement features and their models")]
    Models,

    #[command(about = "List enhancement settings and their values")]
    Settings,

    #[command(about = "Show the remaining credit balance")]
    Credits,

    #[command(about = "List processed videos")]
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
    },

    #[command(about = "Download a processed video")]
    Download {
        #[arg(help = "Processed video id")]
        id: String,
        #[arg(help = "Output file (defaults to the video name)")]
        out: Option<PathBuf>,
    },
}

pub async fn handle(cmd: EnhanceCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::open().await?;

    match cmd {
        EnhanceCommands::Submit {
            video_id,
            models,
            quality,
            codec,
            container,
            resolution,
            grain,
            comparison,
            start,
            end,
        } => {
            if !ensure_can(&session, &output_format, "create", "Worksheet")? {
                return Ok(());
            }
            let video = session.client.video(&Id::from(video_id.as_str())).await?;
            let settings = session.client.enhance_settings().await?;
            let models = models.iter().map(|m| Id::from(m.as_str())).collect();

            let mut options = EnhanceOptions::from_defaults(&settings, models)?.with_range(start, end);
            let overrides = [
                (SettingKind::Quality, quality),
                (SettingKind::Codec, codec),
                (SettingKind::Container, container),
                (SettingKind::Resolution, resolution),
                (SettingKind::Grain, grain),
                (SettingKind::Comparison, comparison),
            ];
            for (kind, wanted) in overrides {
                if let Some(wanted) = wanted {
                    options.choose(&settings, kind, &wanted)?;
                }
            }

            let request = EnhanceRequest::build(&video, &options)?;
            tracing::debug!(video_id = %video.id, ?request, "submitting enhancement");

            match session.client.create_enhance(&request).await {
                Ok((job_id, message)) => output_success(
                    &output_format,
                    &format!("{} (job {}, follow with `elpix job watch {}`)", message, job_id, job_id),
                    Some(json!({ "job_id": job_id, "request": request })),
                ),
                Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
            }
        }
        EnhanceCommands::Models => {
            if !ensure_can(&session, &output_format, "read", "Worksheet")? {
                return Ok(());
            }
            let features = session.client.ml_features().await?;
            let mut lines = Vec::new();
            for feature in &features {
                lines.push(feature.name.clone());
                for model in feature.available_models() {
                    lines.push(format!(
                        "  {:>4} {:<28} x{} fps x{} max {}p",
                        model.id.as_str(),
                        model.name,
                        model.upscale_factor,
                        model.fps_boost_factor,
                        model.max_resolution
                    ));
                }
            }
            output_collection(&output_format, "features", serde_json::to_value(&features)?, lines, "No models available")
        }
        EnhanceCommands::Settings => {
            if !ensure_can(&session, &output_format, "read", "Worksheet")? {
                return Ok(());
            }
            let mut settings = session.client.enhance_settings().await?;
            settings.sort_by_key(|s| s.sequence_no);
            let mut lines = Vec::new();
            for setting in &settings {
                lines.push(setting.name.clone());
                for value in &setting.setting_values {
                    let marker = if value.is_default { "*" } else { " " };
                    lines.push(format!("  {} {:<20} {}", marker, value.name, value.value));
                }
            }
            output_collection(&output_format, "settings", serde_json::to_value(&settings)?, lines, "No settings available")
        }
        EnhanceCommands::Credits => {
            let credits = session.client.credits().await?;
            let balance = credits
                .balance_usd
                .map(|b| format!("${}", b))
                .unwrap_or_else(|| "unknown".to_string());
            output_success(
                &output_format,
                &format!("Credit balance: {}", balance),
                Some(json!({ "balance_usd": credits.balance_usd })),
            )
        }
        EnhanceCommands::List { page, limit, search } => {
            if !ensure_can(&session, &output_format, "read", "Video Enhance")? {
                return Ok(());
            }
            let mut query = PageQuery::new(page, limit.unwrap_or(config().api.page_limit));
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let videos = session.client.enhanced_videos(&query).await?;
            let lines = videos.iter().map(download_line).collect();
            output_collection(&output_format, "videos", serde_json::to_value(&videos)?, lines, "No processed videos")
        }
        EnhanceCommands::Download { id, out } => {
            if !ensure_can(&session, &output_format, "download", "Video Enhance")? {
                return Ok(());
            }
            let video = session.client.enhanced_video(&Id::from(id.as_str())).await?;
            if video.file.is_empty() {
                return output_error(
                    &output_format,
                    &format!("Video {} has no file yet", video.id),
                    Some("NOT_READY"),
                );
            }
            let dest = out.unwrap_or_else(|| match video.name.as_str() {
                "" => PathBuf::from(format!("enhanced-{}.mp4", video.id)),
                name => PathBuf::from(name),
            });
            let written = session.client.download(&video.file, &dest).await?;
            output_success(
                &output_format,
                &format!("Saved {} to {}", human_size(written, 2), dest.display()),
                Some(json!({ "bytes": written, "path": dest.display().to_string() })),
            )
        }
    }
}

fn download_line(video: &DownloadVideo) -> String {
    let job = video.job_id.as_ref().map(|j| j.to_string()).unwrap_or_default();
    format!(
        "{:>6} {:<40} {:>10} {:<12} job {}",
        video.id.as_str(),
        video.name,
        human_size(video.size, 1),
        video.quality().label(),
        job
    )
}
