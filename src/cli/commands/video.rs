use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::config::Session;
use crate::cli::utils::{ensure_can, output_collection, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::models::{Id, UploadedVideo};
use crate::types::PageQuery;
use crate::video::{human_duration, human_size};

#[derive(Subcommand)]
pub enum VideoCommands {
    #[command(about = "List uploaded videos")]
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, help = "Page size (defaults to the configured page limit)")]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
    },

    #[command(about = "Show one uploaded video")]
    Get {
        #[arg(help = "Video id")]
        id: String,
    },

    #[command(about = "Upload a source video")]
    Upload {
        #[arg(help = "Path to the video file")]
        file: PathBuf,
    },

    #[command(about = "Delete an uploaded video")]
    Delete {
        #[arg(help = "Video id")]
        id: String,
    },
}

pub async fn handle(cmd: VideoCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::open().await?;

    match cmd {
        VideoCommands::List { page, limit, search } => {
            if !ensure_can(&session, &output_format, "read", "Worksheet")? {
                return Ok(());
            }
            let mut query = PageQuery::new(page, limit.unwrap_or(config().api.page_limit));
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let videos = session.client.videos(&query).await?;
            let lines = videos.iter().map(video_line).collect();
            output_collection(&output_format, "videos", serde_json::to_value(&videos)?, lines, "No videos found")
        }
        VideoCommands::Get { id } => {
            if !ensure_can(&session, &output_format, "read", "Worksheet")? {
                return Ok(());
            }
            let video = session.client.video(&Id::from(id.as_str())).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&video)?),
                OutputFormat::Text => {
                    println!("{} ({})", video.name, video.id);
                    println!("Resolution: {}x{} ({})", video.width, video.height, video.quality());
                    println!("Frames: {} @ {} fps", video.n_frames, video.framerate);
                    if let Some(length) = video.length_secs() {
                        println!("Length: {}", human_duration(length));
                    }
                    println!("Size: {}", human_size(video.size, 2));
                    if let Some(codec) = &video.codec_id {
                        println!("Codec: {}", codec);
                    }
                }
            }
            Ok(())
        }
        VideoCommands::Upload { file } => {
            if !ensure_can(&session, &output_format, "create", "Worksheet")? {
                return Ok(());
            }
            match session.client.upload_video(&file).await {
                Ok((id, message)) => output_success(
                    &output_format,
                    &message,
                    Some(json!({ "id": id, "file": file.display().to_string() })),
                ),
                Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
            }
        }
        VideoCommands::Delete { id } => {
            if !ensure_can(&session, &output_format, "delete", "Worksheet")? {
                return Ok(());
            }
            match session.client.delete_video(&Id::from(id.as_str())).await {
                Ok(message) => output_success(&output_format, &message, Some(json!({ "id": id }))),
                Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
            }
        }
    }
}

fn video_line(video: &UploadedVideo) -> String {
    format!(
        "{:>6} {:<40} {:>10} {:<12} {}",
        video.id.as_str(),
        video.name,
        human_size(video.size, 1),
        video.quality().label(),
        video.length_secs().map(human_duration).unwrap_or_default()
    )
}
