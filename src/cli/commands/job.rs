use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::config::Session;
use crate::cli::utils::{ensure_can, output_collection, output_error, output_success, progress_bar};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::models::{EnhanceJob, Id};
use crate::poller::{FailurePolicy, JobPoller, PollConfig, PollError};
use crate::video::human_duration;

#[derive(Subcommand)]
pub enum JobCommands {
    #[command(about = "Follow one enhancement job until it finishes")]
    Watch {
        #[arg(help = "Job id")]
        id: String,
        #[arg(long, help = "Poll interval in milliseconds")]
        interval_ms: Option<u64>,
        #[arg(long, help = "Keep polling a failed job instead of stopping")]
        keep_polling: bool,
    },

    #[command(about = "Show queued and processing jobs")]
    Active {
        #[arg(long, help = "Keep refreshing until no job is active")]
        follow: bool,
    },

    #[command(about = "Show one job without polling")]
    Get {
        #[arg(help = "Job id")]
        id: String,
    },
}

pub async fn handle(cmd: JobCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::open().await?;
    if !ensure_can(&session, &output_format, "read", "Worksheet")? {
        return Ok(());
    }
    let source = Arc::new(session.client.clone());
    let settings = &config().poll;

    match cmd {
        JobCommands::Watch { id, interval_ms, keep_polling } => {
            let mut poll = PollConfig::for_job(settings);
            if let Some(ms) = interval_ms {
                poll.interval = Duration::from_millis(ms);
            }
            if keep_polling {
                poll = poll.with_failure_policy(FailurePolicy::KeepPolling);
            }

            let poller = JobPoller::new(source, poll);
            let cancel = poller.cancellation();
            let handle = poller.spawn_job(Id::from(id.as_str()));
            let mut updates = handle.updates();

            let watcher = {
                let output_format = output_format.clone();
                tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let current = updates.borrow_and_update().clone();
                        if let (Some(job), OutputFormat::Text) = (current, &output_format) {
                            println!("{}", job_line(&job));
                        }
                    }
                })
            };

            let result = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    Err(PollError::Cancelled)
                }
                result = handle.join() => result,
            };
            watcher.abort();

            match result {
                Ok(job) => output_success(
                    &output_format,
                    &format!("Job {} finished", job.id),
                    Some(json!({ "job": job })),
                ),
                Err(PollError::JobFailed(job)) => output_error(
                    &output_format,
                    &format!("Job {} failed with status {}", job.id, job.status.code()),
                    Some("JOB_FAILED"),
                ),
                Err(e) => output_error(&output_format, &e.to_string(), Some("POLL_STOPPED")),
            }
        }
        JobCommands::Active { follow } => {
            if !follow {
                let jobs = session.client.active_jobs().await?;
                return print_jobs(&output_format, &jobs);
            }

            let poller = JobPoller::new(source, PollConfig::for_active_list(settings));
            let cancel = poller.cancellation();
            let handle = poller.spawn_active();
            let mut updates = handle.updates();
            let watcher = {
                let output_format = output_format.clone();
                tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let jobs = updates.borrow_and_update().clone();
                        if matches!(output_format, OutputFormat::Text) {
                            println!("-- {} active", jobs.len());
                            for job in &jobs {
                                println!("{}", job_line(job));
                            }
                        }
                    }
                })
            };

            let result = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    Err(PollError::Cancelled)
                }
                result = handle.join() => result,
            };
            watcher.abort();

            match result {
                Ok(remaining) if remaining.is_empty() => output_success(&output_format, "No active jobs", None),
                Ok(remaining) => output_success(
                    &output_format,
                    &format!("{} jobs ended without success", remaining.len()),
                    Some(json!({ "jobs": remaining })),
                ),
                Err(e) => output_error(&output_format, &e.to_string(), Some("POLL_STOPPED")),
            }
        }
        JobCommands::Get { id } => match session.client.enhance_job(&Id::from(id.as_str())).await? {
            Some(job) => print_jobs(&output_format, std::slice::from_ref(&job)),
            None => output_error(&output_format, &format!("Job {} not found", id), Some("NOT_FOUND")),
        },
    }
}

fn print_jobs(output_format: &OutputFormat, jobs: &[EnhanceJob]) -> anyhow::Result<()> {
    let lines = jobs.iter().map(job_line).collect();
    output_collection(output_format, "jobs", serde_json::to_value(jobs)?, lines, "No active jobs")
}

fn job_line(job: &EnhanceJob) -> String {
    let eta = job
        .eta_s
        .filter(|_| job.status.is_active())
        .map(|s| format!(" eta {}", human_duration(s)))
        .unwrap_or_default();
    format!(
        "{:>6} {:<10} {} {}{}",
        job.id.as_str(),
        job.status.label(),
        progress_bar(job.percent(), 20),
        job.video_name(),
        eta
    )
}
