pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "elpix")]
#[command(about = "Elpix CLI - Command-line client for the Elpix video enhancement backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Role capabilities and the permission matrix")]
    Permission {
        #[command(subcommand)]
        cmd: commands::permission::PermissionCommands,
    },

    #[command(about = "Enhancement job status")]
    Job {
        #[command(subcommand)]
        cmd: commands::job::JobCommands,
    },

    #[command(about = "Uploaded source videos")]
    Video {
        #[command(subcommand)]
        cmd: commands::video::VideoCommands,
    },

    #[command(about = "Submit enhancements and fetch results")]
    Enhance {
        #[command(subcommand)]
        cmd: commands::enhance::EnhanceCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Permission { cmd } => commands::permission::handle(cmd, output_format).await,
        Commands::Job { cmd } => commands::job::handle(cmd, output_format).await,
        Commands::Video { cmd } => commands::video::handle(cmd, output_format).await,
        Commands::Enhance { cmd } => commands::enhance::handle(cmd, output_format).await,
    }
}
