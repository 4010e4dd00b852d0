//! Viva Control - terminal client for the viva daemon
//!
//! Runs an interactive oral exam against vivad.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::VivaClient;
use std::path::PathBuf;

/// Default daemon address
const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "vivactl")]
#[command(about = "Viva Examiner - practice oral exams from the terminal", long_about = None)]
#[command(version = viva_common::VERSION)]
struct Cli {
    /// Daemon base URL
    #[arg(long, global = true, env = "VIVA_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an exam on a topic
    Exam {
        /// Topic to be examined on (daemon default when omitted)
        topic: Option<String>,
    },

    /// Take an exam on the contents of a PDF
    Upload {
        /// PDF file to upload
        file: PathBuf,
    },

    /// Show daemon health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = VivaClient::new(&cli.server);

    let result = match cli.command {
        Commands::Exam { topic } => commands::exam(&client, topic.as_deref()).await,
        Commands::Upload { file } => commands::upload(&client, &file).await,
        Commands::Health => commands::health(&client).await,
    };

    if let Err(e) = &result {
        output::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
