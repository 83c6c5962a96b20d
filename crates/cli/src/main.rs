//! BananaFit CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  Initialize config
//! - `serve`    Start the HTTP API server
//! - `tryon`    Run the whole try-on workflow once
//! - `catalog`  List the preset persons and garments
//! - `status`   Show configuration status
//! - `doctor`   Diagnose setup problems

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "bananafit",
    about = "BananaFit: virtual try-on with a generative image model",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "BANANAFIT_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Dress a person in a garment and save the result
    Tryon {
        /// Person photo: preset id, http(s) URL, or file path
        #[arg(long)]
        person: String,

        /// Garment photo: preset id, http(s) URL, or file path
        #[arg(long, conflicts_with = "prompt", required_unless_present = "prompt")]
        clothing: Option<String>,

        /// Describe a garment to generate instead
        #[arg(long)]
        prompt: Option<String>,

        /// Where to write the result (default: banana-fit-result.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// List preset persons and garments
    Catalog,

    /// Show configuration status
    Status,

    /// Diagnose setup problems
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Tryon {
            person,
            clothing,
            prompt,
            out,
        } => {
            let garment = match (clothing, prompt) {
                (Some(source), _) => commands::tryon::Garment::Source(source),
                (None, Some(prompt)) => commands::tryon::Garment::Prompt(prompt),
                (None, None) => return Err("either --clothing or --prompt is required".into()),
            };
            commands::tryon::run(person, garment, out).await?
        }
        Commands::Catalog => commands::catalog::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
