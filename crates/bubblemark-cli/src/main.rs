//! bubblemark CLI: mark scanned bubble sheets against answer keys.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bubblemark", version, about = "Bubble-sheet exam marking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check answer keys and the concept map
    Validate {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Mark one student
    Mark {
        /// Student name
        #[arg(long)]
        name: String,

        /// Manually assessed writing score (0-100)
        #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=100))]
        writing_score: u32,

        /// Reading sheet image
        #[arg(long)]
        reading: PathBuf,

        /// QR/AR sheet image
        #[arg(long)]
        qrar: PathBuf,

        /// Output directory (defaults to the configured output_dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Mark every student in a manifest
    Batch {
        /// Manifest JSON listing students and their sheet files
        #[arg(long)]
        manifest: PathBuf,

        /// Directory holding the sheet images named in the manifest
        #[arg(long)]
        sheets: PathBuf,

        /// Output directory (defaults to a timestamped folder under output_dir)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Max students marked at once
        #[arg(long)]
        parallelism: Option<usize>,

        /// Per-student time limit in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config, answer keys and concept map
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bubblemark=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => commands::validate::execute(config),
        Commands::Mark {
            name,
            writing_score,
            reading,
            qrar,
            output,
            config,
        } => commands::mark::execute(name, writing_score, reading, qrar, output, config).await,
        Commands::Batch {
            manifest,
            sheets,
            output,
            parallelism,
            timeout_secs,
            config,
        } => {
            commands::batch::execute(manifest, sheets, output, parallelism, timeout_secs, config)
                .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
