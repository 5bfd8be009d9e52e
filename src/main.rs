// NEWSREEL Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | NEWSREEL

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use newsreel_core::models::{GeneratedContent, NewsItem};
use newsreel_core::{PipelineConfig, VideoProcessor};

#[derive(Parser)]
#[command(name = "newsreel-core")]
#[command(about = "NEWSREEL satirical anchor renderer", long_about = None)]
struct Cli {
    /// Optional JSON config file (environment variables otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one finished video and print its result as JSON
    Render {
        /// News item JSON file
        #[arg(short, long)]
        news: PathBuf,

        /// Generated commentary JSON file
        #[arg(short, long)]
        content: PathBuf,

        /// Synthesized speech track
        #[arg(short, long)]
        audio: PathBuf,
    },

    /// Pre-render the anchor sprite library into the disk cache
    WarmLibrary {
        /// Use the 1 degree rotation lattice
        #[arg(long)]
        fine: bool,
    },

    /// Print the amplitude curve summary for an audio file
    Analyze {
        #[arg(short, long)]
        audio: PathBuf,
    },

    /// Delete intermediate files older than the retention age
    Cleanup {
        /// Overrides NEWSREEL_FRAME_RETENTION_HOURS
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {:?}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,symphonia=error"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Cli::parse();
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path),
        None => PipelineConfig::from_env(),
    };

    info!("--- NEWSREEL v{} ---", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Render { news, content, audio } => {
            let news: NewsItem = read_json(&news)?;
            let content: GeneratedContent = read_json(&content)?;
            let mut processor = VideoProcessor::new(config).context("initializing pipeline")?;
            let result = processor
                .produce(&news, &content, &audio)
                .await
                .context("video production failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::WarmLibrary { fine } => {
            config.fine_rotation_lattice |= fine;
            let mut processor = VideoProcessor::new(config).context("initializing pipeline")?;
            let stats = processor.warm_library().context("building sprite library")?;
            info!(
                "📚 Library ready in {:?}: {} rendered, {} loaded",
                processor.library().cache_dir(),
                stats.rendered,
                stats.loaded
            );
        }
        Commands::Analyze { audio } => {
            let processor = VideoProcessor::new(config).context("initializing pipeline")?;
            let track = processor.analyze(&audio).await;
            let peak = track.values().iter().copied().fold(0.0_f32, f32::max);
            let mean = if track.is_empty() {
                0.0
            } else {
                track.values().iter().sum::<f32>() / track.len() as f32
            };
            println!(
                "{}",
                serde_json::json!({
                    "duration": track.duration(),
                    "frames": track.len(),
                    "frame_rate": track.frame_rate(),
                    "source": format!("{:?}", track.source()),
                    "peak": peak,
                    "mean": mean,
                })
            );
        }
        Commands::Cleanup { max_age_hours } => {
            let processor = VideoProcessor::new(config).context("initializing pipeline")?;
            let report = match max_age_hours {
                Some(hours) => processor.sweep_older_than(Duration::from_secs(hours * 3600)),
                None => processor.sweep(),
            };
            info!(
                "🧹 Removed {} files, {} directories",
                report.files_removed, report.dirs_removed
            );
        }
    }

    Ok(())
}
