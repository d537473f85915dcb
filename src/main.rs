use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shorts_factory::{
    composition::ShortsEngine,
    config::Config,
    content::{CaptionPair, FixedContent, JsonlFactStore, ShortsFactory},
    video::{check_ffmpeg, check_ffprobe},
};

#[derive(Parser)]
#[command(
    name = "shorts-factory",
    version,
    about = "Assemble vertical shorts from rotating backgrounds, music and captions",
    long_about = "Shorts-Factory picks the next background clip in rotation and a random music track, overlays a heading and two timed captions, appends the outro and renders a 1080x1920 short."
)]
struct Cli {
    /// Caption shown during the first half
    #[arg(long)]
    part1: String,

    /// Caption shown during the second half
    #[arg(long)]
    part2: String,

    /// Title recorded in the fact log
    #[arg(long)]
    title: String,

    /// Extra upload tags, comma separated
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Directory for the rendered short
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fact log (JSON lines)
    #[arg(long, default_value = "facts.jsonl")]
    facts: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    info!("Starting Shorts-Factory v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    check_ffmpeg(&config.encoding.ffmpeg_bin)?;
    check_ffprobe(&config.encoding.ffprobe_bin)?;

    let engine = ShortsEngine::new(config);
    let generator = Arc::new(FixedContent::new(CaptionPair::new(cli.part1, cli.part2, cli.title).with_tags(cli.tags)));
    let facts = Arc::new(JsonlFactStore::new(cli.facts));
    let factory = ShortsFactory::new(engine, generator, facts, cli.output);

    match factory.run_once().await {
        Ok(report) => {
            info!(
                "Done: {:?} ({:.1}s, {})",
                report.video.path, report.video.duration, report.status
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e.user_message());
            Err(e.into())
        }
    }
}
