//! Landmark collector for recording labeled action recognition sequences.

use anyhow::{Context, Result};
use clap::Parser;
use landmark_collector::{
    app::CollectorApp,
    config::{Config, EXAMPLE_CONFIG},
    cue::default_cue,
    worker::DefaultBackend,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON or YAML)
    #[arg(short = 'C', long, default_value = "config.json")]
    config: PathBuf,

    /// Camera index to use (overrides the configuration)
    #[arg(long)]
    camera: Option<i32>,

    /// Record from a video file instead of the camera
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Action to preselect, or to record in headless mode
    #[arg(short, long)]
    action: Option<String>,

    /// Record one session of --action without a window, save it and exit
    #[arg(long, requires = "action")]
    headless: bool,

    /// Write an example configuration to --config and exit
    #[arg(long)]
    init_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Landmark Collector");

    if args.init_config {
        if args.config.exists() {
            anyhow::bail!("Refusing to overwrite {}", args.config.display());
        }
        std::fs::write(&args.config, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", args.config.display()))?;
        info!("Wrote example configuration to {}", args.config.display());
        return Ok(());
    }

    info!("Loading configuration from: {}", args.config.display());
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config file {}", args.config.display()))?;
    if let Some(camera) = args.camera {
        config.camera_index = camera;
    }
    if args.video.is_some() {
        config.video_file = args.video;
    }

    let cue = default_cue(config.cue_sound.as_deref());
    let mut app = CollectorApp::new(config, Box::new(DefaultBackend), cue, args.action.as_deref())?;

    match (args.headless, args.action.as_deref()) {
        (true, Some(action)) => {
            let summary = app.run_headless(action)?;
            info!(
                "Saved {} keypoint file(s), {} image(s), dropped {} frame(s)",
                summary.written, summary.images, summary.dropped
            );
        }
        _ => app.run()?,
    }

    Ok(())
}
