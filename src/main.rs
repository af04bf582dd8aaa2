use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reelsmith::{
    client::{HttpStatusSource, PollOptions, StatusPoller},
    config::Config,
    job::{JobId, JobStatus, Orchestrator, SynthesisRequest},
    video::{check_intake, OutputLibrary, Quality, Resolution, TransitionType},
};

#[derive(Parser)]
#[command(
    name = "reelsmith",
    version,
    about = "Turn still images into a video",
    long_about = "Reelsmith schedules a set of still images into frames, blends transitions between them and encodes the result to MP4, falling back to the ffmpeg command-line tool when no in-process encoder is available."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a video from images, in the order given
    Create(CreateArgs),

    /// List finished videos
    List,

    /// Delete a finished video by file name
    Delete { name: String },

    /// Remove videos older than the retention period
    Cleanup,

    /// Follow a job running on a remote server
    Status {
        /// Base URL of the server, e.g. http://localhost:8080
        #[arg(long)]
        server: String,

        job_id: String,
    },
}

#[derive(Args)]
struct CreateArgs {
    /// Image files (JPEG, PNG, GIF, BMP, TIFF, WebP)
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Output size as WxH; defaults to the first image's size
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Transition between images (none, fade, slide, zoom)
    #[arg(short, long)]
    transition: Option<TransitionType>,

    /// Seconds each image is shown
    #[arg(short, long)]
    duration: Option<f64>,

    /// Encoding quality (low, medium, high, ultra)
    #[arg(short, long)]
    quality: Option<Quality>,

    /// Job id; also names the output file
    #[arg(long)]
    job_id: Option<String>,

    /// Directory for the finished video
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Some(path) = &cli.config {
        info!("Loading configuration from {:?}", path);
    }
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Create(args) => create(config, args).await,
        Command::List => list(&config),
        Command::Delete { name } => {
            library(&config).delete(&name)?;
            println!("Deleted {}", name);
            Ok(())
        }
        Command::Cleanup => {
            let removed = library(&config).cleanup_older_than(config.storage.retention())?;
            println!(
                "Removed {} video(s) older than {} days",
                removed, config.storage.retention_days
            );
            Ok(())
        }
        Command::Status { server, job_id } => follow_remote(&config, &server, &job_id).await,
    }
}

fn library(config: &Config) -> OutputLibrary {
    OutputLibrary::new(&config.storage.output_dir)
}

async fn create(mut config: Config, args: CreateArgs) -> Result<()> {
    if let Some(dir) = args.output_dir {
        config.storage.output_dir = dir;
    }
    config.validate()?;

    let mut settings = config.video.settings();
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(resolution) = args.resolution {
        settings.resolution = Some(resolution);
    }
    if let Some(transition) = args.transition {
        settings.transition_type = transition;
    }
    if let Some(duration) = args.duration {
        settings.duration_per_image = duration;
    }
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }

    let mut images = Vec::with_capacity(args.images.len());
    for path in args.images {
        match check_intake(&path, &config.storage) {
            Ok(()) => images.push(path),
            Err(e) => warn!("Skipping {}", e),
        }
    }
    if images.is_empty() {
        bail!("none of the given files passed the image checks");
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    let ticket = orchestrator.submit(SynthesisRequest {
        job_id: args.job_id.map(JobId::from),
        images,
        settings,
    })?;
    info!("Started job {}", ticket.id());

    let poller = StatusPoller::new(orchestrator.clone(), PollOptions::from(&config.polling));
    let record = poller
        .wait_for(ticket.id().as_str(), |progress, message| {
            println!("[{:>3}%] {}", progress, message)
        })
        .await
        .with_context(|| format!("gave up waiting for job {}", ticket.id()))?;

    match record.status {
        JobStatus::Completed => {
            let name = record.video_reference.unwrap_or_default();
            println!("Video created: {}", config.storage.output_dir.join(name).display());
            Ok(())
        }
        _ => bail!(
            "{}",
            record.error.unwrap_or_else(|| "video creation failed".to_string())
        ),
    }
}

fn list(config: &Config) -> Result<()> {
    let entries = library(config).list()?;
    if entries.is_empty() {
        println!("No videos in {}", config.storage.output_dir.display());
        return Ok(());
    }

    for entry in entries {
        println!(
            "{:<40} {:>10.1} MB  {}",
            entry.file_name,
            entry.size_bytes as f64 / (1024.0 * 1024.0),
            entry.modified_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn follow_remote(config: &Config, server: &str, job_id: &str) -> Result<()> {
    JobId::from(job_id).check_safe()?;
    let source = Arc::new(HttpStatusSource::new(server)?);
    let poller = StatusPoller::new(source, PollOptions::from(&config.polling));

    let record = poller
        .wait_for(job_id, |progress, message| println!("[{:>3}%] {}", progress, message))
        .await?;

    match record.status {
        JobStatus::Completed => {
            println!("Video ready: {}", record.video_reference.unwrap_or_default());
            Ok(())
        }
        _ => bail!(
            "{}",
            record.error.unwrap_or_else(|| "video creation failed".to_string())
        ),
    }
}
