//! Unmark CLI: watermark removal and voiceover replacement from the terminal.
//!
//! Usage:
//!   unmark process <VIDEO>   Obscure a region and/or replace the audio track
//!   unmark plan              Print the FFmpeg arguments for a request
//!   unmark select <VIDEO>    Run a scripted drag over a video frame
//!   unmark info <VIDEO>      Show video resolution and duration
//!   unmark check             Check FFmpeg availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use unmark_common::config::AppConfig;
use unmark_media_model::{PixelPoint, Rectangle, VideoSize};

mod commands;

#[derive(Parser)]
#[command(
    name = "unmark",
    about = "Remove video watermarks and replace audio tracks",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Obscure a watermark region and/or replace the audio track
    Process {
        /// Source video
        video: PathBuf,

        /// Replacement audio track
        #[arg(short, long)]
        audio: Option<PathBuf>,

        /// Watermark region in video pixels: X,Y,W,H
        #[arg(short, long)]
        region: Option<Rectangle>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the FFmpeg arguments a request would run
    Plan {
        /// Watermark region in video pixels: X,Y,W,H
        #[arg(short, long)]
        region: Option<Rectangle>,

        /// Plan as if a replacement audio track was supplied
        #[arg(long)]
        with_audio: bool,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Select a region by replaying a drag over a displayed frame
    Select {
        /// Source video
        video: PathBuf,

        /// Size of the on-screen frame the drag happens on: WxH
        #[arg(long, value_parser = parse_size)]
        display: VideoSize,

        /// Pointer-down position in display coordinates: X,Y
        #[arg(long, value_parser = parse_point)]
        from: PixelPoint,

        /// Pointer-up position in display coordinates: X,Y
        #[arg(long, value_parser = parse_point)]
        to: PixelPoint,

        /// Timestamp of the frame to select on (seconds)
        #[arg(long, default_value = "0.0")]
        at: f64,

        /// Write the frame with the selection box drawn to this PNG
        #[arg(long)]
        preview: Option<PathBuf>,
    },

    /// Show video information
    Info {
        /// Source video
        video: PathBuf,
    },

    /// Check FFmpeg availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    unmark_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Process {
            video,
            audio,
            region,
            output,
        } => commands::process::run(&config, video, audio, region, output).await,
        Commands::Plan {
            region,
            with_audio,
            json,
        } => commands::plan::run(&config, region, with_audio, json),
        Commands::Select {
            video,
            display,
            from,
            to,
            at,
            preview,
        } => commands::select::run(&config, video, display, from, to, at, preview).await,
        Commands::Info { video } => commands::info::run(&config, video).await,
        Commands::Check => commands::check::run(&config).await,
    }
}

fn parse_size(raw: &str) -> Result<VideoSize, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {raw:?}"))?;
    let size = VideoSize::new(
        w.trim().parse().map_err(|e| format!("bad width: {e}"))?,
        h.trim().parse().map_err(|e| format!("bad height: {e}"))?,
    );
    if size.is_empty() {
        return Err(format!("display size must be non-zero, got {size}"));
    }
    Ok(size)
}

fn parse_point(raw: &str) -> Result<PixelPoint, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {raw:?}"))?;
    Ok(PixelPoint::new(
        x.trim().parse().map_err(|e| format!("bad x: {e}"))?,
        y.trim().parse().map_err(|e| format!("bad y: {e}"))?,
    ))
}
