//! Show video information.

use std::path::PathBuf;

use unmark_common::config::AppConfig;
use unmark_pipeline::probe::{probe_duration_secs, probe_video_size};

pub async fn run(config: &AppConfig, video: PathBuf) -> anyhow::Result<()> {
    if !video.exists() {
        return Err(anyhow::anyhow!("File not found: {}", video.display()));
    }

    let ffprobe = &config.engine.ffprobe_binary;
    let size = probe_video_size(ffprobe, &video).await;
    let duration = probe_duration_secs(ffprobe, &video).await;

    println!("Video: {}", video.display());
    match size {
        Some(size) => println!("  Resolution: {size}"),
        None => println!("  Resolution: unknown (no video stream?)"),
    }
    match duration {
        Some(secs) => println!("  Duration: {secs:.2}s"),
        None => println!("  Duration: unknown"),
    }

    Ok(())
}
