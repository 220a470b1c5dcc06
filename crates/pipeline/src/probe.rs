//! ffprobe / FFmpeg helpers for inspecting source media.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use unmark_common::error::{UnmarkError, UnmarkResult};
use unmark_media_model::VideoSize;

/// Check whether an executable can be started.
pub async fn command_exists(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Resolution of the first video stream.
pub async fn probe_video_size(ffprobe: &Path, path: &Path) -> Option<VideoSize> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_dimensions(&String::from_utf8(output.stdout).ok()?)
}

/// Container duration in seconds.
pub async fn probe_duration_secs(ffprobe: &Path, path: &Path) -> Option<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_duration(&String::from_utf8(output.stdout).ok()?)
}

/// Decode a single frame at `at_secs` into RGBA.
pub async fn extract_frame(
    ffmpeg: &Path,
    path: &Path,
    at_secs: f64,
) -> UnmarkResult<image::RgbaImage> {
    if !path.exists() {
        return Err(UnmarkError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let seek = format!("{:.3}", at_secs.max(0.0));
    tracing::debug!(path = %path.display(), seek = %seek, "Extracting frame");

    let output = Command::new(ffmpeg)
        .args(["-v", "error", "-ss", &seek, "-i"])
        .arg(path)
        .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| UnmarkError::media(format!("Failed to start ffmpeg: {e}")))?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(UnmarkError::media(format!(
            "Could not extract a frame at {seek}s from {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let decoded = image::load_from_memory(&output.stdout)
        .map_err(|e| UnmarkError::media(format!("Failed to decode extracted frame: {e}")))?;
    Ok(decoded.to_rgba8())
}

fn parse_dimensions(raw: &str) -> Option<VideoSize> {
    let line = raw.lines().next()?.trim();
    let (w, h) = line.split_once('x')?;
    let size = VideoSize::new(w.parse().ok()?, h.parse().ok()?);
    if size.is_empty() {
        return None;
    }
    Some(size)
}

fn parse_duration(raw: &str) -> Option<f64> {
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
