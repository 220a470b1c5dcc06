//! Run a full processing request against the native FFmpeg engine.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use unmark_common::config::AppConfig;
use unmark_media_model::{AssetRole, MediaAsset, Rectangle, OUTPUT_FILE_NAME};
use unmark_pipeline::probe::probe_video_size;
use unmark_pipeline::{
    progress_text, EngineEvents, EngineSession, FfmpegEngine, PlanBuilder, ProcessRequest,
    Processor,
};

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    audio: Option<PathBuf>,
    region: Option<Rectangle>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let output_path = output.unwrap_or_else(|| PathBuf::from(OUTPUT_FILE_NAME));
    let mut region = region.unwrap_or(Rectangle::EMPTY);

    if region.has_area() {
        if let Some(size) = probe_video_size(&config.engine.ffprobe_binary, &video).await {
            if !region.fits_within(size) {
                let clamped = region.clamp_to(size);
                tracing::warn!(
                    requested = %region,
                    clamped = %clamped,
                    frame = %size,
                    "Region extends past the frame; clamping"
                );
                region = clamped;
            }
        }
    }

    let video_asset = MediaAsset::from_path(AssetRole::VideoInput, &video)?;
    let audio_asset = audio
        .as_ref()
        .map(|path| MediaAsset::from_path(AssetRole::AudioInput, path))
        .transpose()?;

    println!("Processing: {}", video.display());
    if region.has_area() {
        println!("  Region: {region}");
    }
    if let Some(path) = &audio {
        println!("  Audio: {}", path.display());
    }
    println!("  Output: {}", output_path.display());

    let events = EngineEvents::default().with_progress(|fraction| {
        print!("\r  {}  ", progress_text(fraction));
        let _ = std::io::stdout().flush();
    });
    let session = Arc::new(EngineSession::new(
        FfmpegEngine::new(config.engine.clone()),
        events,
    ));
    session
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("{} ({e})", e.user_message()))?;

    let processor = Processor::new(session.clone(), PlanBuilder::new(config.encoding.clone()));
    let request = ProcessRequest::new(video_asset, audio_asset, region);
    let result = processor.process(&request).await;

    if let Err(e) = session.dispose().await {
        tracing::warn!(error = %e, "Failed to clean up engine working directory");
    }

    match result {
        Ok(asset) => {
            asset.write_to(&output_path)?;
            println!(
                "\nDone: {} ({} bytes)",
                output_path.display(),
                asset.len()
            );
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("{}", e.user_message()))
        }
    }
}
