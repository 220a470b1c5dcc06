//! Check that the external tools Unmark drives are available.

use unmark_common::config::{config_file_path, AppConfig};
use unmark_pipeline::probe::command_exists;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Unmark System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("ffmpeg", &config.engine.ffmpeg_binary),
        ("ffprobe", &config.engine.ffprobe_binary),
    ];

    let mut all_ok = true;
    for (label, binary) in tools {
        if command_exists(binary).await {
            println!("[OK] {label}: {}", binary.display());
        } else {
            println!("[MISSING] {label}: {} not found", binary.display());
            all_ok = false;
        }
    }

    println!();
    println!("Config file: {}", config_file_path().display());
    println!(
        "Encoding: video={} (preset {}), audio={}",
        config.encoding.video_codec, config.encoding.video_preset, config.encoding.audio_codec
    );

    println!();
    if all_ok {
        println!("All required tools are available. Unmark is ready.");
        Ok(())
    } else {
        println!("Install FFmpeg (with ffprobe) or set engine paths in the config file.");
        Err(anyhow::anyhow!("required tools are missing"))
    }
}
