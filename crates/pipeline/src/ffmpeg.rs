//! Native FFmpeg engine.
//!
//! Staged assets live in a private working directory; each `exec` spawns an
//! `ffmpeg` process inside it and follows its `-progress` stream.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use unmark_common::config::EngineConfig;
use unmark_common::error::{UnmarkError, UnmarkResult};

use crate::engine::{EngineEvents, MediaEngine};
use crate::probe::probe_duration_secs;
use crate::progress::{expected_duration, ProgressState};

/// Number of stderr lines kept for failure reports.
const STDERR_TAIL_LINES: usize = 20;

/// Arguments prepended to every invocation.
const BASE_ARGS: [&str; 5] = ["-y", "-hide_banner", "-nostats", "-progress", "pipe:1"];

/// [`MediaEngine`] backed by the `ffmpeg` executable.
#[derive(Debug)]
pub struct FfmpegEngine {
    config: EngineConfig,
    work_dir: Option<PathBuf>,
    version: Option<String>,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            work_dir: None,
            version: None,
        }
    }

    /// First line of `ffmpeg -version`, once loaded.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Private working directory, once loaded.
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    fn staged_path(&self, name: &str) -> UnmarkResult<PathBuf> {
        let dir = self
            .work_dir
            .as_ref()
            .ok_or_else(|| UnmarkError::not_ready("ffmpeg engine is not loaded"))?;
        validate_staged_name(name)?;
        Ok(dir.join(name))
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn load(&mut self) -> UnmarkResult<()> {
        let output = Command::new(&self.config.ffmpeg_binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                UnmarkError::engine_load(format!(
                    "Failed to start {}: {e}",
                    self.config.ffmpeg_binary.display()
                ))
            })?;

        if !output.status.success() {
            return Err(UnmarkError::engine_load(format!(
                "{} -version exited with {}",
                self.config.ffmpeg_binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let base = self
            .config
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = base.join(format!("unmark-{}-{nanos}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            UnmarkError::engine_load(format!(
                "Failed to create working directory {}: {e}",
                dir.display()
            ))
        })?;

        tracing::info!(version = %version, work_dir = %dir.display(), "ffmpeg engine loaded");
        self.version = Some(version);
        self.work_dir = Some(dir);
        Ok(())
    }

    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> UnmarkResult<()> {
        let path = self.staged_path(name)?;
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(name, bytes = bytes.len(), "Staged file");
        Ok(())
    }

    async fn exec(&mut self, args: &[String], events: &EngineEvents) -> UnmarkResult<()> {
        let dir = self
            .work_dir
            .clone()
            .ok_or_else(|| UnmarkError::not_ready("ffmpeg engine is not loaded"))?;

        let mut durations = Vec::new();
        for name in input_names(args) {
            durations.push(probe_duration_secs(&self.config.ffprobe_binary, &dir.join(name)).await);
        }
        let shortest = args.iter().any(|a| a == "-shortest");
        let expected = expected_duration(&durations, shortest);

        tracing::debug!(?args, expected_duration_secs = ?expected, "Running ffmpeg");
        let mut child = Command::new(&self.config.ffmpeg_binary)
            .args(BASE_ARGS)
            .args(args)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| UnmarkError::execution(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| UnmarkError::execution("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| UnmarkError::execution("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let log_events = events.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "unmark::ffmpeg", "{line}");
                log_events.log(&line);
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let mut state = ProgressState::default();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| UnmarkError::execution(format!("Failed reading ffmpeg progress: {e}")))?
        {
            if state.update_line(&line) {
                events.progress(state.fraction(expected));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| UnmarkError::execution(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_tail = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(UnmarkError::execution(format!(
                "ffmpeg failed ({status}): {}",
                stderr_tail.trim()
            )));
        }

        events.progress(1.0);
        Ok(())
    }

    async fn read_file(&mut self, name: &str) -> UnmarkResult<Vec<u8>> {
        let path = self.staged_path(name)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => UnmarkError::FileNotFound { path },
            _ => UnmarkError::Io(e),
        })
    }

    async fn dispose(&mut self) -> UnmarkResult<()> {
        if let Some(dir) = self.work_dir.take() {
            tokio::fs::remove_dir_all(&dir).await?;
            tracing::debug!(work_dir = %dir.display(), "Removed working directory");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Staged names are bare file names inside the working directory.
fn validate_staged_name(name: &str) -> UnmarkResult<()> {
    let bare = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|f| f == name);
    if bare {
        Ok(())
    } else {
        Err(UnmarkError::invalid_request(format!(
            "Staged name must be a plain file name: {name:?}"
        )))
    }
}

/// Values following each `-i` flag.
fn input_names(args: &[String]) -> impl Iterator<Item = &str> {
    args.windows(2)
        .filter(|pair| pair[0] == "-i")
        .map(|pair| pair[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_name_validation() {
        assert!(validate_staged_name("input.mp4").is_ok());
        assert!(validate_staged_name("audio.mp3").is_ok());
        for bad in ["", ".", "..", "../x.mp4", "dir/x.mp4", "dir\\x.mp4", "/etc/passwd"] {
            assert!(validate_staged_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_input_names_follow_i_flags() {
        let args: Vec<String> = ["-i", "input.mp4", "-i", "audio.mp3", "-c:v", "copy", "output.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(input_names(&args).collect::<Vec<_>>(), vec!["input.mp4", "audio.mp3"]);
    }

    #[tokio::test]
    async fn test_file_access_requires_load() {
        let mut engine = FfmpegEngine::new(EngineConfig::default());
        let err = engine.write_file("input.mp4", b"data").await.unwrap_err();
        assert!(matches!(err, UnmarkError::NotReady { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_load() {
        let mut engine = FfmpegEngine::new(EngineConfig {
            ffmpeg_binary: PathBuf::from("unmark-no-such-ffmpeg"),
            ..EngineConfig::default()
        });
        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, UnmarkError::EngineLoad { .. }));
        assert!(engine.work_dir().is_none());
    }
}
