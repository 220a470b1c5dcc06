//! The single entry point a shell calls to process a video.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use unmark_common::error::{UnmarkError, UnmarkResult};
use unmark_media_model::{AssetRole, MediaAsset, Rectangle, OUTPUT_FILE_NAME};

use crate::engine::MediaEngine;
use crate::plan::PlanBuilder;
use crate::session::EngineSession;

/// Everything the user supplied for one run.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub video: MediaAsset,
    pub audio: Option<MediaAsset>,
    /// `Rectangle::EMPTY` when no region was selected.
    pub region: Rectangle,
}

impl ProcessRequest {
    pub fn new(video: MediaAsset, audio: Option<MediaAsset>, region: Rectangle) -> Self {
        Self {
            video,
            audio,
            region,
        }
    }

    fn asset(&self, role: AssetRole) -> Option<&MediaAsset> {
        match role {
            AssetRole::VideoInput => Some(&self.video),
            AssetRole::AudioInput => self.audio.as_ref(),
            AssetRole::VideoOutput => None,
        }
    }
}

/// Runs requests against a shared session, one at a time.
pub struct Processor<E: MediaEngine> {
    session: Arc<EngineSession<E>>,
    builder: PlanBuilder,
    processing: AtomicBool,
}

impl<E: MediaEngine> Processor<E> {
    pub fn new(session: Arc<EngineSession<E>>, builder: PlanBuilder) -> Self {
        Self {
            session,
            builder,
            processing: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<EngineSession<E>> {
        &self.session
    }

    pub fn builder(&self) -> &PlanBuilder {
        &self.builder
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Build, stage, execute and retrieve.
    ///
    /// Requests with nothing to do are rejected before the engine is touched.
    pub async fn process(&self, request: &ProcessRequest) -> UnmarkResult<MediaAsset> {
        let plan = self
            .builder
            .build(&request.region, request.audio.is_some())?;

        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(UnmarkError::busy("a request is already being processed"));
        }
        let _processing = ProcessingGuard {
            flag: &self.processing,
        };

        tracing::info!(
            kind = plan.kind().as_str(),
            region = %request.region,
            has_audio = request.audio.is_some(),
            "Processing request"
        );

        for input in plan.inputs() {
            let asset = request.asset(input.role).ok_or_else(|| {
                UnmarkError::invalid_request(format!("missing {} asset", input.role))
            })?;
            self.session.stage(&input.staged_name, asset).await?;
        }

        let output_name = plan.output_name().to_string();
        self.session.execute(plan).await?;
        let output = self.session.retrieve(&output_name).await?;

        tracing::info!(bytes = output.len(), "Processing complete");
        Ok(output.with_file_name(OUTPUT_FILE_NAME))
    }
}

struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Status line shown while a plan runs.
pub fn progress_text(fraction: f64) -> String {
    format!("Processing: {}%", (fraction.clamp(0.0, 1.0) * 100.0).round() as u32)
}
