//! Unmark Processing Pipeline
//!
//! Turns user intent into an engine invocation and runs it.
//!
//! # Flow
//!
//! ```text
//! (region, has_audio) ──▶ PlanBuilder ──▶ PipelinePlan
//!                                              │
//! video / audio assets ──▶ EngineSession::stage │
//!                                              ▼
//!                           EngineSession::execute ──▶ MediaEngine::exec
//!                                              │
//!                           EngineSession::retrieve ──▶ processed_video.mp4
//! ```
//!
//! [`Processor`] wraps the whole sequence behind a single
//! one-request-at-a-time entry point.

pub mod engine;
pub mod ffmpeg;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod request;
pub mod session;

pub use engine::*;
pub use ffmpeg::FfmpegEngine;
pub use plan::*;
pub use request::*;
pub use session::*;
