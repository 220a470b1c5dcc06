//! Processing plans: what the engine should do for one request.
//!
//! The builder is a pure function of `(region, has_audio)` and the encoder
//! settings. It never touches bytes or the engine, so every case can be
//! checked against the exact argv it renders.

use std::fmt;

use serde::Serialize;
use unmark_common::config::EncodingConfig;
use unmark_common::error::{UnmarkError, UnmarkResult};
use unmark_media_model::geometry::Rectangle;
use unmark_media_model::media::AssetRole;

/// Name the source video is staged under.
pub const STAGED_VIDEO_NAME: &str = "input.mp4";

/// Name the replacement audio is staged under.
pub const STAGED_AUDIO_NAME: &str = "audio.mp3";

/// Name the engine writes its output to.
pub const OUTPUT_NAME: &str = "output.mp4";

const FILTERED_VIDEO_LABEL: &str = "v";
const REPLACEMENT_AUDIO_LABEL: &str = "a";

/// Which of the three valid requests a plan serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    RemoveWatermark,
    ReplaceAudio,
    RemoveWatermarkAndReplaceAudio,
}

impl PlanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanKind::RemoveWatermark => "remove_watermark",
            PlanKind::ReplaceAudio => "replace_audio",
            PlanKind::RemoveWatermarkAndReplaceAudio => "remove_watermark_and_replace_audio",
        }
    }
}

/// Media type of an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// One `-map` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamSelector {
    /// Output pad of the filter graph, rendered as `[label]`.
    Filtered { label: String },
    /// Stream of an input file, rendered as `0:v` or `0:a?` when optional.
    Input {
        index: usize,
        kind: StreamKind,
        optional: bool,
    },
}

impl StreamSelector {
    fn filtered(label: &str) -> Self {
        Self::Filtered {
            label: label.to_string(),
        }
    }

    fn input(index: usize, kind: StreamKind) -> Self {
        Self::Input {
            index,
            kind,
            optional: false,
        }
    }

    fn optional_input(index: usize, kind: StreamKind) -> Self {
        Self::Input {
            index,
            kind,
            optional: true,
        }
    }
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSelector::Filtered { label } => write!(f, "[{label}]"),
            StreamSelector::Input {
                index,
                kind,
                optional,
            } => {
                write!(f, "{index}:{}", kind.specifier())?;
                if *optional {
                    f.write_str("?")?;
                }
                Ok(())
            }
        }
    }
}

/// An input the engine reads, in `-i` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanInput {
    pub role: AssetRole,
    pub staged_name: String,
}

/// What happens to a stream on its way to the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CodecChoice {
    /// Pass packets through untouched.
    Copy,
    /// Re-encode with the given encoder.
    Encode {
        codec: String,
        preset: Option<String>,
    },
}

impl CodecChoice {
    pub fn is_copy(&self) -> bool {
        matches!(self, CodecChoice::Copy)
    }

    fn push_args(&self, flag: &str, args: &mut Vec<String>) {
        match self {
            CodecChoice::Copy => {
                args.push(flag.to_string());
                args.push("copy".to_string());
            }
            CodecChoice::Encode { codec, preset } => {
                args.push(flag.to_string());
                args.push(codec.clone());
                if let Some(preset) = preset {
                    args.push("-preset".to_string());
                    args.push(preset.clone());
                }
            }
        }
    }
}

/// Per-stream encoder choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncoderOptions {
    pub video: CodecChoice,
    pub audio: CodecChoice,
}

/// How long the output runs when inputs differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Runs as long as the source video.
    Source,
    /// Truncated to the shortest mapped input.
    Shortest,
}

/// A fully resolved engine invocation.
///
/// Immutable once built; [`EngineSession::execute`](crate::EngineSession::execute)
/// takes it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelinePlan {
    kind: PlanKind,
    filter_graph: Option<String>,
    inputs: Vec<PlanInput>,
    output_mapping: Vec<StreamSelector>,
    encoder: EncoderOptions,
    duration: DurationPolicy,
    output_name: String,
}

impl PipelinePlan {
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    pub fn filter_graph(&self) -> Option<&str> {
        self.filter_graph.as_deref()
    }

    pub fn inputs(&self) -> &[PlanInput] {
        &self.inputs
    }

    pub fn output_mapping(&self) -> &[StreamSelector] {
        &self.output_mapping
    }

    pub fn encoder(&self) -> &EncoderOptions {
        &self.encoder
    }

    pub fn duration(&self) -> DurationPolicy {
        self.duration
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Staged name for the asset with `role`, if the plan reads one.
    pub fn staged_name(&self, role: AssetRole) -> Option<&str> {
        self.inputs
            .iter()
            .find(|input| input.role == role)
            .map(|input| input.staged_name.as_str())
    }

    /// Render the engine argv.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.staged_name.clone());
        }

        if let Some(graph) = &self.filter_graph {
            args.push("-filter_complex".to_string());
            args.push(graph.clone());
        }

        for selector in &self.output_mapping {
            args.push("-map".to_string());
            args.push(selector.to_string());
        }

        self.encoder.video.push_args("-c:v", &mut args);
        self.encoder.audio.push_args("-c:a", &mut args);

        if self.duration == DurationPolicy::Shortest {
            args.push("-shortest".to_string());
        }

        args.push(self.output_name.clone());
        args
    }
}

/// Builds plans from a region and audio presence.
#[derive(Debug, Clone, Default)]
pub struct PlanBuilder {
    encoding: EncodingConfig,
}

impl PlanBuilder {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Resolve the plan for one request.
    ///
    /// Returns [`UnmarkError::InvalidRequest`] when there is neither a
    /// region to obscure nor audio to swap in.
    pub fn build(&self, region: &Rectangle, has_audio: bool) -> UnmarkResult<PipelinePlan> {
        let plan = match (region.has_area(), has_audio) {
            (true, false) => PipelinePlan {
                kind: PlanKind::RemoveWatermark,
                filter_graph: Some(obscure_filter(region)),
                inputs: vec![video_input()],
                output_mapping: vec![
                    StreamSelector::filtered(FILTERED_VIDEO_LABEL),
                    StreamSelector::optional_input(0, StreamKind::Audio),
                ],
                encoder: EncoderOptions {
                    video: self.video_encode(),
                    audio: CodecChoice::Copy,
                },
                duration: DurationPolicy::Source,
                output_name: OUTPUT_NAME.to_string(),
            },
            (true, true) => PipelinePlan {
                kind: PlanKind::RemoveWatermarkAndReplaceAudio,
                filter_graph: Some(format!(
                    "{};[1:a]volume=1.0[{REPLACEMENT_AUDIO_LABEL}]",
                    obscure_filter(region)
                )),
                inputs: vec![video_input(), audio_input()],
                output_mapping: vec![
                    StreamSelector::filtered(FILTERED_VIDEO_LABEL),
                    StreamSelector::filtered(REPLACEMENT_AUDIO_LABEL),
                ],
                encoder: EncoderOptions {
                    video: self.video_encode(),
                    audio: self.audio_encode(),
                },
                duration: DurationPolicy::Shortest,
                output_name: OUTPUT_NAME.to_string(),
            },
            (false, true) => PipelinePlan {
                kind: PlanKind::ReplaceAudio,
                filter_graph: None,
                inputs: vec![video_input(), audio_input()],
                output_mapping: vec![
                    StreamSelector::input(0, StreamKind::Video),
                    StreamSelector::input(1, StreamKind::Audio),
                ],
                encoder: EncoderOptions {
                    video: CodecChoice::Copy,
                    audio: self.audio_encode(),
                },
                duration: DurationPolicy::Shortest,
                output_name: OUTPUT_NAME.to_string(),
            },
            (false, false) => {
                return Err(UnmarkError::invalid_request(
                    "no watermark region selected and no replacement audio supplied",
                ));
            }
        };

        tracing::debug!(
            kind = plan.kind.as_str(),
            inputs = plan.inputs.len(),
            filter = plan.filter_graph.as_deref().unwrap_or("none"),
            "Pipeline plan built"
        );
        Ok(plan)
    }

    fn video_encode(&self) -> CodecChoice {
        CodecChoice::Encode {
            codec: self.encoding.video_codec.clone(),
            preset: Some(self.encoding.video_preset.clone()).filter(|p| !p.is_empty()),
        }
    }

    fn audio_encode(&self) -> CodecChoice {
        CodecChoice::Encode {
            codec: self.encoding.audio_codec.clone(),
            preset: None,
        }
    }
}

/// Build a plan with the default encoder settings.
pub fn build_plan(region: &Rectangle, has_audio: bool) -> UnmarkResult<PipelinePlan> {
    PlanBuilder::default().build(region, has_audio)
}

fn video_input() -> PlanInput {
    PlanInput {
        role: AssetRole::VideoInput,
        staged_name: STAGED_VIDEO_NAME.to_string(),
    }
}

fn audio_input() -> PlanInput {
    PlanInput {
        role: AssetRole::AudioInput,
        staged_name: STAGED_AUDIO_NAME.to_string(),
    }
}

fn obscure_filter(region: &Rectangle) -> String {
    format!(
        "[0:v]delogo=x={}:y={}:w={}:h={}[{FILTERED_VIDEO_LABEL}]",
        region.x, region.y, region.width, region.height
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn args(plan: &PipelinePlan) -> Vec<String> {
        plan.to_args()
    }

    #[test]
    fn test_region_only_obscures_video_and_copies_audio() {
        let plan = build_plan(&Rectangle::new(10, 10, 50, 30), false).unwrap();

        assert_eq!(plan.kind(), PlanKind::RemoveWatermark);
        assert_eq!(plan.duration(), DurationPolicy::Source);
        assert!(plan.encoder().audio.is_copy());
        assert_eq!(plan.staged_name(AssetRole::AudioInput), None);
        assert_eq!(
            args(&plan),
            vec![
                "-i",
                "input.mp4",
                "-filter_complex",
                "[0:v]delogo=x=10:y=10:w=50:h=30[v]",
                "-map",
                "[v]",
                "-map",
                "0:a?",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-c:a",
                "copy",
                "output.mp4",
            ]
        );
    }

    #[test]
    fn test_audio_only_copies_video_and_replaces_audio() {
        let plan = build_plan(&Rectangle::new(10, 10, 0, 30), true).unwrap();

        assert_eq!(plan.kind(), PlanKind::ReplaceAudio);
        assert_eq!(plan.filter_graph(), None);
        assert!(plan.encoder().video.is_copy());
        assert_eq!(plan.duration(), DurationPolicy::Shortest);
        assert_eq!(
            args(&plan),
            vec![
                "-i",
                "input.mp4",
                "-i",
                "audio.mp3",
                "-map",
                "0:v",
                "-map",
                "1:a",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "-shortest",
                "output.mp4",
            ]
        );
    }

    #[test]
    fn test_region_and_audio_reencode_both_and_truncate() {
        let plan = build_plan(&Rectangle::new(5, 6, 7, 8), true).unwrap();

        assert_eq!(plan.kind(), PlanKind::RemoveWatermarkAndReplaceAudio);
        assert_eq!(plan.staged_name(AssetRole::AudioInput), Some("audio.mp3"));
        assert_eq!(
            args(&plan),
            vec![
                "-i",
                "input.mp4",
                "-i",
                "audio.mp3",
                "-filter_complex",
                "[0:v]delogo=x=5:y=6:w=7:h=8[v];[1:a]volume=1.0[a]",
                "-map",
                "[v]",
                "-map",
                "[a]",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-c:a",
                "aac",
                "-shortest",
                "output.mp4",
            ]
        );
    }

    #[test]
    fn test_nothing_to_do_is_invalid() {
        let err = build_plan(&Rectangle::EMPTY, false).unwrap_err();
        assert!(matches!(err, UnmarkError::InvalidRequest { .. }));

        let err = build_plan(&Rectangle::new(10, 10, 50, 0), false).unwrap_err();
        assert!(matches!(err, UnmarkError::InvalidRequest { .. }));
    }

    #[test]
    fn test_custom_encoding_flows_into_args() {
        let builder = PlanBuilder::new(EncodingConfig {
            video_codec: "libx265".to_string(),
            video_preset: String::new(),
            audio_codec: "libopus".to_string(),
        });
        let plan = builder.build(&Rectangle::new(1, 1, 2, 2), true).unwrap();
        let rendered = plan.to_args();
        assert!(rendered.windows(2).any(|w| w == ["-c:v", "libx265"]));
        assert!(rendered.windows(2).any(|w| w == ["-c:a", "libopus"]));
        assert!(!rendered.iter().any(|arg| arg == "-preset"));
    }

    #[test]
    fn test_selector_rendering() {
        assert_eq!(StreamSelector::filtered("v").to_string(), "[v]");
        assert_eq!(StreamSelector::input(1, StreamKind::Audio).to_string(), "1:a");
        assert_eq!(
            StreamSelector::optional_input(0, StreamKind::Audio).to_string(),
            "0:a?"
        );
    }

    #[test]
    fn test_plan_serializes_for_inspection() {
        let plan = build_plan(&Rectangle::new(10, 10, 50, 30), false).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["kind"], "remove_watermark");
        assert_eq!(json["duration"], "source");
        assert_eq!(json["inputs"][0]["role"], "video-input");
        assert_eq!(json["encoder"]["audio"]["mode"], "copy");
    }

    proptest! {
        #[test]
        fn prop_builder_is_deterministic(
            x in 0u32..4000,
            y in 0u32..4000,
            width in 0u32..500,
            height in 0u32..500,
            has_audio in any::<bool>(),
        ) {
            let region = Rectangle::new(x, y, width, height);
            let first = build_plan(&region, has_audio);
            let second = build_plan(&region, has_audio);
            match (first, second) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a.to_args(), b.to_args());
                    prop_assert_eq!(a, b);
                }
                (Err(_), Err(_)) => prop_assert!(!region.has_area() && !has_audio),
                _ => prop_assert!(false, "builder gave different outcomes"),
            }
        }

        #[test]
        fn prop_audio_plans_truncate_to_shortest(
            x in 0u32..4000,
            y in 0u32..4000,
            width in 0u32..500,
            height in 0u32..500,
        ) {
            let plan = build_plan(&Rectangle::new(x, y, width, height), true).unwrap();
            prop_assert_eq!(plan.duration(), DurationPolicy::Shortest);
            prop_assert!(plan.to_args().iter().any(|arg| arg == "-shortest"));
        }
    }
}
