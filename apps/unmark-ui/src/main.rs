use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use eframe::egui::{self, Color32};
use image::RgbaImage;
use unmark_common::config::AppConfig;
use unmark_media_model::{AssetRole, MediaAsset, Rectangle, OUTPUT_FILE_NAME};
use unmark_pipeline::probe::extract_frame;
use unmark_pipeline::{
    progress_text, EngineEvents, EngineSession, FfmpegEngine, PlanBuilder, ProcessRequest,
    Processor,
};
use unmark_region_select::{OverlayStyle, RegionSelector, SelectionState, SelectionSurface};

mod surface;

use surface::{forward_pointer, EguiSurface, OverlayUpdate, PointerInput};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();
    unmark_common::logging::init_logging(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Unmark")
            .with_inner_size([900.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Unmark",
        options,
        Box::new(move |_cc| Box::new(UnmarkApp::new(runtime, config))),
    )
    .map_err(|e| anyhow::anyhow!("ui launch failed: {e}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EngineStatus {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug)]
enum WorkerMessage {
    EngineReady,
    EngineFailed { message: String },
    FrameLoaded { image: RgbaImage },
    FrameFailed { message: String },
    Progress(f64),
    Complete { output: PathBuf, bytes: usize },
    Failed { message: String },
}

struct UnmarkApp {
    runtime: tokio::runtime::Runtime,
    config: AppConfig,
    processor: Arc<Processor<FfmpegEngine>>,
    selector: RegionSelector<EguiSurface>,
    texture: Option<egui::TextureHandle>,
    sender: Sender<WorkerMessage>,
    receiver: Receiver<WorkerMessage>,
    engine: EngineStatus,
    video_path: String,
    audio_path: String,
    output_path: String,
    frame_at_secs: f64,
    region: Rectangle,
    processing: bool,
    progress: f64,
    status: String,
    last_output: Option<PathBuf>,
}

impl UnmarkApp {
    fn new(runtime: tokio::runtime::Runtime, config: AppConfig) -> Self {
        let (sender, receiver) = mpsc::channel();

        let progress_tx = sender.clone();
        let events = EngineEvents::default().with_progress(move |fraction| {
            let _ = progress_tx.send(WorkerMessage::Progress(fraction));
        });
        let session = Arc::new(EngineSession::new(
            FfmpegEngine::new(config.engine.clone()),
            events,
        ));
        let processor = Arc::new(Processor::new(
            session.clone(),
            PlanBuilder::new(config.encoding.clone()),
        ));

        let load_tx = sender.clone();
        runtime.spawn(async move {
            let message = match session.load().await {
                Ok(()) => WorkerMessage::EngineReady,
                Err(err) => WorkerMessage::EngineFailed {
                    message: err.user_message(),
                },
            };
            let _ = load_tx.send(message);
        });

        let selector = RegionSelector::new(
            EguiSurface::default(),
            OverlayStyle::from(&config.selection),
        );

        Self {
            runtime,
            config,
            processor,
            selector,
            texture: None,
            sender,
            receiver,
            engine: EngineStatus::Loading,
            video_path: String::new(),
            audio_path: String::new(),
            output_path: OUTPUT_FILE_NAME.to_string(),
            frame_at_secs: 0.0,
            region: Rectangle::EMPTY,
            processing: false,
            progress: 0.0,
            status: "Loading FFmpeg...".to_string(),
            last_output: None,
        }
    }

    fn load_frame(&mut self) {
        let path = PathBuf::from(self.video_path.trim());
        if path.as_os_str().is_empty() {
            self.status = "Choose a video file first".to_string();
            return;
        }

        let ffmpeg = self.config.engine.ffmpeg_binary.clone();
        let at = self.frame_at_secs;
        let tx = self.sender.clone();
        self.status = format!("Reading frame from {}...", path.display());
        self.runtime.spawn(async move {
            let message = match extract_frame(&ffmpeg, &path, at).await {
                Ok(image) => WorkerMessage::FrameLoaded { image },
                Err(err) => WorkerMessage::FrameFailed {
                    message: err.user_message(),
                },
            };
            let _ = tx.send(message);
        });
    }

    fn restart_selection(&mut self) {
        self.region = Rectangle::EMPTY;
        match self.selector.begin() {
            Ok(()) => self.status = "Drag over the frame to mark the watermark".to_string(),
            Err(err) => self.status = err.user_message(),
        }
    }

    fn start_processing(&mut self) {
        let video = PathBuf::from(self.video_path.trim());
        let audio = Some(self.audio_path.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let output = match self.output_path.trim() {
            "" => PathBuf::from(OUTPUT_FILE_NAME),
            path => PathBuf::from(path),
        };

        let processor = self.processor.clone();
        let region = self.region;
        let tx = self.sender.clone();

        self.processing = true;
        self.progress = 0.0;
        self.last_output = None;
        self.status = progress_text(0.0);

        self.runtime.spawn(async move {
            let result = async {
                let video = MediaAsset::from_path(AssetRole::VideoInput, &video)
                    .map_err(|e| format!("Error: {e}"))?;
                let audio = audio
                    .map(|path| MediaAsset::from_path(AssetRole::AudioInput, path))
                    .transpose()
                    .map_err(|e| format!("Error: {e}"))?;

                let request = ProcessRequest::new(video, audio, region);
                let asset = processor
                    .process(&request)
                    .await
                    .map_err(|e| e.user_message())?;
                asset
                    .write_to(&output)
                    .map_err(|e| format!("Error: {e}"))?;
                Ok::<_, String>(asset.len())
            }
            .await;

            let message = match result {
                Ok(bytes) => WorkerMessage::Complete { output, bytes },
                Err(message) => WorkerMessage::Failed { message },
            };
            let _ = tx.send(message);
        });
    }

    fn poll_worker_messages(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(WorkerMessage::EngineReady) => {
                    self.engine = EngineStatus::Ready;
                    self.status = "Ready".to_string();
                }
                Ok(WorkerMessage::EngineFailed { message }) => {
                    self.status = message.clone();
                    self.engine = EngineStatus::Failed(message);
                }
                Ok(WorkerMessage::FrameLoaded { image }) => {
                    self.selector.cancel();
                    self.selector.surface_mut().set_frame(image);
                    self.restart_selection();
                }
                Ok(WorkerMessage::FrameFailed { message }) => {
                    self.status = message;
                }
                Ok(WorkerMessage::Progress(fraction)) => {
                    if self.processing {
                        self.progress = fraction;
                        self.status = progress_text(fraction);
                    }
                }
                Ok(WorkerMessage::Complete { output, bytes }) => {
                    self.processing = false;
                    self.progress = 1.0;
                    self.status = format!("Done: {} ({bytes} bytes)", output.display());
                    self.last_output = Some(output);
                }
                Ok(WorkerMessage::Failed { message }) => {
                    self.processing = false;
                    self.status = message;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => break,
            }
        }
    }

    fn apply_overlay_update(&mut self, ctx: &egui::Context) {
        self.selector.surface_mut().tick(Instant::now());
        let image = match self.selector.surface_mut().take_update() {
            Some(OverlayUpdate::Show(image)) => image,
            Some(OverlayUpdate::Hide) => match self.selector.surface().frame() {
                Some(frame) => frame.clone(),
                None => return,
            },
            None => return,
        };

        let color = egui::ColorImage::from_rgba_unmultiplied(
            [image.width() as usize, image.height() as usize],
            image.as_raw(),
        );
        match self.texture.as_mut() {
            Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("video-frame", color, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn frame_view(&mut self, ui: &mut egui::Ui) {
        let Some(texture_id) = self.texture.as_ref().map(|t| t.id()) else {
            ui.label("Load a video to select the watermark region.");
            return;
        };

        let video = self.selector.surface().video_size();
        let available = ui.available_size();
        let scale = (available.x / video.width as f32)
            .min(460.0 / video.height as f32)
            .min(1.0);
        let size = egui::vec2(video.width as f32 * scale, video.height as f32 * scale);

        let response =
            ui.add(egui::Image::new((texture_id, size)).sense(egui::Sense::click_and_drag()));
        self.selector
            .surface_mut()
            .set_display_rect(response.rect);

        if self.processing || !self.selector.surface().accepts_pointer() {
            return;
        }

        let (input, pos) = ui.input(|i| {
            (
                PointerInput {
                    pressed: i.pointer.primary_pressed(),
                    down: i.pointer.primary_down(),
                    released: i.pointer.primary_released(),
                    inside: false,
                },
                i.pointer.interact_pos(),
            )
        });
        let Some(pos) = pos else {
            return;
        };
        let input = PointerInput {
            inside: response.rect.contains(pos),
            ..input
        };

        let committed = forward_pointer(&mut self.selector, input, pos.x as f64, pos.y as f64);
        if let Some(rectangle) = committed {
            self.region = rectangle;
            self.status = if rectangle.has_area() {
                format!("Watermark region: {rectangle}")
            } else {
                "Empty selection; drag a box around the watermark".to_string()
            };
        }
    }

    fn can_process(&self) -> bool {
        self.engine == EngineStatus::Ready
            && !self.processing
            && !self.video_path.trim().is_empty()
    }
}

impl eframe::App for UnmarkApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
        self.poll_worker_messages();
        self.apply_overlay_update(ctx);

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.add_space(4.0);
            if self.processing {
                ui.add(
                    egui::ProgressBar::new(self.progress as f32)
                        .text(progress_text(self.progress)),
                );
            }
            let color = match self.engine {
                EngineStatus::Failed(_) => Color32::from_rgb(230, 90, 90),
                _ => ui.visuals().text_color(),
            };
            ui.colored_label(color, format!("Status: {}", self.status));
            if let Some(path) = self.last_output.as_ref() {
                ui.label(format!("Output: {}", path.display()));
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Unmark");
            ui.separator();

            ui.add_enabled_ui(!self.processing, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Video");
                    ui.text_edit_singleline(&mut self.video_path);
                    ui.label("at");
                    ui.add(
                        egui::DragValue::new(&mut self.frame_at_secs)
                            .clamp_range(0.0..=86_400.0)
                            .speed(0.1)
                            .suffix("s"),
                    );
                    if ui.button("Load").clicked() {
                        self.load_frame();
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Voiceover (optional)");
                    ui.text_edit_singleline(&mut self.audio_path);
                });
                ui.horizontal(|ui| {
                    ui.label("Save as");
                    ui.text_edit_singleline(&mut self.output_path);
                });
            });

            ui.add_space(6.0);
            self.frame_view(ui);
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                let region_text = if self.region.has_area() {
                    format!(
                        "Region: x={} y={} w={} h={}",
                        self.region.x, self.region.y, self.region.width, self.region.height
                    )
                } else {
                    "Region: none".to_string()
                };
                ui.label(region_text);

                let can_reselect = !self.processing
                    && self.selector.surface().frame().is_some()
                    && self.selector.state() != SelectionState::Armed;
                if ui
                    .add_enabled(can_reselect, egui::Button::new("Select Again"))
                    .clicked()
                {
                    self.restart_selection();
                }

                let button = egui::Button::new("Process Video")
                    .fill(Color32::from_rgb(52, 110, 200));
                if ui.add_enabled(self.can_process(), button).clicked() {
                    self.start_processing();
                }
            });
        });
    }
}

impl Drop for UnmarkApp {
    fn drop(&mut self) {
        if let Err(err) = self.runtime.block_on(self.processor.session().dispose()) {
            tracing::warn!(error = %err, "Failed to dispose engine session");
        }
    }
}
