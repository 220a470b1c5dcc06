//! Replay a pointer drag over a video frame through the region selector.

use std::path::PathBuf;
use std::time::Duration;

use image::RgbaImage;
use unmark_common::config::AppConfig;
use unmark_common::error::UnmarkResult;
use unmark_media_model::{DisplayBox, PixelPoint, VideoSize};
use unmark_pipeline::probe::extract_frame;
use unmark_region_select::{
    FrameSnapshot, ListenerHandle, OverlayStyle, RegionSelector, SelectionSurface,
};

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    display: VideoSize,
    from: PixelPoint,
    to: PixelPoint,
    at: f64,
    preview: Option<PathBuf>,
) -> anyhow::Result<()> {
    let frame = extract_frame(&config.engine.ffmpeg_binary, &video, at).await?;
    let frame_size = VideoSize::new(frame.width(), frame.height());
    println!("Frame at {at:.2}s: {frame_size}, displayed at {display}");

    let surface = ScriptedSurface::new(frame, display);
    let mut selector = RegionSelector::new(surface, OverlayStyle::from(&config.selection));

    selector.begin()?;
    selector.pointer_down(from.x, from.y);
    selector.pointer_move(to.x, to.y);
    let rectangle = selector
        .pointer_up(to.x, to.y)
        .ok_or_else(|| anyhow::anyhow!("drag did not produce a selection"))?;

    if rectangle.has_area() {
        println!("Region: {rectangle}");
        println!("  Use with: unmark process {} --region {rectangle}", video.display());
    } else {
        println!("Region: empty (the drag had no width or height)");
    }

    if let Some(path) = preview {
        match selector.surface().last_overlay() {
            Some(image) => {
                image.save(&path)?;
                println!("Preview: {}", path.display());
            }
            None => println!("No overlay was drawn; preview not written"),
        }
    }

    Ok(())
}

/// A surface with no window: the frame is "shown" at a fixed display size
/// at the origin, and overlays are kept for inspection.
struct ScriptedSurface {
    frame: RgbaImage,
    display: VideoSize,
    next_listener: u64,
    overlay: Option<RgbaImage>,
}

impl ScriptedSurface {
    fn new(frame: RgbaImage, display: VideoSize) -> Self {
        Self {
            frame,
            display,
            next_listener: 1,
            overlay: None,
        }
    }

    fn last_overlay(&self) -> Option<&RgbaImage> {
        self.overlay.as_ref()
    }
}

impl SelectionSurface for ScriptedSurface {
    fn display_box(&self) -> DisplayBox {
        DisplayBox::sized(self.display.width as f64, self.display.height as f64)
    }

    fn video_size(&self) -> VideoSize {
        VideoSize::new(self.frame.width(), self.frame.height())
    }

    fn capture_frame(&mut self) -> UnmarkResult<FrameSnapshot> {
        Ok(FrameSnapshot::new(self.frame.clone()))
    }

    fn attach_pointer_listeners(&mut self) -> ListenerHandle {
        let handle = ListenerHandle::new(self.next_listener);
        self.next_listener += 1;
        handle
    }

    fn detach_pointer_listeners(&mut self, handle: ListenerHandle) {
        tracing::trace!(id = handle.id(), "Pointer listeners detached");
    }

    fn present_overlay(&mut self, frame: &RgbaImage) {
        self.overlay = Some(frame.clone());
    }

    fn hide_overlay(&mut self) {
        self.overlay = None;
    }

    // Nothing is on screen, so the last overlay stays available for --preview.
    fn schedule_overlay_hide(&mut self, delay: Duration) {
        tracing::debug!(delay_ms = delay.as_millis() as u64, "Overlay hide scheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use unmark_media_model::Rectangle;

    #[test]
    fn test_scripted_drag_maps_display_to_video_pixels() {
        let frame = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
        let surface = ScriptedSurface::new(frame, VideoSize::new(100, 50));
        let mut selector = RegionSelector::new(surface, OverlayStyle::default());

        selector.begin().unwrap();
        selector.pointer_down(10.0, 5.0);
        selector.pointer_move(35.0, 20.0);
        let rect = selector.pointer_up(35.0, 20.0).unwrap();

        assert_eq!(rect, Rectangle::new(20, 10, 50, 30));
        assert!(!selector.is_listening());
        let overlay = selector.surface().last_overlay().unwrap();
        assert_eq!(overlay.get_pixel(20, 10), &Rgba([255, 0, 0, 255]));
    }
}
