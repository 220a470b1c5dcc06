use std::time::{Duration, Instant};

use eframe::egui;
use image::RgbaImage;
use unmark_common::error::{UnmarkError, UnmarkResult};
use unmark_media_model::{DisplayBox, VideoSize};
use unmark_media_model::Rectangle;
use unmark_region_select::{FrameSnapshot, ListenerHandle, RegionSelector, SelectionSurface};

/// What the frame view should currently show.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayUpdate {
    Show(RgbaImage),
    Hide,
}

/// The frame view inside the egui window.
///
/// The display box follows wherever egui laid the image out on the last
/// frame; pointer events are only forwarded while listeners are attached.
#[derive(Default)]
pub struct EguiSurface {
    frame: Option<RgbaImage>,
    display: Option<DisplayBox>,
    next_listener: u64,
    active_listener: Option<u64>,
    pending: Option<OverlayUpdate>,
    hide_at: Option<Instant>,
}

impl EguiSurface {
    pub fn set_frame(&mut self, frame: RgbaImage) {
        self.frame = Some(frame);
        self.hide_at = None;
        self.pending = Some(OverlayUpdate::Hide);
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    /// Record where the frame was drawn this pass.
    pub fn set_display_rect(&mut self, rect: egui::Rect) {
        self.display = Some(DisplayBox::new(
            rect.left() as f64,
            rect.top() as f64,
            rect.width() as f64,
            rect.height() as f64,
        ));
    }

    pub fn accepts_pointer(&self) -> bool {
        self.active_listener.is_some()
    }

    /// Apply a scheduled hide once its deadline passes.
    pub fn tick(&mut self, now: Instant) {
        if self.hide_at.is_some_and(|deadline| now >= deadline) {
            self.hide_at = None;
            self.pending = Some(OverlayUpdate::Hide);
        }
    }

    /// Overlay change the view has not applied yet.
    pub fn take_update(&mut self) -> Option<OverlayUpdate> {
        self.pending.take()
    }
}

impl SelectionSurface for EguiSurface {
    fn display_box(&self) -> DisplayBox {
        self.display.unwrap_or_default()
    }

    fn video_size(&self) -> VideoSize {
        self.frame
            .as_ref()
            .map(|f| VideoSize::new(f.width(), f.height()))
            .unwrap_or(VideoSize::new(0, 0))
    }

    fn capture_frame(&mut self) -> UnmarkResult<FrameSnapshot> {
        self.frame
            .clone()
            .map(FrameSnapshot::new)
            .ok_or_else(|| UnmarkError::selection("Load a video before selecting a region"))
    }

    fn attach_pointer_listeners(&mut self) -> ListenerHandle {
        self.next_listener += 1;
        self.active_listener = Some(self.next_listener);
        ListenerHandle::new(self.next_listener)
    }

    fn detach_pointer_listeners(&mut self, handle: ListenerHandle) {
        if self.active_listener == Some(handle.id()) {
            self.active_listener = None;
        } else {
            tracing::warn!(id = handle.id(), "Detaching unknown pointer listener");
        }
    }

    fn present_overlay(&mut self, frame: &RgbaImage) {
        self.hide_at = None;
        self.pending = Some(OverlayUpdate::Show(frame.clone()));
    }

    fn hide_overlay(&mut self) {
        self.hide_at = None;
        self.pending = Some(OverlayUpdate::Hide);
    }

    fn schedule_overlay_hide(&mut self, delay: Duration) {
        self.hide_at = Some(Instant::now() + delay);
    }
}

/// Primary-button state sampled from one egui pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerInput {
    pub pressed: bool,
    pub down: bool,
    pub released: bool,
    pub inside: bool,
}

/// Forward one pass of pointer input to the selector.
///
/// A click can deliver press and release in the same pass, so the release
/// is handled after the press rather than instead of it.
pub fn forward_pointer<S: SelectionSurface>(
    selector: &mut RegionSelector<S>,
    input: PointerInput,
    x: f64,
    y: f64,
) -> Option<Rectangle> {
    if input.pressed && input.inside {
        selector.pointer_down(x, y);
    }
    if input.released {
        return selector.pointer_up(x, y);
    }
    if input.down && !input.pressed {
        selector.pointer_move(x, y);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use unmark_region_select::{OverlayStyle, SelectionState};

    fn surface_with_frame() -> EguiSurface {
        let mut surface = EguiSurface::default();
        surface.set_frame(RgbaImage::from_pixel(640, 360, Rgba([0, 0, 0, 255])));
        surface.set_display_rect(egui::Rect::from_min_size(
            egui::pos2(20.0, 40.0),
            egui::vec2(320.0, 180.0),
        ));
        surface.take_update();
        surface
    }

    #[test]
    fn test_capture_requires_a_frame() {
        let mut surface = EguiSurface::default();
        assert!(surface.capture_frame().is_err());
        assert_eq!(surface.display_box(), DisplayBox::default());
    }

    #[test]
    fn test_drag_in_window_coordinates() {
        let mut selector = RegionSelector::new(surface_with_frame(), OverlayStyle::default());
        selector.begin().unwrap();
        assert!(selector.surface().accepts_pointer());

        selector.pointer_down(30.0, 50.0);
        selector.pointer_move(70.0, 70.0);
        assert!(matches!(
            selector.surface_mut().take_update(),
            Some(OverlayUpdate::Show(_))
        ));

        let rect = selector.pointer_up(70.0, 70.0).unwrap();
        assert_eq!(rect, Rectangle::new(20, 20, 80, 40));
        assert!(!selector.surface().accepts_pointer());
    }

    #[test]
    fn test_scheduled_hide_fires_after_deadline() {
        let mut surface = surface_with_frame();
        surface.present_overlay(&RgbaImage::new(1, 1));
        surface.take_update();
        surface.schedule_overlay_hide(Duration::from_millis(1000));

        let now = Instant::now();
        surface.tick(now);
        assert_eq!(surface.take_update(), None);

        surface.tick(now + Duration::from_millis(1500));
        assert_eq!(surface.take_update(), Some(OverlayUpdate::Hide));
    }

    #[test]
    fn test_stale_listener_is_ignored() {
        let mut surface = surface_with_frame();
        let first = surface.attach_pointer_listeners();
        let second = surface.attach_pointer_listeners();
        surface.detach_pointer_listeners(first);
        assert!(surface.accepts_pointer());
        surface.detach_pointer_listeners(second);
        assert!(!surface.accepts_pointer());
    }

    #[test]
    fn test_click_in_one_pass_commits_empty_rectangle() {
        let mut selector = RegionSelector::new(surface_with_frame(), OverlayStyle::default());
        selector.begin().unwrap();

        let click = PointerInput {
            pressed: true,
            down: false,
            released: true,
            inside: true,
        };
        let rect = forward_pointer(&mut selector, click, 30.0, 50.0).unwrap();

        assert!(!rect.has_area());
        assert_eq!(
            selector.state(),
            SelectionState::Committed { rectangle: rect }
        );
        assert!(!selector.surface().accepts_pointer());
    }

    #[test]
    fn test_forward_pointer_drag_across_passes() {
        let mut selector = RegionSelector::new(surface_with_frame(), OverlayStyle::default());
        selector.begin().unwrap();

        let press = PointerInput {
            pressed: true,
            down: true,
            inside: true,
            ..PointerInput::default()
        };
        assert_eq!(forward_pointer(&mut selector, press, 30.0, 50.0), None);

        let hold = PointerInput {
            down: true,
            inside: true,
            ..PointerInput::default()
        };
        assert_eq!(forward_pointer(&mut selector, hold, 50.0, 60.0), None);

        let release = PointerInput {
            released: true,
            ..PointerInput::default()
        };
        let rect = forward_pointer(&mut selector, release, 70.0, 70.0);
        assert_eq!(rect, Some(Rectangle::new(20, 20, 80, 40)));
    }
}
