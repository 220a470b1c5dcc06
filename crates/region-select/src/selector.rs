//! Pointer-driven watermark region selection.

use std::time::Duration;

use image::RgbaImage;
use unmark_common::error::UnmarkResult;
use unmark_media_model::geometry::{
    CoordinateMapper, DisplayBox, PixelPoint, Rectangle, VideoSize,
};

use crate::overlay::{FrameSnapshot, OverlayStyle};

/// Proof that pointer listeners are attached to a surface.
///
/// Not `Clone`: whoever holds it is the only one able to detach the
/// listeners, which keeps detachment to exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct ListenerHandle {
    id: u64,
}

impl ListenerHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// The element a video frame is displayed in.
pub trait SelectionSurface {
    /// Current bounding box in display units. Queried on every pointer
    /// event since it changes when the window is resized.
    fn display_box(&self) -> DisplayBox;

    /// Native resolution of the displayed video.
    fn video_size(&self) -> VideoSize;

    /// Grab the frame currently on screen.
    fn capture_frame(&mut self) -> UnmarkResult<FrameSnapshot>;

    /// Start routing pointer down/move/up events to the selector.
    fn attach_pointer_listeners(&mut self) -> ListenerHandle;

    /// Stop routing pointer events.
    fn detach_pointer_listeners(&mut self, handle: ListenerHandle);

    /// Show a frame with the drag overlay drawn into it.
    fn present_overlay(&mut self, frame: &RgbaImage);

    /// Remove the overlay immediately.
    fn hide_overlay(&mut self);

    /// Remove the overlay once `delay` has elapsed.
    fn schedule_overlay_hide(&mut self, delay: Duration);
}

/// Where the selector is in a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    Idle,
    /// Listening, waiting for the pointer to go down.
    Armed,
    Dragging {
        anchor: PixelPoint,
    },
    Committed {
        rectangle: Rectangle,
    },
}

/// State machine turning a drag on a [`SelectionSurface`] into a
/// [`Rectangle`].
pub struct RegionSelector<S: SelectionSurface> {
    surface: S,
    style: OverlayStyle,
    state: SelectionState,
    snapshot: Option<FrameSnapshot>,
    listeners: Option<ListenerHandle>,
}

impl<S: SelectionSurface> RegionSelector<S> {
    pub fn new(surface: S, style: OverlayStyle) -> Self {
        Self {
            surface,
            style,
            state: SelectionState::Idle,
            snapshot: None,
            listeners: None,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// The committed rectangle of the last completed drag, if any.
    pub fn committed(&self) -> Option<Rectangle> {
        match self.state {
            SelectionState::Committed { rectangle } => Some(rectangle),
            _ => None,
        }
    }

    /// Whether pointer listeners are currently attached.
    pub fn is_listening(&self) -> bool {
        self.listeners.is_some()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Start a fresh selection, discarding any previous run.
    pub fn begin(&mut self) -> UnmarkResult<()> {
        self.release_listeners();
        self.surface.hide_overlay();
        self.snapshot = None;
        self.state = SelectionState::Idle;

        let snapshot = self.surface.capture_frame()?;
        tracing::debug!(frame = %snapshot.size(), "Region selection armed");
        self.snapshot = Some(snapshot);
        self.listeners = Some(self.surface.attach_pointer_listeners());
        self.state = SelectionState::Armed;
        Ok(())
    }

    /// Pointer pressed at client coordinates.
    pub fn pointer_down(&mut self, client_x: f64, client_y: f64) {
        if self.state != SelectionState::Armed {
            return;
        }
        if let Some(anchor) = self.map_pointer(client_x, client_y) {
            tracing::trace!(x = anchor.x, y = anchor.y, "Drag anchored");
            self.state = SelectionState::Dragging { anchor };
        }
    }

    /// Pointer moved; redraws the overlay while dragging.
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        let SelectionState::Dragging { anchor } = self.state else {
            return;
        };
        let Some(current) = self.map_pointer(client_x, client_y) else {
            return;
        };
        if let Some(snapshot) = &self.snapshot {
            let frame = snapshot.with_overlay(anchor, current, &self.style);
            self.surface.present_overlay(&frame);
        }
    }

    /// Pointer released. Returns the committed rectangle when this ends a
    /// drag.
    pub fn pointer_up(&mut self, client_x: f64, client_y: f64) -> Option<Rectangle> {
        let SelectionState::Dragging { anchor } = self.state else {
            return None;
        };
        let end = self.map_pointer(client_x, client_y)?;
        let frame = self
            .snapshot
            .as_ref()
            .map(FrameSnapshot::size)
            .unwrap_or_else(|| self.surface.video_size());

        let rectangle = Rectangle::from_corners(anchor, end, frame);
        self.state = SelectionState::Committed { rectangle };
        self.release_listeners();
        self.snapshot = None;
        self.surface.schedule_overlay_hide(self.style.hide_delay);

        tracing::info!(
            x = rectangle.x,
            y = rectangle.y,
            width = rectangle.width,
            height = rectangle.height,
            "Watermark region committed"
        );
        Some(rectangle)
    }

    /// Abandon the current run.
    pub fn cancel(&mut self) {
        self.release_listeners();
        self.surface.hide_overlay();
        self.snapshot = None;
        self.state = SelectionState::Idle;
    }

    fn map_pointer(&self, client_x: f64, client_y: f64) -> Option<PixelPoint> {
        let mapper =
            match CoordinateMapper::new(self.surface.display_box(), self.surface.video_size()) {
                Ok(mapper) => mapper,
                Err(err) => {
                    tracing::warn!(error = %err, "Ignoring pointer event");
                    return None;
                }
            };
        Some(mapper.to_pixel(client_x, client_y))
    }

    fn release_listeners(&mut self) {
        if let Some(handle) = self.listeners.take() {
            self.surface.detach_pointer_listeners(handle);
        }
    }
}

impl<S: SelectionSurface> Drop for RegionSelector<S> {
    fn drop(&mut self) {
        self.release_listeners();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use unmark_common::error::UnmarkError;

    #[derive(Debug, Default)]
    struct Log {
        attached: u32,
        detached: Vec<u64>,
        presented: u32,
        hidden: u32,
        scheduled: Vec<Duration>,
    }

    struct FakeSurface {
        display: DisplayBox,
        video: VideoSize,
        next_id: u64,
        fail_capture: bool,
        log: Rc<RefCell<Log>>,
    }

    impl FakeSurface {
        fn new(display: DisplayBox, video: VideoSize) -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            let surface = Self {
                display,
                video,
                next_id: 0,
                fail_capture: false,
                log: Rc::clone(&log),
            };
            (surface, log)
        }
    }

    impl SelectionSurface for FakeSurface {
        fn display_box(&self) -> DisplayBox {
            self.display
        }

        fn video_size(&self) -> VideoSize {
            self.video
        }

        fn capture_frame(&mut self) -> UnmarkResult<FrameSnapshot> {
            if self.fail_capture {
                return Err(UnmarkError::selection("no frame decoded yet"));
            }
            Ok(FrameSnapshot::solid(self.video, [0, 0, 0, 255]))
        }

        fn attach_pointer_listeners(&mut self) -> ListenerHandle {
            self.next_id += 1;
            self.log.borrow_mut().attached += 1;
            ListenerHandle::new(self.next_id)
        }

        fn detach_pointer_listeners(&mut self, handle: ListenerHandle) {
            self.log.borrow_mut().detached.push(handle.id());
        }

        fn present_overlay(&mut self, _frame: &RgbaImage) {
            self.log.borrow_mut().presented += 1;
        }

        fn hide_overlay(&mut self) {
            self.log.borrow_mut().hidden += 1;
        }

        fn schedule_overlay_hide(&mut self, delay: Duration) {
            self.log.borrow_mut().scheduled.push(delay);
        }
    }

    /// 640x360 display showing a 1280x720 video, offset by (20, 40).
    fn half_scale_selector() -> (RegionSelector<FakeSurface>, Rc<RefCell<Log>>) {
        let (surface, log) = FakeSurface::new(
            DisplayBox::new(20.0, 40.0, 640.0, 360.0),
            VideoSize::new(1280, 720),
        );
        (RegionSelector::new(surface, OverlayStyle::default()), log)
    }

    fn drag(
        selector: &mut RegionSelector<FakeSurface>,
        from: (f64, f64),
        to: (f64, f64),
    ) -> Option<Rectangle> {
        selector.begin().unwrap();
        selector.pointer_down(from.0, from.1);
        selector.pointer_move((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
        selector.pointer_up(to.0, to.1)
    }

    #[test]
    fn test_drag_commits_video_pixel_rectangle() {
        let (mut selector, log) = half_scale_selector();
        let rect = drag(&mut selector, (25.0, 45.0), (50.0, 60.0)).unwrap();

        assert_eq!(rect, Rectangle::new(10, 10, 50, 30));
        assert_eq!(selector.committed(), Some(rect));
        assert!(!selector.is_listening());

        let log = log.borrow();
        assert_eq!(log.attached, 1);
        assert_eq!(log.detached, vec![1]);
        assert_eq!(log.presented, 1);
        assert_eq!(log.scheduled, vec![Duration::from_millis(1000)]);
    }

    #[test]
    fn test_zero_displacement_drag_is_empty() {
        let (mut selector, _log) = half_scale_selector();
        let rect = drag(&mut selector, (100.0, 100.0), (100.0, 100.0)).unwrap();
        assert_eq!(rect.width, 0);
        assert_eq!(rect.height, 0);
    }

    #[test]
    fn test_events_outside_a_drag_are_ignored() {
        let (mut selector, log) = half_scale_selector();

        selector.pointer_down(30.0, 50.0);
        assert_eq!(selector.state(), SelectionState::Idle);
        assert_eq!(selector.pointer_up(60.0, 80.0), None);

        selector.begin().unwrap();
        selector.pointer_move(40.0, 60.0);
        assert_eq!(selector.pointer_up(60.0, 80.0), None);
        assert_eq!(selector.state(), SelectionState::Armed);
        assert_eq!(log.borrow().presented, 0);
    }

    #[test]
    fn test_listeners_detached_exactly_once() {
        let (mut selector, log) = half_scale_selector();
        drag(&mut selector, (30.0, 50.0), (80.0, 90.0)).unwrap();

        // Stray events after commit do nothing.
        selector.pointer_up(90.0, 90.0);
        selector.cancel();
        drop(selector);

        assert_eq!(log.borrow().detached, vec![1]);
    }

    #[test]
    fn test_begin_restarts_and_discards_overlay() {
        let (mut selector, log) = half_scale_selector();
        selector.begin().unwrap();
        selector.pointer_down(30.0, 50.0);
        selector.pointer_move(60.0, 70.0);

        selector.begin().unwrap();
        assert_eq!(selector.state(), SelectionState::Armed);

        let log = log.borrow();
        assert_eq!(log.attached, 2);
        assert_eq!(log.detached, vec![1]);
        assert_eq!(log.hidden, 2);
    }

    #[test]
    fn test_begin_after_commit_starts_from_scratch() {
        let (mut selector, _log) = half_scale_selector();
        drag(&mut selector, (30.0, 50.0), (80.0, 90.0)).unwrap();
        selector.begin().unwrap();
        assert_eq!(selector.committed(), None);
        assert!(selector.is_listening());
    }

    #[test]
    fn test_drop_while_armed_releases_listeners() {
        let (mut selector, log) = half_scale_selector();
        selector.begin().unwrap();
        drop(selector);
        assert_eq!(log.borrow().detached, vec![1]);
    }

    #[test]
    fn test_failed_capture_leaves_selector_idle() {
        let (mut surface, log) =
            FakeSurface::new(DisplayBox::sized(100.0, 100.0), VideoSize::new(100, 100));
        surface.fail_capture = true;
        let mut selector = RegionSelector::new(surface, OverlayStyle::default());

        assert!(selector.begin().is_err());
        assert_eq!(selector.state(), SelectionState::Idle);
        assert_eq!(log.borrow().attached, 0);
    }

    #[test]
    fn test_mapping_tracks_display_resize_mid_drag() {
        let (mut selector, _log) = half_scale_selector();
        selector.begin().unwrap();
        selector.pointer_down(20.0, 40.0);

        // Window grew to full video size between events.
        selector.surface_mut().display = DisplayBox::new(20.0, 40.0, 1280.0, 720.0);
        let rect = selector.pointer_up(120.0, 90.0).unwrap();
        assert_eq!(rect, Rectangle::new(0, 0, 100, 50));
    }

    #[test]
    fn test_collapsed_display_ignores_pointer() {
        let (mut selector, _log) = half_scale_selector();
        selector.begin().unwrap();
        selector.surface_mut().display = DisplayBox::sized(0.0, 0.0);
        selector.pointer_down(10.0, 10.0);
        assert_eq!(selector.state(), SelectionState::Armed);
    }

    proptest! {
        #[test]
        fn prop_drag_direction_does_not_matter(
            ax in 0.0f64..700.0,
            ay in 0.0f64..450.0,
            bx in 0.0f64..700.0,
            by in 0.0f64..450.0,
        ) {
            let (mut forward, _) = half_scale_selector();
            let (mut backward, _) = half_scale_selector();
            let a = drag(&mut forward, (ax, ay), (bx, by));
            let b = drag(&mut backward, (bx, by), (ax, ay));
            prop_assert!(a.is_some());
            prop_assert_eq!(a, b);
        }
    }
}
