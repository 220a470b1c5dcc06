//! Frame snapshots and the drag overlay drawn on top of them.

use std::time::Duration;

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use unmark_common::config::SelectionConfig;
use unmark_media_model::geometry::{PixelPoint, VideoSize};

/// A still of the current video frame at native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    image: RgbaImage,
}

impl FrameSnapshot {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Wrap raw RGBA8 pixels. Returns `None` if the buffer length does not
    /// match the dimensions.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, pixels).map(Self::new)
    }

    /// A uniformly filled frame.
    pub fn solid(size: VideoSize, color: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(size.width, size.height, Rgba(color)))
    }

    pub fn size(&self) -> VideoSize {
        VideoSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Copy of the frame with a hollow rectangle spanning `anchor` to
    /// `current`.
    pub fn with_overlay(
        &self,
        anchor: PixelPoint,
        current: PixelPoint,
        style: &OverlayStyle,
    ) -> RgbaImage {
        let mut canvas = self.image.clone();
        draw_selection_box(&mut canvas, anchor, current, style);
        canvas
    }
}

/// How the drag overlay looks and how long it lingers.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub color: Rgba<u8>,
    pub stroke_px: u32,
    pub hide_delay: Duration,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self::from(&SelectionConfig::default())
    }
}

impl From<&SelectionConfig> for OverlayStyle {
    fn from(config: &SelectionConfig) -> Self {
        let [r, g, b] = config.overlay_color;
        Self {
            color: Rgba([r, g, b, 255]),
            stroke_px: config.overlay_stroke_px.max(1),
            hide_delay: Duration::from_millis(config.overlay_hide_delay_ms),
        }
    }
}

/// Draw a hollow box between two pixel points, clipped to the canvas.
///
/// The stroke grows inward from the spanned rectangle. Nothing is drawn for
/// a box without area.
pub fn draw_selection_box(
    canvas: &mut RgbaImage,
    a: PixelPoint,
    b: PixelPoint,
    style: &OverlayStyle,
) {
    let max_x = canvas.width() as f64;
    let max_y = canvas.height() as f64;
    let x0 = a.x.min(b.x).clamp(0.0, max_x).round() as i32;
    let y0 = a.y.min(b.y).clamp(0.0, max_y).round() as i32;
    let x1 = a.x.max(b.x).clamp(0.0, max_x).round() as i32;
    let y1 = a.y.max(b.y).clamp(0.0, max_y).round() as i32;

    for inset in 0..style.stroke_px as i32 {
        let width = x1 - x0 - 2 * inset;
        let height = y1 - y0 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x0 + inset, y0 + inset).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, style.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 4] = [0, 0, 0, 255];

    fn style() -> OverlayStyle {
        OverlayStyle {
            color: Rgba([255, 0, 0, 255]),
            stroke_px: 2,
            hide_delay: Duration::from_millis(1000),
        }
    }

    #[test]
    fn test_default_style_matches_selection_config() {
        let style = OverlayStyle::default();
        assert_eq!(style.color, Rgba([255, 0, 0, 255]));
        assert_eq!(style.stroke_px, 3);
        assert_eq!(style.hide_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_overlay_draws_border_not_interior() {
        let frame = FrameSnapshot::solid(VideoSize::new(64, 48), BLACK);
        let canvas = frame.with_overlay(
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(40.0, 30.0),
            &style(),
        );

        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(11, 20), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(25, 20), &Rgba(BLACK));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba(BLACK));
        // Snapshot itself is untouched.
        assert_eq!(frame.image().get_pixel(10, 10), &Rgba(BLACK));
    }

    #[test]
    fn test_overlay_handles_reverse_and_out_of_frame_drag() {
        let frame = FrameSnapshot::solid(VideoSize::new(32, 32), BLACK);
        let canvas = frame.with_overlay(
            PixelPoint::new(50.0, 50.0),
            PixelPoint::new(16.0, 16.0),
            &style(),
        );
        assert_eq!(canvas.get_pixel(16, 16), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(31, 31), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_degenerate_overlay_draws_nothing() {
        let frame = FrameSnapshot::solid(VideoSize::new(16, 16), BLACK);
        let p = PixelPoint::new(8.0, 8.0);
        let canvas = frame.with_overlay(p, p, &style());
        assert_eq!(&canvas, frame.image());
    }

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(FrameSnapshot::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(FrameSnapshot::from_rgba(2, 2, vec![0; 15]).is_none());
    }
}
