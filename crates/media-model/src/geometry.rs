//! Video-pixel geometry and display-to-video coordinate mapping.
//!
//! Pointer input arrives in display units relative to wherever the video
//! frame is currently drawn. Everything downstream works in the video's
//! native pixel grid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A point in video-pixel space. Fractional until it is committed into a
/// [`Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Native resolution of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for VideoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Bounding box of the element the frame is drawn into, in display units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A box anchored at the origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn is_usable(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// A watermark region in video pixels.
///
/// `width == 0 || height == 0` means "no region selected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    /// The "no region" sentinel.
    pub const EMPTY: Rectangle = Rectangle {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalize two drag corners into a rectangle.
    ///
    /// Corners are clamped to the frame and rounded to whole pixels before
    /// the min/abs normalization, so swapping `a` and `b` yields the same
    /// rectangle.
    pub fn from_corners(a: PixelPoint, b: PixelPoint, frame: VideoSize) -> Self {
        let (ax, ay) = snap_to_frame(a, frame);
        let (bx, by) = snap_to_frame(b, frame);
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: ax.abs_diff(bx),
            height: ay.abs_diff(by),
        }
    }

    /// Whether this rectangle covers at least one pixel.
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the rectangle lies entirely inside a frame of `frame` size.
    pub fn fits_within(&self, frame: VideoSize) -> bool {
        self.right() <= frame.width && self.bottom() <= frame.height
    }

    /// Shrink the rectangle so it lies inside the frame.
    pub fn clamp_to(&self, frame: VideoSize) -> Self {
        let x = self.x.min(frame.width);
        let y = self.y.min(frame.height);
        Self {
            x,
            y,
            width: self.width.min(frame.width - x),
            height: self.height.min(frame.height - y),
        }
    }
}

fn snap_to_frame(point: PixelPoint, frame: VideoSize) -> (u32, u32) {
    let snap = |value: f64, max: u32| -> u32 {
        if value.is_nan() {
            return 0;
        }
        value.clamp(0.0, max as f64).round() as u32
    };
    (snap(point.x, frame.width), snap(point.y, frame.height))
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

impl FromStr for Rectangle {
    type Err = GeometryError;

    /// Parse `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| GeometryError::InvalidRectangle(s.to_string()))?;

        match parts.as_slice() {
            [x, y, width, height] => Ok(Self::new(*x, *y, *width, *height)),
            _ => Err(GeometryError::InvalidRectangle(s.to_string())),
        }
    }
}

/// Maps pointer client coordinates into video pixels for one display box.
///
/// Build a fresh mapper for every pointer event: the display box moves when
/// the window is resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    display: DisplayBox,
    video: VideoSize,
}

impl CoordinateMapper {
    pub fn new(display: DisplayBox, video: VideoSize) -> Result<Self, GeometryError> {
        if !display.is_usable() {
            return Err(GeometryError::UnusableDisplay(display));
        }
        if video.is_empty() {
            return Err(GeometryError::EmptyVideo(video));
        }
        Ok(Self { display, video })
    }

    /// Horizontal video pixels per display unit.
    pub fn scale_x(&self) -> f64 {
        self.video.width as f64 / self.display.width
    }

    /// Vertical video pixels per display unit.
    pub fn scale_y(&self) -> f64 {
        self.video.height as f64 / self.display.height
    }

    /// Convert client coordinates to video pixels.
    ///
    /// Multiplies before dividing so the display box corners land exactly on
    /// `(0, 0)` and `(video.width, video.height)`.
    pub fn to_pixel(&self, client_x: f64, client_y: f64) -> PixelPoint {
        PixelPoint {
            x: (client_x - self.display.left) * self.video.width as f64 / self.display.width,
            y: (client_y - self.display.top) * self.video.height as f64 / self.display.height,
        }
    }

    pub fn display(&self) -> DisplayBox {
        self.display
    }

    pub fn video(&self) -> VideoSize {
        self.video
    }
}

/// Errors produced while mapping or parsing geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Display box has no usable area: {0:?}")]
    UnusableDisplay(DisplayBox),

    #[error("Video resolution is empty: {0}")]
    EmptyVideo(VideoSize),

    #[error("Expected a rectangle as x,y,width,height but got {0:?}")]
    InvalidRectangle(String),
}
