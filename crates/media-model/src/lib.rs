//! Unmark Media Model
//!
//! Defines the core data contracts shared by the selector, the plan
//! builder and the engine session:
//! - **Geometry:** display boxes, video resolutions, pixel points, and the
//!   watermark `Rectangle`, plus the `CoordinateMapper` between them
//! - **Media:** byte-buffer assets tagged with a role and content type
//!
//! All region coordinates are expressed in native video pixels, never in
//! display units, so a selection survives window resizes.

pub mod geometry;
pub mod media;

pub use geometry::*;
pub use media::*;
