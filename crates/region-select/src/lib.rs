//! Unmark Region Selection
//!
//! Turns a pointer drag over a displayed video frame into a watermark
//! [`Rectangle`](unmark_media_model::Rectangle) in native video pixels.
//!
//! ```text
//!  begin()        pointer_down      pointer_up
//! Idle ───▶ Armed ──────────▶ Dragging ──────────▶ Committed
//!   ▲                          │  ▲                    │
//!   │                          └──┘ pointer_move       │
//!   └──────────────── begin() restarts ◀───────────────┘
//! ```
//!
//! The selector owns the pointer-listener handle for the surface it is
//! attached to and releases it exactly once per run.

pub mod overlay;
pub mod selector;

pub use overlay::*;
pub use selector::*;
