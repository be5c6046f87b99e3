//! Canvas rendering module
//!
//! Immediate-mode: every frame clears the mini-game's render target and
//! redraws the controller state with rectangles, circles and sprite blits.

pub mod scene;
pub mod sprites;

pub use scene::{canvas_id, draw, draw_fps};
