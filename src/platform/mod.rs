//! Platform abstraction layer
//!
//! The game core only talks to these collaborators:
//! - [`ScreenHost`](crate::flow::ScreenHost): named screen containers
//! - [`TextSink`]: HUD counters, prompts, dialog text
//! - [`RenderTarget`]: the 2D drawing surface of a mini-game
//! - [`Platform::acquire`]: per-session canvas plus input listeners
//!
//! `web` implements them against the DOM; `headless` records everything
//! for tests and the native demo.

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::collections::BTreeSet;

use glam::Vec2;
use thiserror::Error;

use crate::flow::ScreenHost;
use crate::session::InputHandle;

pub use headless::{DrawOp, Headless, Recorder};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("element #{0} not found")]
    MissingElement(String),

    #[error("canvas #{0} not found")]
    MissingCanvas(String),

    #[error("canvas #{0} has no 2d context")]
    MissingContext(String),

    #[error("no window or document")]
    NoWindow,
}

/// Linear RGBA, components in 0..=1
pub type Color = [f32; 4];

/// Opaque color from `0xRRGGBB`
pub const fn rgb(hex: u32) -> Color {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        1.0,
    ]
}

pub fn with_alpha(color: Color, alpha: f32) -> Color {
    [color[0], color[1], color[2], color[3] * alpha.clamp(0.0, 1.0)]
}

/// CSS `rgba()` string for canvas fill styles
pub fn css_color(color: Color) -> String {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("rgba({},{},{},{:.3})", c(color[0]), c(color[1]), c(color[2]), color[3])
}

/// Fixed-size drawing surface, top-left origin, Y down
pub trait RenderTarget {
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    /// Single line of text, centered on `pos`
    fn fill_text(&mut self, text: &str, pos: Vec2, size: f32, color: Color);
}

/// Page elements addressed by CSS selector
pub trait TextSink {
    fn set_text(&mut self, selector: &str, text: &str);
    /// Add (`on`) or remove a class
    fn set_class(&mut self, selector: &str, class: &str, on: bool);
    fn set_visible(&mut self, selector: &str, visible: bool);
    /// Remove all generated children
    fn clear_items(&mut self, selector: &str);
    /// Append a generated child carrying `data-index` = its position
    fn append_item(&mut self, selector: &str, item: &Item);
}

pub const SCREEN_ACTIVE: &str = "screen-active";
pub const SCREEN_EXIT: &str = "screen-exit";

/// Class changes a screen element goes through on each [`ScreenHost`] call.
/// At most one element carries [`SCREEN_ACTIVE`] at a time.
///
/// [`ScreenHost`]: crate::flow::ScreenHost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenClasses {
    pub remove: &'static [&'static str],
    pub add: &'static [&'static str],
}

impl ScreenClasses {
    pub const ACTIVATE: Self = Self {
        remove: &[SCREEN_EXIT],
        add: &[SCREEN_ACTIVE],
    };
    pub const EXIT: Self = Self {
        remove: &[SCREEN_ACTIVE],
        add: &[SCREEN_EXIT],
    };
    pub const HIDE: Self = Self {
        remove: &[SCREEN_EXIT, SCREEN_ACTIVE],
        add: &[],
    };

    pub fn apply(self, classes: &mut BTreeSet<String>) {
        for class in self.remove {
            classes.remove(*class);
        }
        for class in self.add {
            classes.insert((*class).to_string());
        }
    }
}

/// A generated child element: list entry, button, confetti piece
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub class: String,
    pub text: String,
    /// Inline CSS
    pub style: String,
}

impl Item {
    pub fn new(class: &str, text: &str) -> Self {
        Self {
            class: class.to_string(),
            text: text.to_string(),
            style: String::new(),
        }
    }

    pub fn styled(class: &str, style: String) -> Self {
        Self {
            class: class.to_string(),
            text: String::new(),
            style,
        }
    }
}

/// Everything the app needs from its host
pub trait Platform: ScreenHost + TextSink {
    /// Drawing surface of one session. Dropping it releases the input
    /// listeners registered for that session.
    type Surface: RenderTarget;

    /// Whether `canvas_id` exists on the page
    fn has_canvas(&self, canvas_id: &str) -> bool;

    /// Claim canvas `canvas_id` and route its input into `input`
    fn acquire(&mut self, canvas_id: &str, input: &InputHandle) -> Result<Self::Surface, PlatformError>;
}
