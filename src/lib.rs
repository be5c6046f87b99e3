//! Birthday Adventure - a scripted browser birthday game
//!
//! Core modules:
//! - `sim`: Mini-game simulation (frame clock, input, collision, controllers)
//! - `flow`: Screen sequencer
//! - `session`: Single-owner scheduler for the active mini-game
//! - `dialog`, `quiz`, `celebration`: Scripted, timer-driven screens
//! - `renderer`: Immediate-mode drawing against a render target
//! - `platform`: Browser/native collaborator abstraction
//! - `tuning`: Data-driven game balance and text

pub mod app;
pub mod audio;
pub mod celebration;
pub mod dialog;
pub mod flow;
pub mod platform;
pub mod quiz;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use app::App;
pub use flow::{FlowMachine, Screen};
pub use settings::Settings;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Logical canvas size shared by every mini-game
    pub const CANVAS_W: f32 = 320.0;
    pub const CANVAS_H: f32 = 400.0;

    /// Baseline frame duration the frame step is normalized to (60 Hz)
    pub const BASELINE_FRAME_MS: f64 = 1000.0 / 60.0;
    /// Frame step bounds
    pub const MIN_FRAME_STEP: f32 = 0.01;
    pub const MAX_FRAME_STEP: f32 = 4.0;

    /// Baseline frames per simulated second
    pub const FRAMES_PER_SECOND: f32 = 60.0;

    /// Touch drag must exceed this many pixels before it counts as a direction
    pub const TOUCH_DEADZONE: f32 = 10.0;

    /// Walking speed shared by the top-down games (px per baseline frame)
    pub const WALK_SPEED: f32 = 2.5;
}

/// Linear interpolation step used by trailing companions
#[inline]
pub fn lerp_toward(current: Vec2, target: Vec2, factor: f32) -> Vec2 {
    current + (target - current) * factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_toward_moves_fraction_of_gap() {
        let next = lerp_toward(Vec2::ZERO, Vec2::new(100.0, -50.0), 0.1);
        assert!((next.x - 10.0).abs() < 1e-4);
        assert!((next.y + 5.0).abs() < 1e-4);
    }
}
