//! Input abstraction
//!
//! Keyboard keys, on-screen d-pad buttons and a single touch drag are merged
//! into one per-frame signal: a movement direction plus edge-triggered
//! presses for one-shot actions such as jumping.

use glam::Vec2;
use std::f32::consts::FRAC_1_SQRT_2;

use crate::consts::TOUCH_DEADZONE;

/// Logical actions the mini-games understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Jump,
}

impl Action {
    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Map a `KeyboardEvent.key` value to an action
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "w" | "W" => Some(Action::Up),
            "ArrowDown" | "s" | "S" => Some(Action::Down),
            "ArrowLeft" | "a" | "A" => Some(Action::Left),
            "ArrowRight" | "d" | "D" => Some(Action::Right),
            " " | "Spacebar" => Some(Action::Jump),
            _ => None,
        }
    }

    /// Map an on-screen button suffix (`dpad-up`, `jump-btn`, ...) to an action
    pub fn from_button(name: &str) -> Option<Self> {
        match name {
            "up" => Some(Action::Up),
            "down" => Some(Action::Down),
            "left" => Some(Action::Left),
            "right" => Some(Action::Right),
            "jump" => Some(Action::Jump),
            _ => None,
        }
    }
}

/// A single active touch point used as a virtual joystick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchDrag {
    pub active: bool,
    pub start: Vec2,
    pub delta: Vec2,
}

impl TouchDrag {
    pub fn begin(&mut self, pos: Vec2) {
        self.active = true;
        self.start = pos;
        self.delta = Vec2::ZERO;
    }

    pub fn moved(&mut self, pos: Vec2) {
        if self.active {
            self.delta = pos - self.start;
        }
    }

    pub fn end(&mut self) {
        *self = Self::default();
    }

    /// Unit step along the dominant drag axis, or zero inside the deadzone.
    ///
    /// At most one axis is ever non-zero.
    pub fn direction(&self) -> Vec2 {
        if !self.active {
            return Vec2::ZERO;
        }
        let (ax, ay) = (self.delta.x.abs(), self.delta.y.abs());
        if ax <= TOUCH_DEADZONE && ay <= TOUCH_DEADZONE {
            return Vec2::ZERO;
        }
        if ax > ay {
            Vec2::new(self.delta.x.signum(), 0.0)
        } else {
            Vec2::new(0.0, self.delta.y.signum())
        }
    }
}

/// Merged input state for the active mini-game
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys: [bool; 5],
    buttons: [bool; 5],
    /// Presses seen since the last `end_frame`
    pressed: [bool; 5],
    tapped: bool,
    pub touch: TouchDrag,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything (session start)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn key_down(&mut self, key: &str) -> bool {
        let Some(action) = Action::from_key(key) else {
            return false;
        };
        if !self.keys[action.index()] {
            self.pressed[action.index()] = true;
        }
        self.keys[action.index()] = true;
        true
    }

    pub fn key_up(&mut self, key: &str) {
        if let Some(action) = Action::from_key(key) {
            self.keys[action.index()] = false;
        }
    }

    /// Synthetic press from an on-screen button (touch start / mouse down)
    pub fn button_down(&mut self, action: Action) {
        if !self.buttons[action.index()] {
            self.pressed[action.index()] = true;
        }
        self.buttons[action.index()] = true;
    }

    /// Synthetic release (touch end / mouse up / mouse leave)
    pub fn button_up(&mut self, action: Action) {
        self.buttons[action.index()] = false;
    }

    pub fn touch_start(&mut self, pos: Vec2) {
        self.touch.begin(pos);
        self.tapped = true;
    }

    pub fn touch_move(&mut self, pos: Vec2) {
        self.touch.moved(pos);
    }

    pub fn touch_end(&mut self) {
        self.touch.end();
    }

    pub fn held(&self, action: Action) -> bool {
        self.keys[action.index()] || self.buttons[action.index()]
    }

    /// Whether `action` went down since the last `end_frame`
    pub fn just_pressed(&self, action: Action) -> bool {
        self.pressed[action.index()]
    }

    /// Whether a touch began since the last `end_frame`
    pub fn tapped(&self) -> bool {
        self.tapped
    }

    /// Clear edge-triggered presses once a tick has consumed them
    pub fn end_frame(&mut self) {
        self.pressed = [false; 5];
        self.tapped = false;
    }

    /// Movement direction for this frame.
    ///
    /// Keys and buttons give -1/0/1 per axis; an active touch drag overrides
    /// the axis it points along. Diagonals are scaled by 1/sqrt(2) so their
    /// speed equals axis speed.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.held(Action::Up) {
            dir.y = -1.0;
        }
        if self.held(Action::Down) {
            dir.y = 1.0;
        }
        if self.held(Action::Left) {
            dir.x = -1.0;
        }
        if self.held(Action::Right) {
            dir.x = 1.0;
        }

        let drag = self.touch.direction();
        if drag.x != 0.0 {
            dir.x = drag.x;
        }
        if drag.y != 0.0 {
            dir.y = drag.y;
        }

        if dir.x != 0.0 && dir.y != 0.0 {
            dir *= FRAC_1_SQRT_2;
        }
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_is_normalized() {
        let mut input = InputState::new();
        input.key_down("ArrowUp");
        input.key_down("d");
        let dir = input.direction();
        assert!((dir.length() - 1.0).abs() < 1e-4);
        assert!(dir.x > 0.0 && dir.y < 0.0);
    }

    #[test]
    fn test_button_release_keeps_key() {
        let mut input = InputState::new();
        input.key_down("ArrowLeft");
        input.button_down(Action::Left);
        input.button_up(Action::Left);
        assert!(input.held(Action::Left));
        input.key_up("ArrowLeft");
        assert!(!input.held(Action::Left));
    }

    #[test]
    fn test_touch_deadzone_and_dominant_axis() {
        let mut input = InputState::new();
        input.touch_start(Vec2::new(100.0, 100.0));
        input.touch_move(Vec2::new(106.0, 95.0));
        assert_eq!(input.direction(), Vec2::ZERO);

        input.touch_move(Vec2::new(130.0, 80.0));
        assert_eq!(input.direction(), Vec2::new(1.0, 0.0));

        input.touch_move(Vec2::new(90.0, 160.0));
        assert_eq!(input.direction(), Vec2::new(0.0, 1.0));

        input.touch_end();
        assert_eq!(input.direction(), Vec2::ZERO);
    }

    #[test]
    fn test_press_edges_clear_each_frame() {
        let mut input = InputState::new();
        input.key_down(" ");
        assert!(input.just_pressed(Action::Jump));
        input.end_frame();
        assert!(!input.just_pressed(Action::Jump));
        // Auto-repeat keydown while held is not a new press
        input.key_down(" ");
        assert!(!input.just_pressed(Action::Jump));
    }

    #[test]
    fn test_unknown_key_ignored() {
        let mut input = InputState::new();
        assert!(!input.key_down("q"));
        assert_eq!(input.direction(), Vec2::ZERO);
    }
}
