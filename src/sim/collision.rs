//! Collision detection and simple physics
//!
//! Everything in the mini-games is an axis-aligned rectangle in pixel space
//! (top-left origin, Y down). Movement is resolved with wall-sliding and jumps
//! integrate a constant gravity against a flat ground line.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn at(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grow the rectangle by `pad` on every side
    pub fn inflate(&self, pad: f32) -> Self {
        Self::new(self.x - pad, self.y - pad, self.w + pad * 2.0, self.h + pad * 2.0)
    }

    /// Separating-axis overlap test. Touching edges do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Hitbox of an entity relative to its position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub offset: Vec2,
    pub size: Vec2,
}

impl Hitbox {
    pub const fn new(ox: f32, oy: f32, w: f32, h: f32) -> Self {
        Self {
            offset: Vec2::new(ox, oy),
            size: Vec2::new(w, h),
        }
    }

    pub fn at(&self, pos: Vec2) -> Rect {
        Rect::at(pos + self.offset, self.size)
    }
}

/// Result of a wall-sliding move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideResult {
    pub pos: Vec2,
    /// Full displacement was blocked and the X component could not be applied
    pub blocked_x: bool,
    /// Full displacement was blocked and the Y component could not be applied
    pub blocked_y: bool,
}

/// Move `pos` by `delta` with wall-sliding.
///
/// Positions are clamped to `[min, max]` first. The full displacement is
/// tried; if the hitbox would hit something, X and Y are retried on their
/// own so the entity slides along the wall instead of stopping dead.
pub fn slide_move(
    pos: Vec2,
    delta: Vec2,
    min: Vec2,
    max: Vec2,
    hitbox: Hitbox,
    is_blocked: impl Fn(&Rect) -> bool,
) -> SlideResult {
    let target = (pos + delta).clamp(min, max);
    if !is_blocked(&hitbox.at(target)) {
        return SlideResult {
            pos: target,
            blocked_x: false,
            blocked_y: false,
        };
    }

    let mut result = SlideResult {
        pos,
        blocked_x: true,
        blocked_y: true,
    };

    let try_x = Vec2::new(target.x, result.pos.y);
    if !is_blocked(&hitbox.at(try_x)) {
        result.pos = try_x;
        result.blocked_x = false;
    }

    let try_y = Vec2::new(result.pos.x, target.y);
    if !is_blocked(&hitbox.at(try_y)) {
        result.pos = try_y;
        result.blocked_y = false;
    }

    result
}

/// Which jump a press produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Ground,
    Double,
}

/// Vertical jump state for a side-on character standing on a ground line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jumper {
    /// Top of the sprite
    pub y: f32,
    pub vy: f32,
    /// Sprite height: the character rests at `ground_line - height`
    pub height: f32,
    pub airborne: bool,
    /// Second impulse already spent this airborne period
    pub used_double_jump: bool,
}

impl Jumper {
    pub fn on_ground(ground_line: f32, height: f32) -> Self {
        Self {
            y: ground_line - height,
            height,
            ..Self::default()
        }
    }

    #[inline]
    pub fn rest_y(&self, ground_line: f32) -> f32 {
        ground_line - self.height
    }

    /// Jump from the ground only
    pub fn jump(&mut self, vy: f32) -> bool {
        if self.airborne {
            return false;
        }
        self.airborne = true;
        self.used_double_jump = false;
        self.vy = vy;
        true
    }

    /// Ground jump, or one weaker mid-air jump per airborne period
    pub fn jump_or_double(&mut self, vy: f32, double_vy: f32) -> Option<JumpKind> {
        if self.jump(vy) {
            return Some(JumpKind::Ground);
        }
        if !self.used_double_jump {
            self.used_double_jump = true;
            self.vy = double_vy;
            return Some(JumpKind::Double);
        }
        None
    }

    /// Integrate gravity for one step. Returns true on the tick it lands.
    pub fn integrate(&mut self, gravity: f32, ground_line: f32, step: f32) -> bool {
        let rest = self.rest_y(ground_line);
        if !self.airborne && self.y >= rest {
            return false;
        }
        self.vy += gravity * step;
        self.y += self.vy * step;
        if self.y >= rest {
            self.y = rest;
            self.vy = 0.0;
            self.airborne = false;
            self.used_double_jump = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PLAYER: Hitbox = Hitbox::new(0.0, 0.0, 10.0, 10.0);

    fn open_area() -> (Vec2, Vec2) {
        (Vec2::ZERO, Vec2::splat(1000.0))
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&b.inflate(0.5)));
    }

    #[test]
    fn test_free_move_is_applied_in_full() {
        let (min, max) = open_area();
        let res = slide_move(Vec2::new(50.0, 50.0), Vec2::new(3.0, -2.0), min, max, PLAYER, |_| false);
        assert_eq!(res.pos, Vec2::new(53.0, 48.0));
        assert!(!res.blocked_x && !res.blocked_y);
    }

    #[test]
    fn test_slides_along_vertical_wall() {
        // Wall directly to the right of the player
        let wall = Rect::new(61.0, 0.0, 20.0, 200.0);
        let (min, max) = open_area();
        let res = slide_move(
            Vec2::new(50.0, 50.0),
            Vec2::new(2.0, 2.0),
            min,
            max,
            PLAYER,
            |r| r.overlaps(&wall),
        );
        assert_eq!(res.pos, Vec2::new(50.0, 52.0));
        assert!(res.blocked_x);
        assert!(!res.blocked_y);
    }

    #[test]
    fn test_corner_stops_dead() {
        let walls = [Rect::new(61.0, 0.0, 20.0, 200.0), Rect::new(0.0, 61.0, 200.0, 20.0)];
        let (min, max) = open_area();
        let res = slide_move(
            Vec2::new(50.0, 50.0),
            Vec2::new(2.0, 2.0),
            min,
            max,
            PLAYER,
            |r| walls.iter().any(|w| r.overlaps(w)),
        );
        assert_eq!(res.pos, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn test_clamped_to_bounds() {
        let res = slide_move(
            Vec2::new(2.0, 2.0),
            Vec2::new(-5.0, -5.0),
            Vec2::ZERO,
            Vec2::splat(100.0),
            PLAYER,
            |_| false,
        );
        assert_eq!(res.pos, Vec2::ZERO);
    }

    #[test]
    fn test_jump_arc_returns_to_ground() {
        let ground = 328.0;
        let mut j = Jumper::on_ground(ground, 64.0);
        assert!(j.jump(-9.5));
        assert!(!j.jump(-9.5), "no second ground jump while airborne");

        let mut landed = false;
        for _ in 0..200 {
            if j.integrate(0.45, ground, 1.0) {
                landed = true;
                break;
            }
            assert!(j.y < j.rest_y(ground));
        }
        assert!(landed);
        assert_eq!(j.y, ground - 64.0);
        assert_eq!(j.vy, 0.0);
        assert!(!j.airborne);
    }

    #[test]
    fn test_double_jump_once_per_airborne_period() {
        let ground = 100.0;
        let mut j = Jumper::on_ground(ground, 10.0);
        assert_eq!(j.jump_or_double(-9.5, -7.0), Some(JumpKind::Ground));
        j.integrate(0.45, ground, 1.0);
        assert_eq!(j.jump_or_double(-9.5, -7.0), Some(JumpKind::Double));
        assert_eq!(j.vy, -7.0);
        assert_eq!(j.jump_or_double(-9.5, -7.0), None);

        while !j.integrate(0.45, ground, 1.0) {}
        assert!(!j.used_double_jump);
        assert_eq!(j.jump_or_double(-9.5, -7.0), Some(JumpKind::Ground));
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (-200.0f32..200.0, -200.0f32..200.0, 0.5f32..100.0, 0.5f32..100.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }

        #[test]
        fn prop_rect_outside_never_overlaps(a in rect_strategy(), gap in 0.0f32..50.0, side in 0u8..4) {
            let b = match side {
                0 => Rect::new(a.right() + gap, a.y, 10.0, 10.0),
                1 => Rect::new(a.x - 10.0 - gap, a.y, 10.0, 10.0),
                2 => Rect::new(a.x, a.bottom() + gap, 10.0, 10.0),
                _ => Rect::new(a.x, a.y - 10.0 - gap, 10.0, 10.0),
            };
            prop_assert!(!a.overlaps(&b));
        }

        #[test]
        fn prop_slide_uses_unblocked_axis(dx in 0.5f32..4.0, dy in 0.5f32..4.0) {
            // Wall flush with the player's right edge blocks X only
            let start = Vec2::new(50.0, 50.0);
            let wall = Rect::new(60.0, -500.0, 20.0, 1000.0);
            let (min, max) = open_area();
            let res = slide_move(start, Vec2::new(dx, dy), min, max, PLAYER, |r| r.overlaps(&wall));
            prop_assert_eq!(res.pos, Vec2::new(start.x, start.y + dy));
        }
    }
}
