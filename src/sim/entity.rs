//! Entity model shared by the mini-games
//!
//! Every moving thing is an [`Entity`]: a position, a velocity, a behavior tag
//! and an animation phase. Behaviors that repeat across games (trailing
//! companion, wandering NPC, speech bubbles) live here so the controllers
//! only wire them together.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::lerp_toward;

/// Behavior tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Companion,
    Npc,
    Obstacle,
    Collectible,
}

/// Two-frame walk animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkCycle {
    pub frame: u8,
    timer: f32,
    period: f32,
}

impl WalkCycle {
    pub fn new(period: f32) -> Self {
        Self {
            frame: 0,
            timer: 0.0,
            period,
        }
    }

    pub fn advance(&mut self, moving: bool, step: f32) {
        if !moving {
            self.frame = 0;
            self.timer = 0.0;
            return;
        }
        self.timer += step;
        if self.timer >= self.period {
            self.frame = (self.frame + 1) % 2;
            self.timer = 0.0;
        }
    }
}

/// Position, velocity, behavior tag and animation phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: EntityKind,
    pub anim: WalkCycle,
}

impl Entity {
    pub fn new(kind: EntityKind, pos: Vec2, walk_period: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            kind,
            anim: WalkCycle::new(walk_period),
        }
    }
}

/// Which way a sprite faces. Sprites are authored facing left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Left,
    Right,
}

/// Facing with hysteresis so small jitters don't flip the sprite every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacingLatch {
    pub facing: Facing,
    cooldown: f32,
    /// Frames to hold a new facing before another flip is allowed
    hold: f32,
    /// Minimum horizontal motion per frame that counts as a turn
    threshold: f32,
}

impl FacingLatch {
    pub fn new(facing: Facing, hold: f32, threshold: f32) -> Self {
        Self {
            facing,
            cooldown: 0.0,
            hold,
            threshold,
        }
    }

    pub fn update(&mut self, dx: f32, step: f32) {
        if self.cooldown > 0.0 {
            self.cooldown -= step;
            return;
        }
        let turned = if dx > self.threshold {
            Facing::Right
        } else if dx < -self.threshold {
            Facing::Left
        } else {
            return;
        };
        if turned != self.facing {
            self.facing = turned;
            self.cooldown = self.hold;
        }
    }
}

/// A character that trails the player with exponential smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Companion {
    pub body: Entity,
    pub facing: FacingLatch,
    /// Fraction of the remaining gap closed per baseline frame
    follow: f32,
}

impl Companion {
    pub fn new(pos: Vec2, follow: f32, facing_threshold: f32) -> Self {
        Self {
            body: Entity::new(EntityKind::Companion, pos, 12.0),
            facing: FacingLatch::new(Facing::Left, 15.0, facing_threshold),
            follow,
        }
    }

    /// Close part of the gap to `target`. At step 1 this is exactly `follow`
    /// of the gap; other steps compound so the result matches step-1 ticks.
    pub fn follow(&mut self, target: Vec2, step: f32) {
        let prev = self.body.pos;
        let factor = 1.0 - (1.0 - self.follow).powf(step);
        self.body.pos = lerp_toward(prev, target, factor);
        self.body.vel = self.body.pos - prev;

        let moving = self.body.vel.x.abs() > 0.3 || self.body.vel.y.abs() > 0.3;
        self.body.anim.advance(moving, step);
        self.facing.update(self.body.vel.x, step);
    }
}

/// Short-lived visual particle (sparkles, stars, confetti)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining life; the particle is dead at or below zero
    pub life: f32,
    pub max_life: f32,
    pub color: u8,
}

impl Particle {
    /// Advance and report whether the particle is still alive
    pub fn update(&mut self, decay: f32, step: f32) -> bool {
        self.pos += self.vel * step;
        self.life -= decay * step;
        self.life > 0.0
    }

    /// Remaining life as 0..=1, for fading
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// `count` particles flying out evenly around `origin`
    pub fn burst<R: Rng>(rng: &mut R, origin: Vec2, count: usize, speed: f32, life: f32) -> Vec<Particle> {
        (0..count)
            .map(|i| {
                let angle = std::f32::consts::TAU * i as f32 / count as f32;
                let jitter = rng.random_range(1.0..1.6);
                Particle {
                    pos: origin,
                    vel: Vec2::from_angle(angle) * speed * jitter - Vec2::new(0.0, 1.0),
                    life,
                    max_life: life,
                    color: rng.random_range(0..4),
                }
            })
            .collect()
    }
}

/// Rotating list of lines a character says
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageCycle {
    messages: Vec<String>,
    index: usize,
}

impl MessageCycle {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages, index: 0 }
    }

    pub fn next_line(&mut self) -> Option<&str> {
        if self.messages.is_empty() {
            return None;
        }
        let i = self.index % self.messages.len();
        self.index += 1;
        Some(&self.messages[i])
    }
}

/// A speech bubble anchored at a point in world space
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechBubble {
    pub text: String,
    pub anchor: Vec2,
}

/// The one speech bubble a mini-game shows at a time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Speech {
    pub bubble: Option<SpeechBubble>,
    timer: f32,
}

impl Speech {
    pub fn is_idle(&self) -> bool {
        self.timer <= 0.0
    }

    /// Show `text` for `frames` unless another bubble is still up
    pub fn say(&mut self, text: &str, anchor: Vec2, frames: f32) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.bubble = Some(SpeechBubble {
            text: text.to_string(),
            anchor,
        });
        self.timer = frames;
        true
    }

    pub fn tick(&mut self, step: f32) {
        if self.timer > 0.0 {
            self.timer -= step;
            if self.timer <= 0.0 {
                self.bubble = None;
            }
        }
    }
}

/// An NPC that drifts around, changing heading every now and then
#[derive(Debug, Clone, PartialEq)]
pub struct Wanderer {
    pub name: String,
    pub body: Entity,
    pub facing: FacingLatch,
    pub lines: MessageCycle,
    change_timer: f32,
    change_interval: f32,
}

impl Wanderer {
    pub const SIZE: f32 = 32.0;
    const OBSTACLE_PAD: f32 = 10.0;

    pub fn new(
        name: &str,
        pos: Vec2,
        vel: Vec2,
        first_interval: f32,
        messages: Vec<String>,
    ) -> Self {
        let facing = if vel.x > 0.0 { Facing::Right } else { Facing::Left };
        let mut body = Entity::new(EntityKind::Npc, pos, 14.0);
        body.vel = vel;
        Self {
            name: name.to_string(),
            body,
            facing: FacingLatch::new(facing, 20.0, 0.15),
            lines: MessageCycle::new(messages),
            change_timer: 0.0,
            change_interval: first_interval,
        }
    }

    /// Move, bounce off the area edges and obstacles, maybe pick a new heading
    pub fn update<R: Rng>(&mut self, rng: &mut R, min: Vec2, max: Vec2, obstacles: &[Rect], step: f32) {
        let body = &mut self.body;
        body.pos += body.vel * step;

        if body.pos.x < min.x {
            body.pos.x = min.x;
            body.vel.x = body.vel.x.abs();
        }
        if body.pos.x > max.x {
            body.pos.x = max.x;
            body.vel.x = -body.vel.x.abs();
        }
        if body.pos.y < min.y {
            body.pos.y = min.y;
            body.vel.y = body.vel.y.abs();
        }
        if body.pos.y > max.y {
            body.pos.y = max.y;
            body.vel.y = -body.vel.y.abs();
        }

        let hitbox = Rect::at(body.pos, Vec2::splat(Self::SIZE));
        if obstacles
            .iter()
            .any(|o| hitbox.overlaps(&o.inflate(Self::OBSTACLE_PAD)))
        {
            body.vel = -body.vel;
        }

        self.change_timer += step;
        if self.change_timer >= self.change_interval {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let speed = rng.random_range(0.25..0.7);
            body.vel = Vec2::from_angle(angle) * speed;
            self.change_timer = 0.0;
            self.change_interval = rng.random_range(90.0..190.0);
        }

        self.facing.update(body.vel.x, step);
        body.anim.advance(true, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_companion_closes_gap() {
        let mut c = Companion::new(Vec2::ZERO, 0.07, 0.3);
        let target = Vec2::new(100.0, 0.0);
        c.follow(target, 1.0);
        assert!((c.body.pos.x - 7.0).abs() < 1e-4);
        for _ in 0..200 {
            c.follow(target, 1.0);
        }
        assert!((c.body.pos - target).length() < 1.0);
    }

    #[test]
    fn test_companion_step_is_rate_independent() {
        let target = Vec2::new(100.0, 50.0);
        let mut once = Companion::new(Vec2::ZERO, 0.08, 0.15);
        let mut twice = once;
        once.follow(target, 2.0);
        twice.follow(target, 1.0);
        twice.follow(target, 1.0);
        assert!((once.body.pos - twice.body.pos).length() < 1e-3);
    }

    #[test]
    fn test_facing_latch_holds() {
        let mut latch = FacingLatch::new(Facing::Left, 15.0, 0.3);
        latch.update(1.0, 1.0);
        assert_eq!(latch.facing, Facing::Right);
        // Flip back is ignored during the cooldown
        latch.update(-1.0, 1.0);
        assert_eq!(latch.facing, Facing::Right);
        for _ in 0..15 {
            latch.update(0.0, 1.0);
        }
        latch.update(-1.0, 1.0);
        assert_eq!(latch.facing, Facing::Left);
    }

    #[test]
    fn test_speech_one_bubble_at_a_time() {
        let mut speech = Speech::default();
        assert!(speech.say("hi", Vec2::ZERO, 10.0));
        assert!(!speech.say("other", Vec2::ZERO, 10.0));
        for _ in 0..10 {
            speech.tick(1.0);
        }
        assert!(speech.bubble.is_none());
        assert!(speech.say("other", Vec2::ZERO, 10.0));
    }

    #[test]
    fn test_message_cycle_rotates() {
        let mut lines = MessageCycle::new(vec!["a".into(), "b".into()]);
        assert_eq!(lines.next_line(), Some("a"));
        assert_eq!(lines.next_line(), Some("b"));
        assert_eq!(lines.next_line(), Some("a"));
        assert_eq!(MessageCycle::default().next_line(), None);
    }

    #[test]
    fn test_wanderer_bounces_off_edges() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut npc = Wanderer::new("slowpoke", Vec2::new(9.0, 50.0), Vec2::new(-2.0, 0.0), 1000.0, vec![]);
        npc.update(&mut rng, Vec2::splat(8.0), Vec2::splat(256.0), &[], 1.0);
        assert_eq!(npc.body.pos.x, 8.0);
        assert!(npc.body.vel.x > 0.0);
    }

    #[test]
    fn test_wanderer_stays_in_bounds() {
        let mut rng = Pcg32::seed_from_u64(42);
        let min = Vec2::splat(8.0);
        let max = Vec2::new(256.0, 336.0);
        let mut npc = Wanderer::new("psyduck", Vec2::new(230.0, 290.0), Vec2::new(-0.4, 0.3), 120.0, vec![]);
        for _ in 0..5_000 {
            npc.update(&mut rng, min, max, &[], 1.5);
            assert!(npc.body.pos.cmpge(min).all() && npc.body.pos.cmple(max).all());
        }
    }
}
