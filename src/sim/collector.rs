//! Berry collector (World 1)
//!
//! Top-down: walk around a meadow picking up drifting berries before the
//! level timer runs out. Three levels, each with more obstacles and faster
//! berries; in the last one the berries run away from the player.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{Hitbox, Rect, slide_move};
use super::entity::{Companion, Entity, EntityKind, Particle, Speech, Wanderer};
use super::input::InputState;
use super::state::{GameEvent, Outcome};
use crate::audio::SoundEffect;
use crate::consts::{CANVAS_H, CANVAS_W, FRAMES_PER_SECOND};
use crate::tuning::{CollectorTuning, LevelTuning};

/// Player sprite footprint used for canvas clamping
const PLAYER_SIZE: f32 = 32.0;
const PLAYER_HITBOX: Hitbox = Hitbox::new(3.0, 6.0, 20.0, 20.0);
/// Feet area that decides whether the player stands in tall grass
const GRASS_HITBOX: Hitbox = Hitbox::new(2.0, 6.0, 12.0, 10.0);
const OBSTACLE_PAD: f32 = 2.0;

const BERRY_SIZE: f32 = 8.0;
const FLEE_RADIUS: f32 = 70.0;
const FLEE_ACCEL: f32 = 0.18;

/// Kept free of obstacles around the spawn point
const SPAWN_CLEAR_RADIUS: f32 = 55.0;

/// Collector lifecycle. Construction starts level 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollectorPhase {
    Running,
    /// Banner between levels; counts down in frames
    LevelComplete { banner_left: f32 },
    Won,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneryKind {
    Rock,
    Bush,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenery {
    pub rect: Rect,
    pub kind: SceneryKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Berry {
    pub body: Entity,
    pub base_speed: f32,
    /// Bobbing phase
    pub bob: f32,
    /// Sprite color variant 0..3
    pub variant: u8,
}

impl Berry {
    fn center(&self) -> Vec2 {
        self.body.pos + Vec2::splat(BERRY_SIZE / 2.0)
    }
}

pub struct Collector {
    pub tuning: CollectorTuning,
    pub phase: CollectorPhase,
    /// Current level index (0-based)
    pub level: usize,
    pub collected: u32,
    /// Simulated seconds left on this level
    pub time_left: f32,
    pub player: Entity,
    pub companion: Companion,
    pub berries: Vec<Berry>,
    pub obstacles: Vec<Scenery>,
    pub grass: Vec<Rect>,
    pub npcs: Vec<Wanderer>,
    pub speech: Speech,
    pub sparkles: Vec<Particle>,
    pub banner: String,
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl Collector {
    pub fn new(tuning: &CollectorTuning, seed: u64) -> Self {
        let player = Entity::new(EntityKind::Player, spawn_point(), 10.0);
        let mut collector = Self {
            tuning: tuning.clone(),
            phase: CollectorPhase::Running,
            level: 0,
            collected: 0,
            time_left: 0.0,
            player,
            companion: Companion::new(player.pos, 0.07, 0.3),
            berries: Vec::new(),
            obstacles: Vec::new(),
            grass: Vec::new(),
            npcs: Vec::new(),
            speech: Speech::default(),
            sparkles: Vec::new(),
            banner: String::new(),
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        };
        collector.start_level(0);
        collector
    }

    pub fn level_tuning(&self) -> &LevelTuning {
        &self.tuning.levels[self.level]
    }

    pub fn level_count(&self) -> usize {
        self.tuning.levels.len()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            CollectorPhase::Won => Some(Outcome::Won),
            CollectorPhase::TimedOut => Some(Outcome::TimedOut),
            _ => None,
        }
    }

    /// Whole seconds shown on the HUD
    pub fn seconds_left(&self) -> u32 {
        self.time_left.max(0.0).ceil() as u32
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Text for the retry prompt after a time-out
    pub fn failure_text(&self) -> String {
        format!(
            "Time's up on Level {}! You collected {}/{} berries. Try again!",
            self.level + 1,
            self.collected,
            self.level_tuning().target
        )
    }

    /// Reset counters and regenerate the meadow for `level`
    fn start_level(&mut self, level: usize) {
        self.level = level;
        let lvl = self.tuning.levels[level].clone();

        self.phase = CollectorPhase::Running;
        self.collected = 0;
        self.time_left = lvl.time_limit_secs;
        self.sparkles.clear();
        self.speech = Speech::default();

        self.player = Entity::new(EntityKind::Player, spawn_point(), 10.0);
        self.companion = Companion::new(self.player.pos + Vec2::new(-20.0, 4.0), 0.07, 0.3);

        self.generate_obstacles(lvl.obstacle_count);
        self.generate_grass(lvl.tall_grass);
        self.generate_berries(lvl.target, lvl.berry_speed);
        self.setup_npcs();

        log::debug!(
            "Collector level {} started: {} berries in {}s",
            level + 1,
            lvl.target,
            lvl.time_limit_secs
        );
        self.events.push(GameEvent::HudChanged);
    }

    fn generate_obstacles(&mut self, count: u32) {
        self.obstacles.clear();
        let center = Vec2::new(CANVAS_W / 2.0, CANVAS_H / 2.0);
        let clear_zone = Rect::at(center - SPAWN_CLEAR_RADIUS, Vec2::splat(SPAWN_CLEAR_RADIUS * 2.0));

        for _ in 0..count {
            for _attempt in 0..80 {
                let w = 18.0 + self.rng.random::<f32>() * 16.0;
                let h = 14.0 + self.rng.random::<f32>() * 10.0;
                let x = (self.rng.random::<f32>() * (CANVAS_W - w - 20.0)).floor() + 10.0;
                let y = (self.rng.random::<f32>() * (CANVAS_H - h - 20.0)).floor() + 10.0;
                let rect = Rect::new(x, y, w, h);

                let blocked = rect.overlaps(&clear_zone)
                    || self.obstacles.iter().any(|o| {
                        // Padding only on the far side, matching the spacing rule
                        Rect::new(o.rect.x, o.rect.y, o.rect.w + 8.0, o.rect.h + 8.0)
                            .overlaps(&Rect::new(x, y, w + 8.0, h + 8.0))
                    });
                if !blocked {
                    let kind = if self.rng.random_bool(0.5) {
                        SceneryKind::Rock
                    } else {
                        SceneryKind::Bush
                    };
                    self.obstacles.push(Scenery { rect, kind });
                    break;
                }
            }
        }
    }

    fn generate_grass(&mut self, enabled: bool) {
        self.grass.clear();
        if !enabled {
            return;
        }
        let center = Vec2::new(CANVAS_W / 2.0, CANVAS_H / 2.0);
        let spawn_zone = Rect::at(center - 40.0, Vec2::splat(80.0));
        let patches = [
            Rect::new(20.0, 20.0, 60.0, 40.0),
            Rect::new(200.0, 60.0, 70.0, 40.0),
            Rect::new(40.0, 300.0, 80.0, 50.0),
            Rect::new(210.0, 280.0, 70.0, 60.0),
        ];
        self.grass
            .extend(patches.into_iter().filter(|p| !p.overlaps(&spawn_zone)));
    }

    fn generate_berries(&mut self, count: u32, speed: f32) {
        self.berries.clear();
        let center = Vec2::new(CANVAS_W / 2.0, CANVAS_H / 2.0);

        for i in 0..count {
            let mut pos = Vec2::ZERO;
            for _attempt in 0..120 {
                pos = Vec2::new(
                    (self.rng.random::<f32>() * (CANVAS_W - 40.0)).floor() + 20.0,
                    (self.rng.random::<f32>() * (CANVAS_H - 40.0)).floor() + 20.0,
                );
                let footprint = Rect::at(pos, Vec2::splat(BERRY_SIZE));
                let valid = !self
                    .obstacles
                    .iter()
                    .any(|o| footprint.overlaps(&Rect::new(o.rect.x, o.rect.y, o.rect.w + 4.0, o.rect.h + 4.0)))
                    && !self.berries.iter().any(|b| {
                        let d = (b.body.pos - pos).abs();
                        d.x < 22.0 && d.y < 22.0
                    })
                    && !((pos - center).abs().cmplt(Vec2::splat(40.0)).all());
                if valid {
                    break;
                }
            }

            let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
            let mut body = Entity::new(EntityKind::Collectible, pos, 0.0);
            body.vel = Vec2::from_angle(angle) * speed;
            self.berries.push(Berry {
                body,
                base_speed: speed,
                bob: self.rng.random_range(0.0..std::f32::consts::TAU),
                variant: (i % 3) as u8,
            });
        }
    }

    fn setup_npcs(&mut self) {
        let slowpoke_first = 130.0 + self.rng.random::<f32>() * 70.0;
        let psyduck_first = 100.0 + self.rng.random::<f32>() * 70.0;
        self.npcs = vec![
            Wanderer::new(
                "slowpoke",
                Vec2::new(55.0, 70.0),
                Vec2::new(0.3, 0.2),
                slowpoke_first,
                self.tuning.slowpoke_messages.clone(),
            ),
            Wanderer::new(
                "psyduck",
                Vec2::new(230.0, 290.0),
                Vec2::new(-0.4, 0.3),
                psyduck_first,
                self.tuning.psyduck_messages.clone(),
            ),
        ];
    }

    /// Advance one frame
    pub fn tick(&mut self, input: &InputState, step: f32) {
        match self.phase {
            CollectorPhase::Won | CollectorPhase::TimedOut => return,
            CollectorPhase::LevelComplete { banner_left } => {
                let banner_left = banner_left - step;
                if banner_left <= 0.0 {
                    self.advance_level();
                } else {
                    self.phase = CollectorPhase::LevelComplete { banner_left };
                }
                return;
            }
            CollectorPhase::Running => {}
        }

        let shown = self.seconds_left();
        self.time_left -= step / FRAMES_PER_SECOND;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.phase = CollectorPhase::TimedOut;
            log::info!("Collector timed out on level {}", self.level + 1);
            self.events.push(GameEvent::HudChanged);
            self.events.push(GameEvent::Finished(Outcome::TimedOut));
            return;
        }
        if self.seconds_left() != shown {
            self.events.push(GameEvent::HudChanged);
        }

        self.move_player(input, step);
        self.companion
            .follow(self.player.pos + Vec2::new(-18.0, 4.0), step);
        self.update_berries(step);
        self.update_npcs(step);
        self.speech.tick(step);
        self.sparkles.retain_mut(|p| p.update(0.055, step));
    }

    fn move_player(&mut self, input: &InputState, step: f32) {
        let dir = input.direction();
        let moving = dir != Vec2::ZERO;

        let feet = GRASS_HITBOX.at(self.player.pos);
        let mut speed = self.tuning.player_speed;
        if self.grass.iter().any(|g| feet.overlaps(g)) {
            speed *= self.tuning.grass_slowdown;
        }

        let solids: Vec<Rect> = self
            .obstacles
            .iter()
            .map(|o| o.rect.inflate(OBSTACLE_PAD))
            .collect();
        let max = Vec2::new(CANVAS_W - PLAYER_SIZE, CANVAS_H - PLAYER_SIZE);
        let moved = slide_move(
            self.player.pos,
            dir * speed * step,
            Vec2::ZERO,
            max,
            PLAYER_HITBOX,
            |r| solids.iter().any(|s| r.overlaps(s)),
        );
        self.player.vel = moved.pos - self.player.pos;
        self.player.pos = moved.pos;
        self.player.anim.advance(moving, step);
    }

    fn update_berries(&mut self, step: f32) {
        let flee = self.level_tuning().berry_flee;
        let target = self.level_tuning().target;
        let player_center = self.player.pos + Vec2::splat(8.0);
        let min = Vec2::splat(6.0);
        let max = Vec2::new(CANVAS_W - 14.0, CANVAS_H - 14.0);

        let mut i = 0;
        while i < self.berries.len() {
            let berry = &mut self.berries[i];
            berry.bob += 0.06 * step;
            let body = &mut berry.body;

            if flee {
                let away = body.pos - player_center;
                let dist = away.length();
                if dist < FLEE_RADIUS && dist > 0.1 {
                    body.vel += away / dist * FLEE_ACCEL * step;
                    let max_speed = berry.base_speed * 2.2;
                    body.vel = body.vel.clamp_length_max(max_speed);
                } else {
                    body.vel *= 0.97f32.powf(step);
                    if body.vel.length() < berry.base_speed * 0.3 {
                        let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
                        body.vel = Vec2::from_angle(angle) * berry.base_speed * 0.4;
                    }
                }
            }

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

            let footprint = Rect::at(body.pos, Vec2::splat(BERRY_SIZE));
            if self
                .obstacles
                .iter()
                .any(|o| footprint.overlaps(&o.rect.inflate(4.0)))
            {
                body.vel = -body.vel;
                body.pos += body.vel * 2.0;
            }

            let picked = matches!(self.phase, CollectorPhase::Running)
                && player_center.distance(berry.center()) < self.tuning.pickup_radius;
            if !picked {
                i += 1;
                continue;
            }

            let berry = self.berries.swap_remove(i);
            self.collected += 1;
            let burst = Particle::burst(&mut self.rng, berry.body.pos, 7, 1.5, 1.0);
            self.sparkles.extend(burst);
            self.events.push(GameEvent::Sfx(SoundEffect::Collect));
            self.events.push(GameEvent::HudChanged);
            if self.collected >= target {
                self.level_complete();
            }
        }
    }

    fn update_npcs(&mut self, step: f32) {
        let obstacles: Vec<Rect> = self.obstacles.iter().map(|o| o.rect).collect();
        let min = Vec2::splat(8.0);
        let max = Vec2::new(CANVAS_W - 64.0, CANVAS_H - 64.0);
        for npc in &mut self.npcs {
            npc.update(&mut self.rng, min, max, &obstacles, step);

            if self.speech.is_idle()
                && self.player.pos.distance(npc.body.pos) < self.tuning.talk_radius
            {
                if let Some(line) = npc.lines.next_line() {
                    let anchor = npc.body.pos + Vec2::new(32.0, -10.0);
                    self.speech.say(line, anchor, self.tuning.bubble_frames);
                }
            }
        }
    }

    fn level_complete(&mut self) {
        if !matches!(self.phase, CollectorPhase::Running) {
            return;
        }
        let n = self.level + 1;
        self.banner = if n < self.level_count() {
            format!("Level {n} complete! Get ready for Level {}!", n + 1)
        } else {
            "All berries collected! Amazing!".to_string()
        };
        self.phase = CollectorPhase::LevelComplete {
            banner_left: self.tuning.banner_frames,
        };
        log::info!("Collector level {n} complete");
        self.events.push(GameEvent::Sfx(SoundEffect::Victory));
    }

    fn advance_level(&mut self) {
        if self.level + 1 < self.level_count() {
            self.start_level(self.level + 1);
        } else {
            self.phase = CollectorPhase::Won;
            log::info!("Collector won");
            self.events.push(GameEvent::Finished(Outcome::Won));
        }
    }
}

fn spawn_point() -> Vec2 {
    Vec2::new(CANVAS_W / 2.0 - 8.0, CANVAS_H / 2.0 - 8.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn collector() -> Collector {
        Collector::new(&Tuning::default().collector, 1234)
    }

    /// Drop the next berry onto the player so the following tick picks it up
    fn place_berry_on_player(c: &mut Collector) {
        let target = c.player.pos + Vec2::splat(8.0) - Vec2::splat(BERRY_SIZE / 2.0);
        let berry = &mut c.berries[0];
        berry.body.pos = target;
        berry.body.vel = Vec2::ZERO;
        berry.base_speed = 0.0;
    }

    #[test]
    fn test_level_start_resets_counters() {
        let c = collector();
        assert_eq!(c.phase, CollectorPhase::Running);
        assert_eq!(c.collected, 0);
        assert_eq!(c.time_left, 60.0);
        assert_eq!(c.berries.len(), 5);
        assert!(c.obstacles.len() <= 6);
        assert!(c.grass.is_empty());
    }

    #[test]
    fn test_five_pickups_complete_level_then_advance() {
        let mut c = collector();
        let input = InputState::new();

        // Keep berries still so only the placed one is near the player
        for b in &mut c.berries {
            b.body.vel = Vec2::ZERO;
        }

        let mut frames = 0;
        for n in 1..=5 {
            place_berry_on_player(&mut c);
            c.tick(&input, 1.0);
            frames += 1;
            assert_eq!(c.collected, n);
            if n < 5 {
                assert_eq!(c.phase, CollectorPhase::Running);
                // A few idle frames between pickups
                for _ in 0..60 {
                    c.tick(&input, 1.0);
                    frames += 1;
                }
            }
        }
        // 5th pickup flips to LevelComplete in the same tick
        assert!(matches!(c.phase, CollectorPhase::LevelComplete { .. }));
        assert!(frames as f32 / FRAMES_PER_SECOND <= 10.0);

        // Banner runs out, then level 2 starts fresh
        for _ in 0..150 {
            c.tick(&input, 1.0);
        }
        assert_eq!(c.level, 1);
        assert_eq!(c.phase, CollectorPhase::Running);
        assert_eq!(c.collected, 0);
        assert_eq!(c.time_left, 75.0);
        assert_eq!(c.berries.len(), 7);
    }

    #[test]
    fn test_level_complete_is_idempotent() {
        let mut c = collector();
        let input = InputState::new();
        c.collected = 4;
        place_berry_on_player(&mut c);
        c.tick(&input, 1.0);
        assert_eq!(c.collected, 5);
        let banner_before = c.phase;

        // Another berry under the player during the banner is ignored
        place_berry_on_player(&mut c);
        c.tick(&input, 1.0);
        assert_eq!(c.collected, 5);
        assert!(matches!(c.phase, CollectorPhase::LevelComplete { .. }));
        assert_ne!(c.phase, banner_before, "banner keeps counting down");
    }

    #[test]
    fn test_time_out() {
        let mut c = collector();
        let input = InputState::new();
        // Move berries out of reach
        for b in &mut c.berries {
            b.body.pos = Vec2::new(6.0, 6.0);
            b.body.vel = Vec2::ZERO;
            b.base_speed = 0.0;
        }
        c.player.pos = Vec2::new(250.0, 350.0);
        // 60 s at max step = 900 ticks
        for _ in 0..1000 {
            c.tick(&input, 4.0);
        }
        assert_eq!(c.phase, CollectorPhase::TimedOut);
        assert_eq!(c.outcome(), Some(Outcome::TimedOut));
        let events = c.take_events();
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == GameEvent::Finished(Outcome::TimedOut))
                .count(),
            1
        );
        assert!(c.failure_text().contains("Level 1"));
    }

    #[test]
    fn test_win_after_last_level() {
        let mut c = collector();
        let input = InputState::new();
        c.start_level(2);
        c.collected = c.level_tuning().target - 1;
        place_berry_on_player(&mut c);
        c.tick(&input, 1.0);
        for _ in 0..150 {
            c.tick(&input, 1.0);
        }
        assert_eq!(c.outcome(), Some(Outcome::Won));
    }

    #[test]
    fn test_player_blocked_by_obstacle() {
        let mut c = collector();
        c.obstacles = vec![Scenery {
            rect: Rect::new(150.0, 100.0, 20.0, 20.0),
            kind: SceneryKind::Rock,
        }];
        // Hitbox right edge is 3 + 20 past the position; stand just left of the padded rock
        c.player.pos = Vec2::new(150.0 - OBSTACLE_PAD - 23.0, 95.0);
        let mut input = InputState::new();
        input.key_down("ArrowRight");
        for _ in 0..10 {
            c.move_player(&input, 1.0);
        }
        assert_eq!(c.player.pos.x, 150.0 - OBSTACLE_PAD - 23.0);
    }

    #[test]
    fn test_tall_grass_slows_player() {
        let mut c = Collector::new(&Tuning::default().collector, 9);
        c.start_level(1);
        c.obstacles.clear();
        assert!(!c.grass.is_empty());
        let patch = c.grass[0];
        c.player.pos = Vec2::new(patch.x + 5.0, patch.y + 5.0);
        let mut input = InputState::new();
        input.key_down("d");
        let before = c.player.pos;
        c.move_player(&input, 1.0);
        assert!((c.player.pos.x - before.x - 2.5 * 0.45).abs() < 1e-4);
    }
}
