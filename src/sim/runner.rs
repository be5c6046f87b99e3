//! Forest dodge run (World 2)
//!
//! Side-on auto-runner: obstacles from a fixed script scroll in from the
//! right, the player jumps (and double-jumps) over them. Each script entry
//! counts as one dodge, credited when its last obstacle passes the player.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{JumpKind, Jumper, Rect};
use super::entity::{Particle, Speech, WalkCycle};
use super::input::{Action, InputState};
use super::state::{GameEvent, Outcome};
use crate::audio::SoundEffect;
use crate::consts::{CANVAS_H, CANVAS_W};
use crate::tuning::RunnerTuning;

/// Feet line of every runner
pub const GROUND_LINE: f32 = CANVAS_H - 72.0;
pub const PLAYER_X: f32 = 55.0;
pub const PLAYER_HEIGHT: f32 = 64.0;

/// Obstacles are dropped once fully past this x
const DESPAWN_X: f32 = -60.0;
const FLASH_FRAMES: f32 = 40.0;
const SHAKE_FRAMES: f32 = 20.0;
const CHEER_FRAMES: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Rock,
    Log,
    Stump,
}

impl ObstacleKind {
    pub fn size(self) -> Vec2 {
        match self {
            ObstacleKind::Rock => Vec2::new(24.0, 22.0),
            ObstacleKind::Log => Vec2::new(36.0, 16.0),
            ObstacleKind::Stump => Vec2::new(18.0, 30.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub rect: Rect,
    pub kind: ObstacleKind,
    /// Already passed the player
    pub scored: bool,
    /// Already cost a life
    pub hit: bool,
    /// Only this member of its group credits a dodge
    pub last_in_group: bool,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, x: f32, last_in_group: bool) -> Self {
        let size = kind.size();
        Self {
            rect: Rect::new(x, GROUND_LINE - size.y, size.x, size.y),
            kind,
            scored: false,
            hit: false,
            last_in_group,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Running,
    Won,
    GameOver,
}

/// How an escort keeps pace and reacts to obstacles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscortProfile {
    /// Preferred x relative to the player
    pub offset: f32,
    pub catch_up: f32,
    pub fall_back: f32,
    /// Jumps when an obstacle's left edge is within this distance ahead
    pub lookahead: f32,
    /// Fraction of the player's jump impulse
    pub jump_scale: f32,
    /// Frames before it reacts to another obstacle
    pub cooldown: f32,
    /// Chance to stumble instead of jumping
    pub trip_chance: f64,
    pub height: f32,
}

impl EscortProfile {
    /// Runs ahead and always clears obstacles early
    pub const EAGER: Self = Self {
        offset: 50.0,
        catch_up: 1.0,
        fall_back: 0.0,
        lookahead: 80.0,
        jump_scale: 1.0,
        cooldown: 0.0,
        trip_chance: 0.0,
        height: 64.0,
    };

    /// Trails behind and jumps at the last moment
    pub const LAZY: Self = Self {
        offset: -45.0,
        catch_up: 0.8,
        fall_back: 0.5,
        lookahead: 32.0,
        jump_scale: 0.85,
        cooldown: 20.0,
        trip_chance: 0.0,
        height: 32.0,
    };

    /// Sometimes forgets to jump
    pub const CLUMSY: Self = Self {
        offset: -20.0,
        catch_up: 0.9,
        fall_back: 0.5,
        lookahead: 58.0,
        jump_scale: 0.9,
        cooldown: 25.0,
        trip_chance: 0.12,
        height: 32.0,
    };
}

/// Cosmetic companion running alongside the player
#[derive(Debug, Clone, PartialEq)]
pub struct Escort {
    pub name: String,
    pub x: f32,
    pub jumper: Jumper,
    pub profile: EscortProfile,
    pub anim: WalkCycle,
    /// Frames left of a stumble
    pub tripping: f32,
    cooldown: f32,
}

impl Escort {
    const TRIP_FRAMES: f32 = 30.0;

    pub fn new(name: &str, profile: EscortProfile) -> Self {
        Self {
            name: name.to_string(),
            x: PLAYER_X + profile.offset,
            jumper: Jumper::on_ground(GROUND_LINE, profile.height),
            profile,
            anim: WalkCycle::new(8.0),
            tripping: 0.0,
            cooldown: 0.0,
        }
    }

    fn update<R: Rng>(&mut self, rng: &mut R, obstacles: &[Obstacle], tuning: &RunnerTuning, step: f32) {
        let p = self.profile;
        let target = PLAYER_X + p.offset;
        if self.x < target {
            self.x += p.catch_up * step;
        } else if p.fall_back > 0.0 && self.x > target + 5.0 {
            self.x -= p.fall_back * step;
        }

        self.jumper.integrate(tuning.gravity, GROUND_LINE, step);

        if self.tripping > 0.0 {
            self.tripping -= step;
        } else if !self.jumper.airborne && self.cooldown <= 0.0 {
            let ahead = obstacles
                .iter()
                .any(|o| o.rect.x > self.x && o.rect.x < self.x + p.lookahead);
            if ahead {
                if p.trip_chance > 0.0 && rng.random_bool(p.trip_chance) {
                    self.tripping = Self::TRIP_FRAMES;
                } else {
                    self.jumper.jump(tuning.jump_velocity * p.jump_scale);
                }
                self.cooldown = p.cooldown;
            }
        }
        if self.cooldown > 0.0 {
            self.cooldown -= step;
        }

        self.anim.advance(!self.jumper.airborne, step);
    }
}

/// Parallax background tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tree {
    pub x: f32,
    pub w: f32,
    pub h: f32,
    pub far: bool,
}

pub struct Runner {
    pub tuning: RunnerTuning,
    pub phase: RunnerPhase,
    pub player: Jumper,
    pub anim: WalkCycle,
    pub obstacles: Vec<Obstacle>,
    pub escorts: Vec<Escort>,
    pub dodged: u32,
    /// Dodges needed to win: one per script entry
    pub total: u32,
    pub lives: u32,
    /// Scroll speed in px per frame
    pub speed: f32,
    /// Frames travelled
    pub distance: f32,
    /// Hit flash frames left
    pub flash: f32,
    /// Screen shake frames left
    pub shake: f32,
    pub shake_offset: Vec2,
    pub stars: Vec<Particle>,
    pub cheer: Speech,
    pub trees: Vec<Tree>,
    /// Ground dash scroll phase in 0..16
    pub ground_scroll: f32,
    queue_index: usize,
    spawn_timer: f32,
    next_spawn_at: f32,
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl Runner {
    pub fn new(tuning: &RunnerTuning, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let trees = (0..10)
            .map(|i| Tree {
                x: i as f32 * 40.0 + rng.random::<f32>() * 20.0,
                h: 45.0 + rng.random::<f32>() * 35.0,
                w: 22.0 + rng.random::<f32>() * 12.0,
                far: rng.random_bool(0.5),
            })
            .collect();

        log::debug!("Runner started: {} entries, {} lives", tuning.queue.len(), tuning.lives);

        Self {
            tuning: tuning.clone(),
            phase: RunnerPhase::Running,
            player: Jumper::on_ground(GROUND_LINE, PLAYER_HEIGHT),
            anim: WalkCycle::new(7.0),
            obstacles: Vec::new(),
            escorts: vec![
                Escort::new("bulbasaur", EscortProfile::EAGER),
                Escort::new("slowpoke", EscortProfile::LAZY),
                Escort::new("psyduck", EscortProfile::CLUMSY),
            ],
            dodged: 0,
            total: tuning.queue.len() as u32,
            lives: tuning.lives,
            speed: tuning.base_speed,
            distance: 0.0,
            flash: 0.0,
            shake: 0.0,
            shake_offset: Vec2::ZERO,
            stars: Vec::new(),
            cheer: Speech::default(),
            trees,
            ground_scroll: 0.0,
            queue_index: 0,
            spawn_timer: 0.0,
            next_spawn_at: tuning.first_spawn_frames,
            rng,
            events: vec![GameEvent::HudChanged],
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            RunnerPhase::Running => None,
            RunnerPhase::Won => Some(Outcome::Won),
            RunnerPhase::GameOver => Some(Outcome::GameOver),
        }
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn failure_text(&self) -> String {
        format!(
            "Oh no! You dodged {}/{} obstacles. Almost there! Let's try again!",
            self.dodged, self.total
        )
    }

    /// Player hitbox, a bit smaller than the sprite
    pub fn player_hitbox(&self) -> Rect {
        Rect::new(PLAYER_X + 8.0, self.player.y + 8.0, 48.0, 52.0)
    }

    pub fn tick(&mut self, input: &InputState, step: f32) {
        if self.phase != RunnerPhase::Running {
            return;
        }

        self.distance += step;
        self.speed = self.tuning.base_speed
            + (self.distance / self.tuning.speed_ramp).min(self.tuning.max_speed_bonus);

        if input.just_pressed(Action::Jump) || input.just_pressed(Action::Up) || input.tapped() {
            let jumped = self
                .player
                .jump_or_double(self.tuning.jump_velocity, self.tuning.double_jump_velocity);
            if let Some(kind) = jumped {
                if kind == JumpKind::Double {
                    log::trace!("Double jump");
                }
                self.events.push(GameEvent::Sfx(SoundEffect::Jump));
            }
        }
        self.player
            .integrate(self.tuning.gravity, GROUND_LINE, step);
        self.anim.advance(!self.player.airborne, step);

        self.spawn_timer += step;
        if self.queue_index < self.tuning.queue.len() && self.spawn_timer >= self.next_spawn_at {
            self.spawn_next();
        }

        if let Some(outcome) = self.move_obstacles(step) {
            self.finish(outcome);
            return;
        }

        for escort in &mut self.escorts {
            escort.update(&mut self.rng, &self.obstacles, &self.tuning, step);
        }

        self.scroll_background(step);
        self.stars.retain_mut(|s| s.update(1.0, step));
        self.cheer.tick(step);
        self.flash = (self.flash - step).max(0.0);

        if self.shake > 0.0 {
            self.shake -= step;
            let mag = if self.shake > 0.0 { self.shake / SHAKE_FRAMES * 4.0 } else { 0.0 };
            self.shake_offset = Vec2::new(
                (self.rng.random::<f32>() - 0.5) * mag,
                (self.rng.random::<f32>() - 0.5) * mag,
            );
        } else {
            self.shake_offset = Vec2::ZERO;
        }
    }

    fn spawn_next(&mut self) {
        let Some(entry) = self.tuning.queue.get(self.queue_index).cloned() else {
            return;
        };
        self.queue_index += 1;
        if self.queue_index < self.tuning.queue.len() {
            self.next_spawn_at = self.spawn_timer + entry.gap;
        }

        let inner_gap = self.tuning.inner_gap(entry.kinds.len());
        let mut x = CANVAS_W + 10.0;
        for (i, &kind) in entry.kinds.iter().enumerate() {
            let last = i + 1 == entry.kinds.len();
            self.obstacles.push(Obstacle::new(kind, x, last));
            x += kind.size().x + inner_gap;
        }
    }

    /// Scroll, score and collide. Returns as soon as the run ends so a
    /// finished run never also counts later obstacles.
    fn move_obstacles(&mut self, step: f32) -> Option<Outcome> {
        let hitbox = self.player_hitbox();
        let mut ended = None;

        for i in 0..self.obstacles.len() {
            let o = &mut self.obstacles[i];
            o.rect.x -= self.speed * step;

            let passed = !o.scored && o.rect.right() < PLAYER_X;
            if passed {
                o.scored = true;
            }
            let credited = passed && o.last_in_group;

            let struck = !o.hit && hitbox.overlaps(&o.rect);
            if struck {
                o.hit = true;
            }

            if credited {
                self.dodged += 1;
                self.on_dodge();
                if self.dodged >= self.total {
                    ended = Some(Outcome::Won);
                    break;
                }
            }
            if struck {
                self.lives = self.lives.saturating_sub(1);
                self.flash = FLASH_FRAMES;
                self.shake = SHAKE_FRAMES;
                self.events.push(GameEvent::Sfx(SoundEffect::Hit));
                self.events.push(GameEvent::HudChanged);
                if self.lives == 0 {
                    ended = Some(Outcome::GameOver);
                    break;
                }
            }
        }

        self.obstacles.retain(|o| o.rect.x > DESPAWN_X);
        ended
    }

    fn on_dodge(&mut self) {
        self.events.push(GameEvent::HudChanged);
        let origin = Vec2::new(PLAYER_X + 32.0, self.player.y + 10.0);
        let life = self.rng.random_range(25.0..40.0);
        let burst = Particle::burst(&mut self.rng, origin, 6, 1.5, life);
        self.stars.extend(burst);

        if self.cheer.is_idle() && self.rng.random_bool(self.tuning.cheer_chance) {
            let messages = &self.tuning.companion_messages;
            if !messages.is_empty() {
                let line = messages[self.rng.random_range(0..messages.len())].clone();
                let anchor = self
                    .escorts
                    .first()
                    .map(|e| Vec2::new(e.x + 32.0, e.jumper.y))
                    .unwrap_or(Vec2::new(PLAYER_X, GROUND_LINE - PLAYER_HEIGHT));
                self.cheer.say(&line, anchor, CHEER_FRAMES);
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.phase = match outcome {
            Outcome::Won => RunnerPhase::Won,
            _ => RunnerPhase::GameOver,
        };
        log::info!(
            "Runner finished: {:?} (dodged {}/{}, lives {})",
            outcome,
            self.dodged,
            self.total,
            self.lives
        );
        self.events.push(GameEvent::Finished(outcome));
    }

    fn scroll_background(&mut self, step: f32) {
        for tree in &mut self.trees {
            let parallax = if tree.far { 0.25 } else { 0.45 };
            tree.x -= self.speed * parallax * step;
            if tree.x < -40.0 {
                tree.x = CANVAS_W + 10.0 + self.rng.random::<f32>() * 30.0;
                tree.h = 45.0 + self.rng.random::<f32>() * 35.0;
                tree.w = 22.0 + self.rng.random::<f32>() * 12.0;
            }
        }
        self.ground_scroll = (self.ground_scroll + self.speed * step).rem_euclid(16.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn runner() -> Runner {
        Runner::new(&Tuning::default().runner, 99)
    }

    /// An obstacle sitting inside the player's hitbox, not the end of a group
    fn obstacle_on_player() -> Obstacle {
        Obstacle::new(ObstacleKind::Rock, PLAYER_X + 20.0, false)
    }

    /// Obstacle whose right edge is just ahead of the player's left edge, so
    /// one tick of scrolling passes it without touching the hitbox
    fn obstacle_passing(kind: ObstacleKind, last: bool) -> Obstacle {
        let w = kind.size().x;
        Obstacle::new(kind, PLAYER_X + 1.0 - w, last)
    }

    #[test]
    fn test_five_hits_is_game_over() {
        let mut r = runner();
        let input = InputState::new();
        for n in 1..=5 {
            r.obstacles.push(obstacle_on_player());
            r.tick(&input, 1.0);
            assert_eq!(r.lives, 5 - n);
        }
        assert_eq!(r.phase, RunnerPhase::GameOver);
        assert_eq!(r.outcome(), Some(Outcome::GameOver));
        assert_eq!(r.dodged, 0);

        // Finished runs ignore further ticks
        r.obstacles.push(obstacle_on_player());
        r.tick(&input, 1.0);
        assert_eq!(r.lives, 0);
    }

    #[test]
    fn test_group_counts_one_dodge() {
        let mut r = runner();
        let input = InputState::new();
        r.obstacles.push(obstacle_passing(ObstacleKind::Rock, false));
        r.obstacles.push(obstacle_passing(ObstacleKind::Log, false));
        r.obstacles.push(obstacle_passing(ObstacleKind::Stump, true));
        r.tick(&input, 1.0);
        assert!(r.obstacles.iter().all(|o| o.scored));
        assert_eq!(r.dodged, 1);
        assert_eq!(r.lives, 5);
        // Already scored obstacles never count again
        r.tick(&input, 1.0);
        assert_eq!(r.dodged, 1);
    }

    #[test]
    fn test_hit_and_dodge_in_same_group_both_count() {
        let mut r = runner();
        let input = InputState::new();
        r.obstacles.push(obstacle_on_player());
        let mut last = obstacle_on_player();
        last.rect.x += 30.0;
        last.last_in_group = true;
        r.obstacles.push(last);

        for _ in 0..60 {
            r.tick(&input, 1.0);
        }
        // Both members touch the player, the last one still credits the dodge
        assert_eq!(r.lives, 3);
        assert_eq!(r.dodged, 1);
        assert_eq!(r.phase, RunnerPhase::Running);
    }

    #[test]
    fn test_winning_needs_every_entry() {
        let mut r = runner();
        let input = InputState::new();
        r.dodged = r.total - 1;
        r.obstacles.push(obstacle_passing(ObstacleKind::Rock, true));
        r.tick(&input, 1.0);
        assert_eq!(r.phase, RunnerPhase::Won);
        assert!(r.take_events().contains(&GameEvent::Finished(Outcome::Won)));
    }

    #[test]
    fn test_last_life_beats_win_in_same_tick() {
        let mut r = runner();
        let input = InputState::new();
        r.lives = 1;
        r.dodged = r.total - 1;
        // The hit is processed first because it comes first in the list
        r.obstacles.push(obstacle_on_player());
        r.obstacles.push(obstacle_passing(ObstacleKind::Rock, true));
        r.tick(&input, 1.0);
        assert_eq!(r.phase, RunnerPhase::GameOver);
        assert_eq!(r.dodged, r.total - 1);
    }

    #[test]
    fn test_speed_ramps_to_cap() {
        let mut r = runner();
        let input = InputState::new();
        r.tick(&input, 1.0);
        assert!((r.speed - (2.5 + 1.0 / 250.0)).abs() < 1e-5);
        r.distance = 10_000.0;
        r.tick(&input, 1.0);
        assert_eq!(r.speed, 6.0);
    }

    #[test]
    fn test_queue_spawns_groups() {
        let mut r = runner();
        let input = InputState::new();
        for _ in 0..90 {
            r.tick(&input, 1.0);
        }
        assert_eq!(r.obstacles.len(), 1);
        assert!(r.obstacles[0].last_in_group);

        // Jump to the first pair (entry 10) and spawn it
        r.queue_index = 10;
        r.spawn_next();
        let pair: Vec<_> = r.obstacles.iter().skip(1).collect();
        assert_eq!(pair.len(), 2);
        assert!(!pair[0].last_in_group && pair[1].last_in_group);
        assert_eq!(pair[1].rect.x - pair[0].rect.x, 24.0 + 18.0);
    }

    #[test]
    fn test_jump_and_double_jump_from_input() {
        let mut r = runner();
        let mut input = InputState::new();
        input.key_down(" ");
        r.tick(&input, 1.0);
        assert!(r.player.airborne);
        input.end_frame();
        input.key_up(" ");
        r.tick(&input, 1.0);
        input.key_down(" ");
        r.tick(&input, 1.0);
        assert!(r.player.used_double_jump);
        let jumps = r
            .take_events()
            .iter()
            .filter(|e| **e == GameEvent::Sfx(SoundEffect::Jump))
            .count();
        assert_eq!(jumps, 2);
    }

    #[test]
    fn test_eager_escort_jumps_at_obstacle() {
        let tuning = Tuning::default().runner;
        let mut rng = Pcg32::seed_from_u64(1);
        let mut escort = Escort::new("bulbasaur", EscortProfile::EAGER);
        let ahead = Obstacle::new(ObstacleKind::Log, escort.x + 40.0, true);
        escort.update(&mut rng, &[ahead], &tuning, 1.0);
        assert!(escort.jumper.airborne);
    }

    #[test]
    fn test_clumsy_escort_can_trip() {
        let tuning = Tuning::default().runner;
        let mut rng = Pcg32::seed_from_u64(1);
        let profile = EscortProfile {
            trip_chance: 1.0,
            ..EscortProfile::CLUMSY
        };
        let mut escort = Escort::new("psyduck", profile);
        let ahead = Obstacle::new(ObstacleKind::Rock, escort.x + 20.0, true);
        escort.update(&mut rng, &[ahead], &tuning, 1.0);
        assert!(!escort.jumper.airborne);
        assert!(escort.tripping > 0.0);
    }

    proptest! {
        #[test]
        fn prop_lives_never_negative(hits in 0u32..20, steps in proptest::collection::vec(0.01f32..4.0, 20)) {
            let mut r = runner();
            let input = InputState::new();
            for (i, step) in steps.iter().enumerate() {
                if (i as u32) < hits {
                    r.obstacles.push(obstacle_on_player());
                }
                r.tick(&input, *step);
            }
            prop_assert!(r.lives <= 5);
            if hits >= 5 {
                prop_assert_eq!(r.phase, RunnerPhase::GameOver);
            }
            prop_assert_ne!(r.phase, RunnerPhase::Won);
        }
    }
}
