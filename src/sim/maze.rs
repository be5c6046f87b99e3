//! Maze walker
//!
//! Top-down walk through a tile maze larger than the screen. The camera
//! follows the player; reaching the portal fades to black and ends the
//! session.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{Hitbox, Rect, slide_move};
use super::entity::{Companion, Entity, EntityKind, Facing, MessageCycle, Particle, Speech};
use super::input::InputState;
use super::state::{GameEvent, Outcome};
use crate::audio::SoundEffect;
use crate::consts::{CANVAS_H, CANVAS_W, WALK_SPEED};
use crate::tuning::{Cell, Decoration, DecorationKind, MazeTheme, MazeTuning, TuningError};

/// Tile edge in pixels
pub const TILE: f32 = 32.0;

const PLAYER_HITBOX: Hitbox = Hitbox::new(4.0, 4.0, TILE - 8.0, TILE - 8.0);
const PORTAL_RADIUS: f32 = 30.0;
const FADE_OUT_RATE: f32 = 0.04;
const FADE_IN_RATE: f32 = 0.03;
const TALK_RADIUS: f32 = 80.0;
const BUBBLE_FRAMES: f32 = 150.0;

/// Static wall layout
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    cols: usize,
    rows: usize,
    walls: Vec<bool>,
}

impl TileGrid {
    /// Parse rows of `#` (wall) and `.` (floor)
    pub fn parse(name: &str, rows: &[String]) -> Result<Self, TuningError> {
        let invalid = |reason: String| TuningError::InvalidMaze {
            maze: name.to_string(),
            reason,
        };
        let cols = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if cols == 0 {
            return Err(invalid("grid is empty".into()));
        }

        let mut walls = Vec::with_capacity(cols * rows.len());
        for (r, row) in rows.iter().enumerate() {
            if row.chars().count() != cols {
                return Err(invalid(format!("row {r} is not {cols} tiles wide")));
            }
            for c in row.chars() {
                match c {
                    '#' => walls.push(true),
                    '.' => walls.push(false),
                    other => return Err(invalid(format!("row {r} has unknown tile {other:?}"))),
                }
            }
        }

        Ok(Self {
            cols,
            rows: rows.len(),
            walls,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Out-of-range tiles count as walls
    pub fn is_wall(&self, col: i32, row: i32) -> bool {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return true;
        }
        self.walls[row as usize * self.cols + col as usize]
    }

    pub fn size_px(&self) -> Vec2 {
        Vec2::new(self.cols as f32 * TILE, self.rows as f32 * TILE)
    }

    /// Whether `rect` overlaps any wall tile
    pub fn blocks(&self, rect: &Rect) -> bool {
        let c0 = (rect.x / TILE).floor() as i32;
        let c1 = (rect.right() / TILE).ceil() as i32;
        let r0 = (rect.y / TILE).floor() as i32;
        let r1 = (rect.bottom() / TILE).ceil() as i32;
        for row in r0..r1 {
            for col in c0..c1 {
                if self.is_wall(col, row) && rect.overlaps(&tile_rect(col, row)) {
                    return true;
                }
            }
        }
        false
    }
}

fn tile_rect(col: i32, row: i32) -> Rect {
    Rect::new(col as f32 * TILE, row as f32 * TILE, TILE, TILE)
}

fn cell_origin(cell: Cell) -> Vec2 {
    Vec2::new(cell.col as f32 * TILE, cell.row as f32 * TILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MazePhase {
    Running,
    /// Fading to black after reaching the portal
    Transitioning,
    Done,
}

/// Last direction the player walked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

/// A stationary character that talks when the player is near
#[derive(Debug, Clone, PartialEq)]
pub struct Bystander {
    pub name: String,
    pub pos: Vec2,
    pub facing: Facing,
    pub lines: MessageCycle,
}

pub struct MazeWalker {
    pub name: String,
    pub theme: MazeTheme,
    pub grid: TileGrid,
    pub player: Entity,
    pub heading: Heading,
    pub companion: Companion,
    pub npcs: Vec<Bystander>,
    pub speech: Speech,
    pub decorations: Vec<Decoration>,
    /// Shared animation phase for decorations
    pub decor_phase: f32,
    /// Ambient sparkles (enchanted maze only)
    pub particles: Vec<Particle>,
    pub portal: Rect,
    pub portal_pulse: f32,
    /// Top-left of the viewport in map space
    pub camera: Vec2,
    /// Black overlay alpha: fades in from 1 at start, out to 1 at the portal
    pub fade: f32,
    pub phase: MazePhase,
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl MazeWalker {
    pub fn new(tuning: &MazeTuning, seed: u64) -> Result<Self, TuningError> {
        let grid = TileGrid::parse(&tuning.name, &tuning.grid)?;
        let start = cell_origin(tuning.start);
        let portal_origin = cell_origin(tuning.portal);

        let npcs = tuning
            .npcs
            .iter()
            .map(|n| Bystander {
                name: n.name.clone(),
                pos: cell_origin(n.cell),
                facing: Facing::Left,
                lines: MessageCycle::new(n.messages.clone()),
            })
            .collect();

        let mut walker = Self {
            name: tuning.name.clone(),
            theme: tuning.theme,
            grid,
            player: Entity::new(EntityKind::Player, start, 10.0),
            heading: Heading::Up,
            companion: Companion::new(start + Vec2::new(0.0, TILE * 2.0), 0.08, 0.15),
            npcs,
            speech: Speech::default(),
            decorations: tuning.decorations.clone(),
            decor_phase: 0.0,
            particles: Vec::new(),
            portal: Rect::new(portal_origin.x - TILE / 2.0, portal_origin.y, TILE * 3.0, TILE * 2.0),
            portal_pulse: 0.0,
            camera: Vec2::ZERO,
            fade: 1.0,
            phase: MazePhase::Running,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        };
        walker.update_camera();
        if walker.theme == MazeTheme::Enchanted {
            walker.seed_particles();
        }
        log::debug!("Maze {} started at {:?}", walker.name, tuning.start);
        Ok(walker)
    }

    pub fn outcome(&self) -> Option<Outcome> {
        (self.phase == MazePhase::Done).then_some(Outcome::Done)
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn player_center(&self) -> Vec2 {
        self.player.pos + Vec2::splat(TILE / 2.0)
    }

    pub fn tick(&mut self, input: &InputState, step: f32) {
        match self.phase {
            MazePhase::Done => return,
            MazePhase::Transitioning => {
                self.fade = (self.fade + FADE_OUT_RATE * step).min(1.0);
                if self.fade >= 1.0 {
                    self.phase = MazePhase::Done;
                    log::info!("Maze {} done", self.name);
                    self.events.push(GameEvent::Finished(Outcome::Done));
                }
                return;
            }
            MazePhase::Running => {}
        }

        self.fade = (self.fade - FADE_IN_RATE * step).max(0.0);

        self.move_player(input, step);
        self.update_camera();

        let offset_x = if self.heading == Heading::Left { TILE } else { -TILE };
        self.companion
            .follow(self.player.pos + Vec2::new(offset_x, TILE), step);

        self.portal_pulse += 0.06 * step;
        if self.player_center().distance(self.portal.center()) < PORTAL_RADIUS {
            self.phase = MazePhase::Transitioning;
            self.events.push(GameEvent::Sfx(SoundEffect::Victory));
        }

        self.update_npcs();
        self.speech.tick(step);

        if self.theme == MazeTheme::Enchanted {
            self.update_particles(step);
        }
        self.decor_phase += 0.04 * step;
    }

    fn move_player(&mut self, input: &InputState, step: f32) {
        let dir = input.direction();
        let moving = dir != Vec2::ZERO;

        if dir.x < 0.0 {
            self.heading = Heading::Left;
        } else if dir.x > 0.0 {
            self.heading = Heading::Right;
        } else if dir.y < 0.0 {
            self.heading = Heading::Up;
        } else if dir.y > 0.0 {
            self.heading = Heading::Down;
        }

        if moving {
            let max = self.grid.size_px() - Vec2::splat(TILE);
            let grid = &self.grid;
            let moved = slide_move(
                self.player.pos,
                dir * WALK_SPEED * step,
                Vec2::ZERO,
                max,
                PLAYER_HITBOX,
                |r| grid.blocks(r),
            );
            self.player.vel = moved.pos - self.player.pos;
            self.player.pos = moved.pos;
        } else {
            self.player.vel = Vec2::ZERO;
        }
        self.player.anim.advance(moving, step);
    }

    /// Center the viewport on the player, clamped to the map
    fn update_camera(&mut self) {
        let view = Vec2::new(CANVAS_W, CANVAS_H);
        let max = (self.grid.size_px() - view).max(Vec2::ZERO);
        let wanted = self.player.pos - view / 2.0 + Vec2::splat(TILE / 2.0);
        self.camera = wanted.clamp(Vec2::ZERO, max);
    }

    fn update_npcs(&mut self) {
        let player = self.player.pos;
        for npc in &mut self.npcs {
            let dist = player.distance(npc.pos);
            if dist < TALK_RADIUS * 1.5 {
                npc.facing = if player.x > npc.pos.x {
                    Facing::Right
                } else {
                    Facing::Left
                };
            }
            if dist < TALK_RADIUS && self.speech.is_idle() {
                if let Some(line) = npc.lines.next_line() {
                    self.speech
                        .say(line, npc.pos + Vec2::new(TILE, 0.0), BUBBLE_FRAMES);
                }
            }
        }
    }

    fn sparkle_spots(&self) -> Vec<Vec2> {
        self.decorations
            .iter()
            .filter(|d| d.kind == DecorationKind::SparkleSpot)
            .map(|d| cell_origin(d.cell))
            .collect()
    }

    fn new_particle(&mut self, origin: Vec2) -> Particle {
        let max_life = 0.7 + self.rng.random::<f32>() * 0.8;
        Particle {
            pos: origin + Vec2::new(self.rng.random::<f32>(), self.rng.random::<f32>()) * TILE,
            vel: Vec2::new(
                (self.rng.random::<f32>() - 0.5) * 0.4,
                -self.rng.random::<f32>() * 0.6 - 0.2,
            ),
            life: self.rng.random::<f32>() * max_life,
            max_life,
            color: self.rng.random_range(0..4),
        }
    }

    fn seed_particles(&mut self) {
        for spot in self.sparkle_spots() {
            for _ in 0..3 {
                let p = self.new_particle(spot);
                self.particles.push(p);
            }
        }
        for _ in 0..15 {
            let col = self.rng.random_range(0..self.grid.cols()) as i32;
            let row = self.rng.random_range(0..self.grid.rows()) as i32;
            if !self.grid.is_wall(col, row) {
                let p = self.new_particle(tile_rect(col, row).center() - Vec2::splat(TILE / 2.0));
                self.particles.push(p);
            }
        }
    }

    fn update_particles(&mut self, step: f32) {
        let spots = self.sparkle_spots();
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].update(0.008, step) {
                i += 1;
                continue;
            }
            if spots.is_empty() {
                self.particles.swap_remove(i);
                continue;
            }
            let spot = spots[self.rng.random_range(0..spots.len())];
            let mut fresh = self.new_particle(spot);
            fresh.life = fresh.max_life;
            self.particles[i] = fresh;
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    /// 20x25 map with a single 4-wide vertical corridor on columns 8..=11
    fn corridor() -> MazeTuning {
        let row = "########....########".to_string();
        MazeTuning {
            name: "corridor".into(),
            theme: MazeTheme::Garden,
            grid: vec![row; 25],
            start: Cell::new(9, 24),
            portal: Cell::new(9, 0),
            npcs: vec![],
            decorations: vec![],
        }
    }

    #[test]
    fn test_grid_parse_and_lookup() {
        let grid = TileGrid::parse("t", &["#.".to_string(), ".#".to_string()]).unwrap();
        assert!(grid.is_wall(0, 0));
        assert!(!grid.is_wall(1, 0));
        assert!(grid.is_wall(-1, 0));
        assert!(grid.is_wall(0, 5));
        assert_eq!(grid.size_px(), Vec2::new(64.0, 64.0));

        assert!(TileGrid::parse("t", &["#.".to_string(), "#".to_string()]).is_err());
        assert!(TileGrid::parse("t", &["#x".to_string()]).is_err());
    }

    #[test]
    fn test_walk_to_portal_then_fade() {
        let mut maze = MazeWalker::new(&corridor(), 5).unwrap();
        let mut input = InputState::new();
        input.key_down("ArrowUp");

        let mut ticks = 0;
        while maze.phase == MazePhase::Running && ticks < 1_000 {
            maze.tick(&input, 1.0);
            ticks += 1;
        }
        assert_eq!(maze.phase, MazePhase::Transitioning);
        assert!(maze.player_center().distance(maze.portal.center()) < PORTAL_RADIUS);
        assert!(maze.take_events().contains(&GameEvent::Sfx(SoundEffect::Victory)));

        // Movement stops during the fade
        let frozen = maze.player.pos;
        while maze.phase == MazePhase::Transitioning && ticks < 2_000 {
            maze.tick(&input, 1.0);
            ticks += 1;
        }
        assert_eq!(maze.phase, MazePhase::Done);
        assert_eq!(maze.player.pos, frozen);
        assert_eq!(maze.outcome(), Some(Outcome::Done));
        assert_eq!(maze.take_events(), vec![GameEvent::Finished(Outcome::Done)]);
    }

    #[test]
    fn test_walls_block_and_slide() {
        let mut maze = MazeWalker::new(&corridor(), 5).unwrap();
        let mut input = InputState::new();
        input.key_down("ArrowLeft");
        for _ in 0..100 {
            maze.tick(&input, 1.0);
        }
        // Corridor starts at x = 256; hitbox is inset by 4
        let x = maze.player.pos.x;
        assert!((252.0..252.0 + WALK_SPEED).contains(&x));

        // Diagonal into the wall still slides upward
        input.key_down("ArrowUp");
        let y = maze.player.pos.y;
        maze.tick(&input, 1.0);
        assert!(maze.player.pos.y < y);
        assert_eq!(maze.player.pos.x, x);
    }

    #[test]
    fn test_camera_clamped_to_map() {
        let maze = MazeWalker::new(&corridor(), 5).unwrap();
        // Start is at the bottom edge: camera pinned to the last screen
        assert_eq!(maze.camera.y, 800.0 - CANVAS_H);
        assert!(maze.camera.x >= 0.0 && maze.camera.x <= 640.0 - CANVAS_W);
    }

    #[test]
    fn test_npc_talks_once_per_bubble() {
        let mut tuning = corridor();
        tuning.npcs.push(crate::tuning::MazeNpc {
            name: "slowpoke".into(),
            cell: Cell::new(9, 22),
            messages: vec!["one".into(), "two".into()],
        });
        let mut maze = MazeWalker::new(&tuning, 5).unwrap();
        let input = InputState::new();
        maze.tick(&input, 1.0);
        assert_eq!(maze.speech.bubble.as_ref().map(|b| b.text.as_str()), Some("one"));
        for _ in 0..100 {
            maze.tick(&input, 1.0);
        }
        assert_eq!(maze.speech.bubble.as_ref().map(|b| b.text.as_str()), Some("one"));
        for _ in 0..60 {
            maze.tick(&input, 1.0);
        }
        assert_eq!(maze.speech.bubble.as_ref().map(|b| b.text.as_str()), Some("two"));
    }

    #[test]
    fn test_shipped_mazes_load() {
        for def in Tuning::default().mazes {
            let maze = MazeWalker::new(&def, 1).unwrap();
            let start = maze.player.pos;
            assert!(!maze.grid.blocks(&PLAYER_HITBOX.at(start)));
            if def.theme == MazeTheme::Enchanted {
                assert!(!maze.particles.is_empty());
            }
        }
    }
}
