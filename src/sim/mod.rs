//! Mini-game simulation module
//!
//! All gameplay logic lives here. This module must stay free of rendering
//! and platform dependencies:
//! - Every per-tick delta is scaled by the frame step
//! - Seeded RNG only (one `Pcg32` per controller)
//! - Outcomes are reported through `GameEvent`s and `Outcome`, never by
//!   reaching into the screen sequencer

pub mod clock;
pub mod collector;
pub mod collision;
pub mod entity;
pub mod input;
pub mod maze;
pub mod runner;
pub mod state;

pub use clock::{FrameClock, frame_step};
pub use collector::{Berry, Collector, CollectorPhase};
pub use collision::{Jumper, Rect, slide_move};
pub use entity::{Companion, Entity, EntityKind, Facing, Wanderer};
pub use input::{Action, InputState, TouchDrag};
pub use maze::{MazePhase, MazeWalker, TileGrid};
pub use runner::{Escort, Obstacle, ObstacleKind, Runner, RunnerPhase};
pub use state::{Controller, ControllerKind, GameEvent, Outcome};
