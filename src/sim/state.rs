//! Shared controller state
//!
//! The three mini-games report what happened through a drained event list
//! and a terminal [`Outcome`]. [`Controller`] is the one active mini-game.

use serde::{Deserialize, Serialize};

use super::collector::Collector;
use super::input::InputState;
use super::maze::MazeWalker;
use super::runner::Runner;
use crate::audio::SoundEffect;
use crate::tuning::{Tuning, TuningError};

/// How a mini-game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    /// Collector level clock ran out
    TimedOut,
    /// Runner lives reached zero
    GameOver,
    /// Maze portal reached and faded out
    Done,
}

impl Outcome {
    /// Whether the flow should move on rather than offer a retry
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Won | Outcome::Done)
    }
}

/// Something the presentation side needs to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Sfx(SoundEffect),
    /// Counters changed; HUD text should be rewritten
    HudChanged,
    Finished(Outcome),
}

/// Which mini-game to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    Collector,
    Runner,
    /// Index into `Tuning::mazes`
    Maze(usize),
}

/// The active mini-game
pub enum Controller {
    Collector(Collector),
    Runner(Runner),
    Maze(MazeWalker),
}

impl Controller {
    /// Build a fresh controller. Every start is a full reset.
    pub fn start(kind: ControllerKind, tuning: &Tuning, seed: u64) -> Result<Self, TuningError> {
        let controller = match kind {
            ControllerKind::Collector => Controller::Collector(Collector::new(&tuning.collector, seed)),
            ControllerKind::Runner => Controller::Runner(Runner::new(&tuning.runner, seed)),
            ControllerKind::Maze(index) => {
                let def = tuning.mazes.get(index).ok_or_else(|| TuningError::InvalidMaze {
                    maze: format!("#{index}"),
                    reason: format!("only {} mazes configured", tuning.mazes.len()),
                })?;
                Controller::Maze(MazeWalker::new(def, seed)?)
            }
        };
        log::debug!("Controller {kind:?} started (seed {seed})");
        Ok(controller)
    }

    pub fn tick(&mut self, input: &InputState, step: f32) {
        match self {
            Controller::Collector(c) => c.tick(input, step),
            Controller::Runner(r) => r.tick(input, step),
            Controller::Maze(m) => m.tick(input, step),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Controller::Collector(c) => c.outcome(),
            Controller::Runner(r) => r.outcome(),
            Controller::Maze(m) => m.outcome(),
        }
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        match self {
            Controller::Collector(c) => c.take_events(),
            Controller::Runner(r) => r.take_events(),
            Controller::Maze(m) => m.take_events(),
        }
    }

    /// Retry prompt text for a failed run
    pub fn failure_text(&self) -> Option<String> {
        match self {
            Controller::Collector(c) => Some(c.failure_text()),
            Controller::Runner(r) => Some(r.failure_text()),
            Controller::Maze(_) => None,
        }
    }
}
