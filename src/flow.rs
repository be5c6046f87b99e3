//! Screen flow
//!
//! The game is a fixed sequence of screens. Exactly one is current; moving
//! on goes through [`FlowMachine::transition`], which fades the old screen
//! out and enters the new one after a short delay. Time is passed in by the
//! caller (milliseconds), so the machine has no timers of its own and can be
//! driven from the animation loop or from tests.

use thiserror::Error;

use crate::audio::MusicTrack;
use crate::sim::ControllerKind;

/// Delay between starting a transition and entering the next screen
pub const ENTER_DELAY_MS: f64 = 400.0;
/// Exit animation length; the old element is hidden afterwards
pub const EXIT_ANIMATION_MS: f64 = 600.0;
/// Clicks this soon after a transition starts are ignored
pub const INPUT_LOCK_MS: f64 = 700.0;

#[derive(Debug, Error, PartialEq)]
pub enum FlowError {
    #[error("screen element not found: {0}")]
    MissingScreen(&'static str),

    #[error("{0:?} is terminal")]
    Terminal(Screen),
}

/// Every screen of the playthrough, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Start,
    Opening,
    World1Intro,
    World1Game,
    World1Complete,
    Maze1,
    World2Intro,
    World2Game,
    World2Complete,
    Maze2,
    World3Intro,
    World3Game,
    World3Complete,
    Maze3,
    Celebration,
}

impl Screen {
    pub const ALL: [Screen; 15] = [
        Screen::Start,
        Screen::Opening,
        Screen::World1Intro,
        Screen::World1Game,
        Screen::World1Complete,
        Screen::Maze1,
        Screen::World2Intro,
        Screen::World2Game,
        Screen::World2Complete,
        Screen::Maze2,
        Screen::World3Intro,
        Screen::World3Game,
        Screen::World3Complete,
        Screen::Maze3,
        Screen::Celebration,
    ];

    /// DOM container for the screen. The three mazes share one.
    pub fn element_id(self) -> &'static str {
        match self {
            Screen::Start => "screen-start",
            Screen::Opening => "screen-opening",
            Screen::World1Intro => "screen-world1-intro",
            Screen::World1Game => "screen-world1-game",
            Screen::World1Complete => "screen-world1-complete",
            Screen::World2Intro => "screen-world2-intro",
            Screen::World2Game => "screen-world2-game",
            Screen::World2Complete => "screen-world2-complete",
            Screen::World3Intro => "screen-world3-intro",
            Screen::World3Game => "screen-world3-game",
            Screen::World3Complete => "screen-world3-complete",
            Screen::Maze1 | Screen::Maze2 | Screen::Maze3 => "screen-maze",
            Screen::Celebration => "screen-celebration",
        }
    }

    /// The screen that normally follows this one
    pub fn next(self) -> Option<Screen> {
        let i = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(i + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Screen::Celebration
    }

    /// Mini-game run while this screen is current
    pub fn controller(self) -> Option<ControllerKind> {
        match self {
            Screen::World1Game => Some(ControllerKind::Collector),
            Screen::World2Game => Some(ControllerKind::Runner),
            Screen::Maze1 => Some(ControllerKind::Maze(0)),
            Screen::Maze2 => Some(ControllerKind::Maze(1)),
            Screen::Maze3 => Some(ControllerKind::Maze(2)),
            _ => None,
        }
    }

    /// Track switched to on entering; `None` keeps the current one
    pub fn music(self) -> Option<MusicTrack> {
        match self {
            Screen::Opening | Screen::Maze1 => Some(MusicTrack::Opening),
            Screen::World1Intro => Some(MusicTrack::World1),
            Screen::World2Intro | Screen::Maze2 => Some(MusicTrack::World2),
            Screen::World3Intro => Some(MusicTrack::World3),
            Screen::Maze3 | Screen::Celebration => Some(MusicTrack::Celebration),
            _ => None,
        }
    }

    /// World number (1..=3) for intro and complete screens
    pub fn world(self) -> Option<usize> {
        match self {
            Screen::World1Intro | Screen::World1Game | Screen::World1Complete => Some(1),
            Screen::World2Intro | Screen::World2Game | Screen::World2Complete => Some(2),
            Screen::World3Intro | Screen::World3Game | Screen::World3Complete => Some(3),
            _ => None,
        }
    }
}

/// The DOM side of screen switching
pub trait ScreenHost {
    fn has_screen(&self, id: &str) -> bool;
    /// Show the element and mark it active
    fn activate(&mut self, id: &str);
    /// Start the exit animation and drop the active mark
    fn begin_exit(&mut self, id: &str);
    /// Hide the element once its exit animation is over
    fn hide(&mut self, id: &str);
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    next: Screen,
    enter_at: f64,
}

#[derive(Debug, Clone, Copy)]
struct Exiting {
    id: &'static str,
    hide_at: f64,
}

/// Screen sequencer
#[derive(Debug)]
pub struct FlowMachine {
    current: Screen,
    pending: Option<Pending>,
    exiting: Vec<Exiting>,
    input_locked_until: f64,
}

impl FlowMachine {
    /// Machine showing the start screen
    pub fn new(host: &mut impl ScreenHost) -> Self {
        host.activate(Screen::Start.element_id());
        Self {
            current: Screen::Start,
            pending: None,
            exiting: Vec::new(),
            input_locked_until: 0.0,
        }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Screen a transition is heading to, if one is under way
    pub fn pending(&self) -> Option<Screen> {
        self.pending.map(|p| p.next)
    }

    /// Whether clicks should reach the current screen
    pub fn accepts_input(&self, now_ms: f64) -> bool {
        self.pending.is_none() && now_ms >= self.input_locked_until
    }

    /// Begin moving to `next`.
    ///
    /// A transition still waiting to enter is replaced: only the latest
    /// target is ever entered.
    pub fn transition(&mut self, next: Screen, now_ms: f64, host: &mut impl ScreenHost) -> Result<(), FlowError> {
        if self.current.is_terminal() && self.pending.is_none() {
            return Err(FlowError::Terminal(self.current));
        }
        let id = next.element_id();
        if !host.has_screen(id) {
            return Err(FlowError::MissingScreen(id));
        }

        match self.pending.take() {
            Some(superseded) => {
                log::warn!("Transition to {:?} superseded by {next:?}", superseded.next);
            }
            None => {
                let old = self.current.element_id();
                host.begin_exit(old);
                self.exiting.push(Exiting {
                    id: old,
                    hide_at: now_ms + EXIT_ANIMATION_MS,
                });
            }
        }

        log::info!("Transition {:?} -> {next:?}", self.current);
        self.input_locked_until = now_ms + INPUT_LOCK_MS;
        self.pending = Some(Pending {
            next,
            enter_at: now_ms + ENTER_DELAY_MS,
        });
        Ok(())
    }

    /// Run whatever is due at `now_ms`. Returns the screen entered on this
    /// call, which the caller must run its enter hook for.
    pub fn settle(&mut self, now_ms: f64, host: &mut impl ScreenHost) -> Option<Screen> {
        let mut entered = None;
        if let Some(pending) = self.pending {
            if now_ms >= pending.enter_at {
                self.pending = None;
                self.current = pending.next;
                host.activate(self.current.element_id());
                entered = Some(self.current);
            }
        }

        let active = self.current.element_id();
        let waiting = self.pending.is_some();
        self.exiting.retain(|e| {
            if now_ms < e.hide_at {
                return true;
            }
            // Maze to maze reuses the element; leave it up
            if waiting || e.id != active {
                host.hide(e.id);
            }
            false
        });
        entered
    }
}
