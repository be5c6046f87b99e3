//! Active mini-game session
//!
//! At most one mini-game runs at a time. The [`Scheduler`] owns it together
//! with everything it acquired from the platform (input listeners, drawing
//! context). Starting a session always drops the previous one first, so its
//! listeners are gone before new ones are registered.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::platform::PlatformError;
use crate::sim::{Controller, ControllerKind, FrameClock, GameEvent, InputState, Outcome};
use crate::tuning::{Tuning, TuningError};

/// Input state shared between a session and its event listeners
pub type InputHandle = Rc<RefCell<InputState>>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("bad tuning: {0}")]
    Tuning(#[from] TuningError),

    #[error("platform: {0}")]
    Platform(#[from] PlatformError),
}

/// What one frame of the session produced
#[derive(Debug, Default, PartialEq)]
pub struct SessionFrame {
    pub step: f32,
    pub events: Vec<GameEvent>,
    pub outcome: Option<Outcome>,
}

/// The running mini-game and the platform resources it holds.
///
/// `R` is released when the session is dropped.
pub struct ActiveSession<R> {
    pub id: u64,
    pub kind: ControllerKind,
    pub controller: Controller,
    pub input: InputHandle,
    pub resources: R,
    clock: FrameClock,
}

impl<R> ActiveSession<R> {
    /// Advance the mini-game to `now_ms`
    pub fn frame(&mut self, now_ms: f64) -> SessionFrame {
        let step = self.clock.tick(now_ms);
        let Ok(mut input) = self.input.try_borrow_mut() else {
            log::warn!("Input busy, skipping session {} frame", self.id);
            return SessionFrame::default();
        };
        self.controller.tick(&input, step);
        input.end_frame();
        SessionFrame {
            step,
            events: self.controller.take_events(),
            outcome: self.controller.outcome(),
        }
    }

    pub fn fps(&self) -> u32 {
        self.clock.fps()
    }
}

/// Single owner of the active session
pub struct Scheduler<R> {
    active: Option<ActiveSession<R>>,
    started: u64,
}

impl<R> Default for Scheduler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Scheduler<R> {
    pub fn new() -> Self {
        Self {
            active: None,
            started: 0,
        }
    }

    /// Stop whatever is running, then start `kind`.
    ///
    /// `acquire` registers the platform side (listeners writing into the
    /// given input handle). If anything fails no session is left running.
    pub fn start(
        &mut self,
        kind: ControllerKind,
        tuning: &Tuning,
        seed: u64,
        now_ms: f64,
        acquire: impl FnOnce(&InputHandle) -> Result<R, PlatformError>,
    ) -> Result<&mut ActiveSession<R>, SessionError> {
        self.stop();

        let controller = Controller::start(kind, tuning, seed)?;
        let input = Rc::new(RefCell::new(InputState::new()));
        let resources = acquire(&input)?;

        self.started += 1;
        log::debug!("Session {} started: {kind:?}", self.started);
        Ok(self.active.insert(ActiveSession {
            id: self.started,
            kind,
            controller,
            input,
            resources,
            clock: FrameClock::starting_at(now_ms),
        }))
    }

    /// Stop the active session. Safe to call when nothing is running.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(session) => {
                log::debug!("Session {} stopped", session.id);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<&ActiveSession<R>> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut ActiveSession<R>> {
        self.active.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

/// Run `f` on the cell's value unless it is already borrowed, i.e. unless
/// this is a re-entrant call from inside another frame. Skipped calls
/// return `None`.
pub fn run_exclusive<T, U>(cell: &RefCell<T>, f: impl FnOnce(&mut T) -> U) -> Option<U> {
    match cell.try_borrow_mut() {
        Ok(mut value) => Some(f(&mut value)),
        Err(_) => {
            log::warn!("Re-entrant frame skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Action;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Stands in for a set of registered listeners
    struct Listeners {
        name: u32,
        log: Log,
    }

    impl Drop for Listeners {
        fn drop(&mut self) {
            self.log.borrow_mut().push(format!("release {}", self.name));
        }
    }

    fn acquire(name: u32, log: &Log) -> impl FnOnce(&InputHandle) -> Result<Listeners, PlatformError> + '_ {
        move |_| {
            log.borrow_mut().push(format!("acquire {name}"));
            Ok(Listeners {
                name,
                log: log.clone(),
            })
        }
    }

    #[test]
    fn test_start_releases_previous_first() {
        let log: Log = Rc::default();
        let tuning = Tuning::default();
        let mut scheduler = Scheduler::new();

        scheduler
            .start(ControllerKind::Collector, &tuning, 1, 0.0, acquire(1, &log))
            .unwrap();
        scheduler
            .start(ControllerKind::Runner, &tuning, 1, 0.0, acquire(2, &log))
            .unwrap();

        assert_eq!(*log.borrow(), vec!["acquire 1", "release 1", "acquire 2"]);
        assert_eq!(scheduler.active().map(|s| s.id), Some(2));
        assert_eq!(scheduler.active().map(|s| s.kind), Some(ControllerKind::Runner));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let log: Log = Rc::default();
        let tuning = Tuning::default();
        let mut scheduler = Scheduler::new();
        scheduler
            .start(ControllerKind::Maze(0), &tuning, 1, 0.0, acquire(1, &log))
            .unwrap();
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_running());
        assert_eq!(*log.borrow(), vec!["acquire 1", "release 1"]);
    }

    #[test]
    fn test_failed_acquire_leaves_nothing_running() {
        let tuning = Tuning::default();
        let mut scheduler: Scheduler<()> = Scheduler::new();
        let err = scheduler
            .start(ControllerKind::Runner, &tuning, 1, 0.0, |_| {
                Err(PlatformError::MissingCanvas("world2-canvas".into()))
            })
            .err();
        assert!(matches!(err, Some(SessionError::Platform(_))));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_frame_uses_clock_and_clears_presses() {
        let tuning = Tuning::default();
        let mut scheduler: Scheduler<()> = Scheduler::new();
        let session = scheduler
            .start(ControllerKind::Runner, &tuning, 1, 1000.0, |_| Ok(()))
            .unwrap();

        session.input.borrow_mut().button_down(Action::Jump);
        let frame = session.frame(1000.0 + 1000.0 / 30.0);
        assert!((frame.step - 2.0).abs() < 1e-4);
        assert!(frame.outcome.is_none());
        assert!(!session.input.borrow().just_pressed(Action::Jump));
    }

    #[test]
    fn test_frame_skipped_while_input_borrowed() {
        let tuning = Tuning::default();
        let mut scheduler: Scheduler<()> = Scheduler::new();
        let session = scheduler
            .start(ControllerKind::Collector, &tuning, 1, 0.0, |_| Ok(()))
            .unwrap();
        let input = session.input.clone();
        let _held = input.borrow_mut();
        assert_eq!(session.frame(16.0), SessionFrame::default());
    }

    #[test]
    fn test_run_exclusive_rejects_reentry() {
        let cell = RefCell::new(0);
        let outer = run_exclusive(&cell, |v| {
            *v += 1;
            run_exclusive(&cell, |v| *v += 10)
        });
        assert_eq!(outer, Some(None));
        assert_eq!(*cell.borrow(), 1);
    }
}
