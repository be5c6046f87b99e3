//! Frame clock
//!
//! Animation callbacks arrive at whatever rate the display refreshes. The
//! clock turns each callback timestamp into a frame step: the elapsed time
//! expressed in 60 Hz frames, so every per-tick delta can be scaled by it.

use crate::consts::{BASELINE_FRAME_MS, MAX_FRAME_STEP, MIN_FRAME_STEP};

/// Elapsed milliseconds expressed in baseline frames, clamped to
/// `[MIN_FRAME_STEP, MAX_FRAME_STEP]`.
///
/// Zero, negative and non-finite elapsed times all land on the floor.
#[inline]
pub fn frame_step(elapsed_ms: f64) -> f32 {
    if !elapsed_ms.is_finite() {
        return MIN_FRAME_STEP;
    }
    let step = (elapsed_ms / BASELINE_FRAME_MS) as f32;
    step.clamp(MIN_FRAME_STEP, MAX_FRAME_STEP)
}

/// Per-session frame clock
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    /// Timestamp of the previous tick (ms)
    last_ms: Option<f64>,
    /// Frames counted since `fps_window_start`
    frame_count: u32,
    fps_window_start: Option<f64>,
    /// Frames counted over the last full second
    fps: u32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock whose first tick measures from `now_ms` (session start)
    pub fn starting_at(now_ms: f64) -> Self {
        Self {
            last_ms: Some(now_ms),
            ..Self::default()
        }
    }

    /// Advance to `now_ms` and return the frame step for this tick.
    ///
    /// The first tick without a start timestamp treats elapsed time as 0.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let elapsed = match self.last_ms {
            Some(prev) => now_ms - prev,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        self.count_frame(now_ms);
        frame_step(elapsed)
    }

    /// Frames per second measured over the last complete second
    pub fn fps(&self) -> u32 {
        self.fps
    }

    fn count_frame(&mut self, now_ms: f64) {
        self.frame_count += 1;
        let window_start = *self.fps_window_start.get_or_insert(now_ms);
        if now_ms - window_start >= 1000.0 {
            self.fps = self.frame_count;
            log::debug!("FPS: {}", self.fps);
            self.frame_count = 0;
            self.fps_window_start = Some(now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_baseline_frame_is_one_step() {
        assert!((frame_step(BASELINE_FRAME_MS) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_first_tick_is_floor() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(1234.0), MIN_FRAME_STEP);
        // 30 Hz display: two baseline frames per callback
        assert!((clock.tick(1234.0 + 2.0 * BASELINE_FRAME_MS) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_long_stall_is_capped() {
        let mut clock = FrameClock::starting_at(0.0);
        assert_eq!(clock.tick(5_000.0), MAX_FRAME_STEP);
    }

    #[test]
    fn test_backwards_timestamp_is_floor() {
        let mut clock = FrameClock::starting_at(500.0);
        assert_eq!(clock.tick(400.0), MIN_FRAME_STEP);
    }

    #[test]
    fn test_fps_counter() {
        let mut clock = FrameClock::starting_at(0.0);
        // 17 ms frames: the 60th frame lands at 1003 ms
        for i in 0..60 {
            clock.tick(i as f64 * 17.0);
        }
        assert_eq!(clock.fps(), 60);
    }

    proptest! {
        #[test]
        fn prop_frame_step_bounded(elapsed in proptest::num::f64::ANY) {
            let step = frame_step(elapsed);
            prop_assert!((MIN_FRAME_STEP..=MAX_FRAME_STEP).contains(&step));
        }
    }
}
