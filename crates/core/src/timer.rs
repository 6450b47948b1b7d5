//! Frame timing.

use std::time::{Duration, Instant};

/// Upper bound on a single frame delta, in seconds.
///
/// Long stalls (window drag, swap chain recreation, debugger breaks) would
/// otherwise produce a huge step for camera movement and light orbits.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Measures total run time and per-frame deltas.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Total elapsed time since the timer was created or reset.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time since the previous `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Frame delta in seconds, clamped to [`MAX_FRAME_TIME`].
    pub fn frame_time(&mut self) -> f32 {
        self.tick().as_secs_f32().min(MAX_FRAME_TIME)
    }

    /// Reset the timer to the current time.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_monotonic() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(2));
        let first = timer.tick();
        assert!(first >= Duration::from_millis(2));
        assert!(timer.elapsed() >= first);
    }

    #[test]
    fn test_frame_time_is_clamped() {
        let mut timer = Timer::new();
        timer.last_tick = Instant::now() - Duration::from_secs(5);
        assert_eq!(timer.frame_time(), MAX_FRAME_TIME);
    }

    #[test]
    fn test_reset_restarts_elapsed() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(2));
        timer.reset();
        assert!(timer.elapsed() < Duration::from_millis(2));
    }
}
