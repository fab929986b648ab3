use std::thread;
use std::time::{Duration, Instant};

/// Longest step handed to a tick, in seconds.
pub const MAX_STEP: f32 = 0.25;

/// Paces the loop to a target frame interval and measures `dt`.
///
/// When a frame finishes early the pacer sleeps the remainder, then samples
/// the clock again so `dt` reflects the time that really passed.
#[derive(Debug)]
pub struct FramePacer {
    target: Duration,
    last: Instant,
    elapsed: Duration,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            target: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            last: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// Time accumulated over every tick so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Wait out the frame interval if needed and return the step in seconds.
    pub fn tick(&mut self) -> f32 {
        let spent = self.last.elapsed();
        if spent < self.target {
            thread::sleep(self.target - spent);
        }

        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        self.elapsed += dt;
        dt.as_secs_f32().min(MAX_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_never_returns_less_than_the_target() {
        let mut pacer = FramePacer::new(200);
        let target = pacer.target().as_secs_f32();
        for _ in 0..3 {
            let dt = pacer.tick();
            assert!(dt >= target * 0.99, "dt {dt} below target {target}");
            assert!(dt <= MAX_STEP);
        }
        assert!(pacer.elapsed() >= pacer.target() * 3);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut pacer = FramePacer::new(1000);
        pacer.last = Instant::now().checked_sub(Duration::from_secs(2)).unwrap();
        assert_eq!(pacer.tick(), MAX_STEP);
    }
}
