use std::time::{Duration, Instant};

use crate::compose::options::Pacing;
use crate::foundation::core::Fps;

/// Holds each produced frame on screen for one frame interval of wall-clock time.
///
/// Deadlines are absolute (`start + n / fps`), so a slow frame shortens the next wait instead
/// of shifting every later frame.
#[derive(Debug)]
pub struct FrameClock {
    pacing: Pacing,
    fps: Fps,
    started_at: Instant,
    ticks: u64,
}

impl FrameClock {
    /// Start the clock now.
    pub fn start(pacing: Pacing, fps: Fps) -> Self {
        Self {
            pacing,
            fps,
            started_at: Instant::now(),
            ticks: 0,
        }
    }

    /// Frames ticked so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wall-clock time since [`FrameClock::start`].
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Count one frame and, when paced, sleep until its interval ends.
    pub fn tick(&mut self) {
        self.ticks += 1;
        if self.pacing == Pacing::Unpaced {
            return;
        }
        let deadline = self.started_at + Duration::from_secs_f64(self.fps.frames_to_secs(self.ticks));
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}
