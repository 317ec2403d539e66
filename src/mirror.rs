use crate::dispmanx::DisplayBackend;
use crate::lifecycle::RunFlag;
use crate::session::DisplaySession;
use anyhow::Result;
use std::thread;
use std::time::{Duration, Instant};

/// Frames slower than this are never followed by a sleep.
const LATE_FRAME: Duration = Duration::from_secs(1);

/// Sleep-based pacing towards a fixed frame interval.
///
/// Late frames are not compensated for: the next frame simply starts
/// immediately.
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    interval: Option<Duration>,
}

impl FramePacer {
    /// `None` runs uncapped.
    pub fn new(interval: Option<Duration>) -> Self {
        Self { interval }
    }

    /// How long to sleep after a frame that took `elapsed`.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        let interval = self.interval?;
        if elapsed >= LATE_FRAME || elapsed >= interval {
            return None;
        }
        Some(interval - elapsed)
    }

    fn pace(&self, started: Instant) {
        let elapsed = started.elapsed();
        match self.remaining(elapsed) {
            Some(delay) => thread::sleep(delay),
            None if self.interval.is_some() => {
                log::trace!("Late frame: {:?}", elapsed);
            }
            None => {}
        }
    }
}

/// Mirrors frames until `running` is cleared. Returns the number of frames.
///
/// The flag is checked once per iteration, so a stop request takes effect
/// after the current frame and its sleep. Any frame error ends the loop
/// immediately.
pub fn run<B: DisplayBackend>(
    session: &mut DisplaySession<'_, B>,
    pacer: &FramePacer,
    running: &RunFlag,
) -> Result<u64> {
    log::debug!("Starting mirror loop ({:?})", pacer);
    let mut frames = 0u64;

    loop {
        if !running.is_running() {
            log::debug!("Stop requested after {} frames", frames);
            break;
        }

        let started = Instant::now();
        session.mirror_frame()?;
        frames += 1;
        pacer.pace(started);
    }

    Ok(frames)
}
