use std::time::Duration;

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 60;

/// Timeline auto-advance driven by periodic ticks.
#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    fps: u32,
    playing: bool,
    accumulated: Duration,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(12)
    }
}

impl Playback {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.clamp(MIN_FPS, MAX_FPS),
            playing: false,
            accumulated: Duration::ZERO,
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.clamp(MIN_FPS, MAX_FPS);
    }

    /// Whole milliseconds between frames.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps as u64)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn start(&mut self) {
        if !self.playing {
            self.playing = true;
            self.accumulated = Duration::ZERO;
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.accumulated = Duration::ZERO;
    }

    /// Flip between playing and stopped; returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.stop();
        } else {
            self.start();
        }
        self.playing
    }

    /// Feed elapsed time; returns the frame to show when at least one interval has passed.
    pub fn tick(&mut self, elapsed: Duration, frame_count: usize, current: usize) -> Option<usize> {
        if !self.playing || frame_count <= 1 {
            self.accumulated = Duration::ZERO;
            return None;
        }
        self.accumulated += elapsed;
        let interval = self.interval();
        if self.accumulated < interval {
            return None;
        }
        let steps = (self.accumulated.as_nanos() / interval.as_nanos()) as usize;
        self.accumulated -= interval * steps as u32;
        Some((current + steps) % frame_count)
    }
}
