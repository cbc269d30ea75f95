use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Totals for one worker run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameSummary {
    pub frames: u64,
    pub elapsed: Duration,
    /// Mean frame time in seconds; zero when no frame was presented.
    pub mean_dt: f32,
}

/// Per-worker frame clock.
#[derive(Debug, Clone)]
pub struct FrameClock {
    started: Instant,
    loop_started: Option<Instant>,
    last: Instant,
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            loop_started: None,
            last: now,
            frame_index: 0,
        }
    }

    /// Marks the end of initialization and returns how long it took.
    ///
    /// Frame deltas are measured from this point on.
    pub fn mark_initialized(&mut self) -> Duration {
        let now = Instant::now();
        self.loop_started = Some(now);
        self.last = now;
        now.saturating_duration_since(self.started)
    }

    /// Advances the clock by one presented frame.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    pub fn summary(&self) -> FrameSummary {
        let since = self.loop_started.unwrap_or(self.started);
        let elapsed = self.last.saturating_duration_since(since);
        let mean_dt = if self.frame_index == 0 {
            0.0
        } else {
            elapsed.as_secs_f32() / self.frame_index as f32
        };

        FrameSummary {
            frames: self.frame_index,
            elapsed,
            mean_dt,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
