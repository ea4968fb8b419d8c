use std::time::{Duration, Instant};

/// Length of the frames-per-second sampling window.
pub const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Frames counted over one elapsed sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsSample {
    /// Frames rendered during the window; reported as the FPS figure.
    pub frames: u32,
    /// Actual window length, at least [`FPS_WINDOW`].
    pub elapsed: Duration,
}

impl FpsSample {
    /// Exact rate over the window.
    pub fn rate(&self) -> f64 {
        if self.elapsed.is_zero() {
            return 0.0;
        }
        self.frames as f64 / self.elapsed.as_secs_f64()
    }
}

/// Result of [`FrameTimer::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Time since the previous tick. Feeds the animation.
    pub delta: Duration,
    /// Present when a sampling window closed on this tick.
    pub sample: Option<FpsSample>,
}

impl FrameTick {
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Per-frame delta plus a coarse frames-per-second counter.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    last: Instant,
    window_start: Instant,
    window: Duration,
    frame_count: u32,
}

impl FrameTimer {
    pub fn new(now: Instant) -> Self {
        Self::with_window(now, FPS_WINDOW)
    }

    pub fn with_window(now: Instant, window: Duration) -> Self {
        Self {
            last: now,
            window_start: now,
            window,
            frame_count: 0,
        }
    }

    /// Measure the delta since the previous tick. When the sampling window
    /// has elapsed, report the frame count and start a new window at `now`.
    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let delta = now.saturating_duration_since(self.last);
        self.last = now;

        let in_window = now.saturating_duration_since(self.window_start);
        let sample = if in_window >= self.window {
            let sample = FpsSample {
                frames: self.frame_count,
                elapsed: in_window,
            };
            self.frame_count = 0;
            self.window_start = now;
            Some(sample)
        } else {
            None
        };

        FrameTick { delta, sample }
    }

    /// Count one finished frame toward the current window.
    pub fn frame_rendered(&mut self) {
        self.frame_count += 1;
    }

    /// Frames counted in the current window so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}
