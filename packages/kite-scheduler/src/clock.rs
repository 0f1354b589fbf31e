//! Frame counters and monotonic time sources consumed by waitables.

use crate::Clock;
use std::cell::Cell;
use std::time::{Duration, Instant};

/// Wall-clock frame timer advanced once per frame by the frame loop.
///
/// Interior mutability lets the loop tick it while coroutines, waitables and
/// components hold shared references to it.
pub struct Chrono {
    epoch: Instant,
    frames: Cell<u64>,
    last_tick: Cell<Option<Instant>>,
    delta: Cell<Duration>,
    framerate: Cell<f64>,
    min_fps: Cell<Option<f64>>,
    max_fps: Cell<Option<f64>>,
    started_at: Cell<Option<Instant>>,
    stopped_at: Cell<Option<Instant>>,
}

impl Default for Chrono {
    fn default() -> Self {
        Self::new()
    }
}

impl Chrono {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            frames: Cell::new(0),
            last_tick: Cell::new(None),
            delta: Cell::new(Duration::ZERO),
            framerate: Cell::new(0.0),
            min_fps: Cell::new(None),
            max_fps: Cell::new(None),
            started_at: Cell::new(None),
            stopped_at: Cell::new(None),
        }
    }

    /// Marks the start of the run.
    pub fn start(&self) {
        let now = Instant::now();
        self.started_at.set(Some(now));
        self.last_tick.set(Some(now));
    }

    pub fn stop(&self) {
        self.stopped_at.set(Some(Instant::now()));
    }

    /// Advances the frame counter by one and samples frame timing.
    pub fn tick(&self) {
        let now = Instant::now();
        self.frames.set(self.frames.get() + 1);

        let Some(last) = self.last_tick.replace(Some(now)) else {
            self.delta.set(Duration::ZERO);
            return;
        };

        let delta = now.duration_since(last);
        self.delta.set(delta);

        if delta.is_zero() {
            return;
        }
        let fps = 1.0 / delta.as_secs_f64();
        self.framerate.set(fps);
        self.min_fps
            .set(Some(self.min_fps.get().map_or(fps, |min| min.min(fps))));
        self.max_fps
            .set(Some(self.max_fps.get().map_or(fps, |max| max.max(fps))));
    }

    /// Time between the last two ticks.
    pub fn delta_time(&self) -> Duration {
        self.delta.get()
    }

    pub fn delta_seconds(&self) -> f64 {
        self.delta.get().as_secs_f64()
    }

    /// Instantaneous framerate measured on the last tick.
    pub fn framerate(&self) -> f64 {
        self.framerate.get()
    }

    pub fn min_fps(&self) -> Option<f64> {
        self.min_fps.get()
    }

    pub fn max_fps(&self) -> Option<f64> {
        self.max_fps.get()
    }

    pub fn time_since_start(&self) -> Option<Duration> {
        let started = self.started_at.get()?;
        let end = self.stopped_at.get().unwrap_or_else(Instant::now);
        Some(end.saturating_duration_since(started))
    }

    pub fn average_fps(&self) -> f64 {
        match self.time_since_start() {
            Some(elapsed) if !elapsed.is_zero() => self.frames.get() as f64 / elapsed.as_secs_f64(),
            _ => 0.0,
        }
    }

    pub fn has_started(&self) -> bool {
        self.started_at.get().is_some()
    }

    pub fn has_stopped(&self) -> bool {
        self.stopped_at.get().is_some()
    }
}

impl Clock for Chrono {
    fn frames(&self) -> u64 {
        self.frames.get()
    }

    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Hand-driven clock for deterministic tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    frames: Cell<u64>,
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_frame(&self) {
        self.advance_frames(1);
    }

    pub fn advance_frames(&self, frames: u64) {
        self.frames.set(self.frames.get() + frames);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Negative and NaN amounts advance nothing, as in [`WaitFor::seconds`](crate::WaitFor::seconds).
    pub fn advance_secs(&self, seconds: f64) {
        let seconds = if seconds.is_nan() { 0.0 } else { seconds.max(0.0) };
        self.advance(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX));
    }
}

impl Clock for ManualClock {
    fn frames(&self) -> u64 {
        self.frames.get()
    }

    fn now(&self) -> Duration {
        self.now.get()
    }
}
