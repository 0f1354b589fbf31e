//! Suspension conditions a coroutine yields to the executor.

use crate::Clock;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

pub type Predicate = Rc<dyn Fn() -> bool>;

/// A wait request, as yielded by a coroutine.
///
/// Requests carry no start reference; the executor arms them against its
/// clock the moment they are yielded, producing a [`Waitable`].
#[derive(Clone)]
pub enum WaitFor {
    /// Ready once this many frames have passed. Zero is treated as one.
    Frames(u64),
    /// Ready once this much monotonic time has passed.
    Seconds(Duration),
    /// Ready as soon as the predicate returns `false`.
    While(Predicate),
    /// Ready as soon as the predicate returns `true`.
    Until(Predicate),
}

impl WaitFor {
    pub fn frames(frames: u64) -> Self {
        WaitFor::Frames(frames)
    }

    pub fn next_frame() -> Self {
        WaitFor::Frames(1)
    }

    /// Negative and NaN inputs wait for zero seconds, infinity waits forever.
    pub fn seconds(seconds: f64) -> Self {
        let seconds = if seconds.is_nan() { 0.0 } else { seconds.max(0.0) };
        WaitFor::Seconds(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
    }

    pub fn duration(duration: Duration) -> Self {
        WaitFor::Seconds(duration)
    }

    pub fn while_true(predicate: impl Fn() -> bool + 'static) -> Self {
        WaitFor::While(Rc::new(predicate))
    }

    pub fn until(predicate: impl Fn() -> bool + 'static) -> Self {
        WaitFor::Until(Rc::new(predicate))
    }

    pub fn kind(&self) -> WaitKind {
        match self {
            WaitFor::Frames(_) => WaitKind::Frames,
            WaitFor::Seconds(_) => WaitKind::Seconds,
            WaitFor::While(_) => WaitKind::While,
            WaitFor::Until(_) => WaitKind::Until,
        }
    }

    /// Captures the clock's current frame count or timestamp.
    pub fn arm(self, clock: &dyn Clock) -> Waitable {
        let condition = match self {
            WaitFor::Frames(frames) => Condition::Frames {
                frames: frames.max(1),
                started: clock.frames(),
            },
            WaitFor::Seconds(wait) => Condition::Seconds {
                wait,
                started: clock.now(),
            },
            WaitFor::While(predicate) => Condition::While(predicate),
            WaitFor::Until(predicate) => Condition::Until(predicate),
        };
        Waitable { condition }
    }
}

impl fmt::Debug for WaitFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitFor::Frames(frames) => f.debug_tuple("Frames").field(frames).finish(),
            WaitFor::Seconds(wait) => f.debug_tuple("Seconds").field(wait).finish(),
            WaitFor::While(_) => f.write_str("While(..)"),
            WaitFor::Until(_) => f.write_str("Until(..)"),
        }
    }
}

/// The family of a wait, without its parameters.
///
/// A coroutine may yield a bare kind to ask for its parameterless form.
/// Only `Frames` has one (a single frame); the rest need arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
    Frames,
    Seconds,
    While,
    Until,
}

impl WaitKind {
    pub fn instantiate(self) -> Option<WaitFor> {
        match self {
            WaitKind::Frames => Some(WaitFor::next_frame()),
            WaitKind::Seconds | WaitKind::While | WaitKind::Until => None,
        }
    }
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitKind::Frames => "Frames",
            WaitKind::Seconds => "Seconds",
            WaitKind::While => "While",
            WaitKind::Until => "Until",
        };
        f.write_str(name)
    }
}

/// An armed wait condition. Its start reference never changes once armed.
#[derive(Clone)]
pub struct Waitable {
    condition: Condition,
}

#[derive(Clone)]
enum Condition {
    Frames { frames: u64, started: u64 },
    Seconds { wait: Duration, started: Duration },
    While(Predicate),
    Until(Predicate),
}

impl Waitable {
    /// Evaluated against the clock each tick; predicates are re-run on every
    /// call.
    pub fn is_ready(&self, clock: &dyn Clock) -> bool {
        match &self.condition {
            Condition::Frames { frames, started } => {
                clock.frames().saturating_sub(*started) >= *frames
            }
            Condition::Seconds { wait, started } => {
                clock.now().saturating_sub(*started) >= *wait
            }
            Condition::While(predicate) => !predicate(),
            Condition::Until(predicate) => predicate(),
        }
    }

    pub fn kind(&self) -> WaitKind {
        match self.condition {
            Condition::Frames { .. } => WaitKind::Frames,
            Condition::Seconds { .. } => WaitKind::Seconds,
            Condition::While(_) => WaitKind::While,
            Condition::Until(_) => WaitKind::Until,
        }
    }
}

impl fmt::Debug for Waitable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Condition::Frames { frames, started } => f
                .debug_struct("Frames")
                .field("frames", frames)
                .field("started", started)
                .finish(),
            Condition::Seconds { wait, started } => f
                .debug_struct("Seconds")
                .field("wait", wait)
                .field("started", started)
                .finish(),
            Condition::While(_) => f.write_str("While(..)"),
            Condition::Until(_) => f.write_str("Until(..)"),
        }
    }
}
