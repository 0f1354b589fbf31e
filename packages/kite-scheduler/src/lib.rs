pub mod clock;
pub mod coroutine;
pub mod error;
pub mod executor;
pub mod task;
pub mod wait;

use std::time::Duration;

/// The time source waitables are measured against.
/// This allows the executor to run on the frame loop's [`Chrono`] or on a hand-driven clock in tests.
pub trait Clock {
    /// Number of frames ticked so far.
    fn frames(&self) -> u64;

    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;
}

pub use clock::{Chrono, ManualClock};
pub use coroutine::{Coroutine, CoroutineId, CoroutineState, Routine, Yield};
pub use error::{Result, SchedulerError};
pub use executor::Executor;
pub use task::{Suspend, Yielder};
pub use wait::{Predicate, WaitFor, WaitKind, Waitable};
