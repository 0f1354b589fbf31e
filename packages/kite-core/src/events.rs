//! The frame loop's only view of the host's event queue: whether to quit.

/// Polled exactly once per frame loop iteration.
pub trait EventSource {
    /// Whether a quit signal arrived since the last poll.
    fn poll_quit(&mut self) -> bool;
}

impl<F> EventSource for F
where
    F: FnMut() -> bool,
{
    fn poll_quit(&mut self) -> bool {
        self()
    }
}

/// Never signals quit; the loop runs until [`Context::quit`](crate::Context::quit).
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl EventSource for Headless {
    fn poll_quit(&mut self) -> bool {
        false
    }
}

/// Lets the loop run a fixed number of iterations, then signals quit.
#[derive(Debug, Clone, Copy)]
pub struct QuitAfter {
    remaining: u64,
}

impl QuitAfter {
    pub fn new(iterations: u64) -> Self {
        Self {
            remaining: iterations,
        }
    }
}

impl EventSource for QuitAfter {
    fn poll_quit(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(remaining) => {
                self.remaining = remaining;
                false
            }
            None => true,
        }
    }
}
