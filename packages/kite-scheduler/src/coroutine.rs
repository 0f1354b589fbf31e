//! Resumable coroutine bodies and the shared handle the executor tracks.

use crate::task::{AsyncRoutine, Yielder};
use crate::wait::{WaitFor, WaitKind};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a coroutine object, stable for its whole life.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CoroutineId(u64);

impl CoroutineId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoroutineId({})", self.0)
    }
}

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a coroutine hands back when it suspends.
pub enum Yield {
    /// Nothing in particular; waits a single frame.
    NextFrame,
    Wait(WaitFor),
    /// A bare wait kind, built with its parameterless form. Kinds without one
    /// are rejected by the executor.
    Kind(WaitKind),
    /// Built lazily by the executor right after the step.
    Factory(Box<dyn FnOnce() -> WaitFor>),
}

impl From<WaitFor> for Yield {
    fn from(wait: WaitFor) -> Self {
        Yield::Wait(wait)
    }
}

impl From<WaitKind> for Yield {
    fn from(kind: WaitKind) -> Self {
        Yield::Kind(kind)
    }
}

impl From<()> for Yield {
    fn from(_: ()) -> Self {
        Yield::NextFrame
    }
}

impl fmt::Debug for Yield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yield::NextFrame => f.write_str("NextFrame"),
            Yield::Wait(wait) => f.debug_tuple("Wait").field(wait).finish(),
            Yield::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Yield::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Outcome of resuming a coroutine once.
#[derive(Debug)]
pub enum CoroutineState {
    Yielded(Yield),
    Complete,
}

impl CoroutineState {
    pub fn next_frame() -> Self {
        CoroutineState::Yielded(Yield::NextFrame)
    }

    pub fn wait(request: impl Into<Yield>) -> Self {
        CoroutineState::Yielded(request.into())
    }
}

/// A step function with saved state: each call runs the body up to its next
/// suspension point.
pub trait Routine {
    fn resume(&mut self) -> anyhow::Result<CoroutineState>;
}

impl<F> Routine for F
where
    F: FnMut() -> anyhow::Result<CoroutineState>,
{
    fn resume(&mut self) -> anyhow::Result<CoroutineState> {
        self()
    }
}

struct Shared {
    id: CoroutineId,
    body: RefCell<Box<dyn Routine>>,
    finished: Cell<bool>,
}

/// Shared handle to a coroutine.
///
/// Clones refer to the same coroutine, so a handle can be kept to stop it
/// or check on it. Only an executor ever resumes it.
#[derive(Clone)]
pub struct Coroutine {
    shared: Rc<Shared>,
}

impl Coroutine {
    pub fn new(routine: impl Routine + 'static) -> Self {
        Self {
            shared: Rc::new(Shared {
                id: CoroutineId::next(),
                body: RefCell::new(Box::new(routine)),
                finished: Cell::new(false),
            }),
        }
    }

    /// Wraps an async body. Each step polls the future once; awaiting one of
    /// the [`Yielder`]'s suspensions ends the step.
    ///
    /// ```ignore
    /// let blink = Coroutine::from_future(|y| async move {
    ///     loop {
    ///         sprite.toggle();
    ///         y.seconds(0.5).await;
    ///     }
    /// });
    /// ```
    pub fn from_future<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        Self::try_from_future(move |yielder| {
            let future = body(yielder);
            async move {
                future.await;
                Ok(())
            }
        })
    }

    /// Like [`Coroutine::from_future`] for bodies that can fail.
    pub fn try_from_future<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self::new(AsyncRoutine::new(body))
    }

    pub fn id(&self) -> CoroutineId {
        self.shared.id
    }

    /// Set once the body has run to completion or failed.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.get()
    }

    /// True while the body is executing a step.
    pub(crate) fn is_resuming(&self) -> bool {
        self.shared.body.try_borrow_mut().is_err()
    }

    pub(crate) fn resume(&self) -> anyhow::Result<CoroutineState> {
        if self.is_finished() {
            return Ok(CoroutineState::Complete);
        }

        let state = self.shared.body.borrow_mut().resume();
        match &state {
            Ok(CoroutineState::Complete) | Err(_) => self.shared.finished.set(true),
            Ok(CoroutineState::Yielded(_)) => {}
        }
        state
    }
}

impl PartialEq for Coroutine {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Coroutine {}

impl Hash for Coroutine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("id", &self.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}
