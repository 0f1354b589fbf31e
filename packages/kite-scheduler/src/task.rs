use crate::coroutine::{CoroutineState, Routine, Yield};
use crate::wait::WaitFor;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::noop_waker_ref;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Handed to async coroutine bodies; produces the awaitable suspension points.
///
/// Nothing ever wakes these futures. The executor polls the body once per
/// step, and the suspension it awaited tells the executor when the next step
/// is due.
#[derive(Clone)]
pub struct Yielder {
    slot: Rc<RefCell<Option<Yield>>>,
}

impl Yielder {
    fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub fn wait(&self, request: impl Into<Yield>) -> Suspend {
        Suspend {
            slot: self.slot.clone(),
            request: Some(request.into()),
        }
    }

    pub fn next_frame(&self) -> Suspend {
        self.wait(Yield::NextFrame)
    }

    pub fn frames(&self, frames: u64) -> Suspend {
        self.wait(WaitFor::frames(frames))
    }

    pub fn seconds(&self, seconds: f64) -> Suspend {
        self.wait(WaitFor::seconds(seconds))
    }

    pub fn until(&self, predicate: impl Fn() -> bool + 'static) -> Suspend {
        self.wait(WaitFor::until(predicate))
    }

    pub fn while_true(&self, predicate: impl Fn() -> bool + 'static) -> Suspend {
        self.wait(WaitFor::while_true(predicate))
    }
}

/// Suspends the body once: pending on the first poll, ready on the next.
#[must_use = "suspensions do nothing unless awaited"]
pub struct Suspend {
    slot: Rc<RefCell<Option<Yield>>>,
    request: Option<Yield>,
}

impl Future for Suspend {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match this.request.take() {
            Some(request) => {
                *this.slot.borrow_mut() = Some(request);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

pub(crate) struct AsyncRoutine {
    future: Option<LocalBoxFuture<'static, anyhow::Result<()>>>,
    slot: Rc<RefCell<Option<Yield>>>,
}

impl AsyncRoutine {
    pub(crate) fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let yielder = Yielder::new();
        let slot = yielder.slot.clone();
        Self {
            future: Some(body(yielder).boxed_local()),
            slot,
        }
    }
}

impl Routine for AsyncRoutine {
    fn resume(&mut self) -> anyhow::Result<CoroutineState> {
        let Some(future) = self.future.as_mut() else {
            return Ok(CoroutineState::Complete);
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(result) => {
                self.future = None;
                result.map(|()| CoroutineState::Complete)
            }
            // A foreign future that parked without a suspension counts as
            // waiting one frame.
            Poll::Pending => {
                let request = self.slot.borrow_mut().take().unwrap_or(Yield::NextFrame);
                Ok(CoroutineState::Yielded(request))
            }
        }
    }
}
