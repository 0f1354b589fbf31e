use crate::Clock;
use crate::coroutine::{Coroutine, CoroutineId, CoroutineState, Yield};
use crate::error::{Result, SchedulerError};
use crate::task::Yielder;
use crate::wait::{WaitFor, Waitable};
use kite_hooks::{CallbackId, Hook};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

new_key_type! {
    struct EntryKey;
}

struct Entry {
    coroutine: Coroutine,
    waitable: Waitable,
}

#[derive(Default)]
struct Tracked {
    entries: SlotMap<EntryKey, Entry>,
    order: Vec<EntryKey>,
    by_id: FxHashMap<CoroutineId, EntryKey>,
}

impl Tracked {
    fn insert(&mut self, coroutine: Coroutine, waitable: Waitable) {
        let id = coroutine.id();
        let key = self.entries.insert(Entry {
            coroutine,
            waitable,
        });
        self.order.push(key);
        self.by_id.insert(id, key);
    }

    fn remove(&mut self, key: EntryKey) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| *k != key);
        self.by_id.remove(&entry.coroutine.id());
        Some(entry)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.by_id.clear();
    }
}

/// Drives coroutines cooperatively, one step per coroutine per tick.
///
/// Each tracked coroutine is paired with the waitable it last yielded. A tick
/// walks the coroutines in start order and resumes those whose waitable is
/// ready; a coroutine is dropped from the executor once it completes.
///
/// Coroutines may start and stop other coroutines (or stop themselves) while
/// being resumed. Those started mid-tick are only considered from the next
/// tick, and stopped ones are skipped if not yet reached.
pub struct Executor {
    clock: Rc<dyn Clock>,
    tracked: RefCell<Tracked>,
    ticks: Cell<u64>,
}

impl Executor {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            tracked: RefCell::new(Tracked::default()),
            ticks: Cell::new(0),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Runs the first step of `coroutine` right away and tracks it until it
    /// completes. A coroutine that completes on that first step is never
    /// tracked.
    ///
    /// Starting a coroutine that is already running fails with
    /// [`SchedulerError::DuplicateCoroutine`].
    pub fn start(&self, coroutine: Coroutine) -> Result<Coroutine> {
        let id = coroutine.id();
        if self.is_active(&coroutine) || coroutine.is_resuming() {
            return Err(SchedulerError::DuplicateCoroutine(id));
        }

        match self.advance(&coroutine)? {
            Some(waitable) => {
                tracing::debug!(%id, kind = %waitable.kind(), "coroutine started");
                self.tracked.borrow_mut().insert(coroutine.clone(), waitable);
            }
            None => tracing::debug!(%id, "coroutine completed on its first step"),
        }
        Ok(coroutine)
    }

    /// Calls `factory` once and starts the coroutine it returns.
    pub fn start_with(&self, factory: impl FnOnce() -> Coroutine) -> Result<Coroutine> {
        self.start(factory())
    }

    /// Starts an async body as a coroutine.
    pub fn spawn<F, Fut>(&self, body: F) -> Result<Coroutine>
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.start(Coroutine::from_future(body))
    }

    /// Stops tracking `coroutine` without resuming it again.
    pub fn stop(&self, coroutine: &Coroutine) -> Result<()> {
        let id = coroutine.id();
        let mut tracked = self.tracked.borrow_mut();
        let key = tracked
            .by_id
            .get(&id)
            .copied()
            .ok_or(SchedulerError::CoroutineNotFound(id))?;
        tracked.remove(key);
        tracing::debug!(%id, "coroutine stopped");
        Ok(())
    }

    pub fn stop_all(&self) {
        let mut tracked = self.tracked.borrow_mut();
        let count = tracked.entries.len();
        tracked.clear();
        if count > 0 {
            tracing::debug!(count, "stopped all coroutines");
        }
    }

    pub fn is_active(&self, coroutine: &Coroutine) -> bool {
        self.tracked.borrow().by_id.contains_key(&coroutine.id())
    }

    pub fn len(&self) -> usize {
        self.tracked.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked coroutines in start order.
    pub fn active(&self) -> Vec<Coroutine> {
        let tracked = self.tracked.borrow();
        tracked
            .order
            .iter()
            .filter_map(|key| tracked.entries.get(*key))
            .map(|entry| entry.coroutine.clone())
            .collect()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    /// Resumes every coroutine whose waitable is ready and returns how many
    /// were resumed.
    ///
    /// Calling `tick` from inside a coroutine step is allowed; the coroutine
    /// being stepped is skipped by the nested tick.
    ///
    /// The first coroutine to fail aborts the tick: it is dropped from the
    /// executor and its error is returned, leaving later coroutines
    /// unresumed for this tick.
    pub fn tick(&self) -> Result<usize> {
        self.ticks.set(self.ticks.get() + 1);

        let snapshot: SmallVec<[EntryKey; 16]> =
            self.tracked.borrow().order.iter().copied().collect();

        let mut resumed = 0;
        for key in snapshot {
            // Predicates may touch the executor, so no borrow is held while
            // the waitable is evaluated.
            let (coroutine, waitable) = {
                let tracked = self.tracked.borrow();
                match tracked.entries.get(key) {
                    Some(entry) => (entry.coroutine.clone(), entry.waitable.clone()),
                    None => continue,
                }
            };

            // A tick nested inside a step leaves the running coroutine alone.
            if coroutine.is_resuming() || !waitable.is_ready(self.clock()) {
                continue;
            }
            resumed += 1;

            let next = match self.advance(&coroutine) {
                Ok(next) => next,
                Err(err) => {
                    self.tracked.borrow_mut().remove(key);
                    tracing::debug!(id = %coroutine.id(), "coroutine failed, aborting tick");
                    return Err(err);
                }
            };

            let mut tracked = self.tracked.borrow_mut();
            match next {
                // Stopped during its own step: stays stopped.
                Some(waitable) => {
                    if let Some(entry) = tracked.entries.get_mut(key) {
                        entry.waitable = waitable;
                    }
                }
                None => {
                    tracked.remove(key);
                    tracing::trace!(id = %coroutine.id(), "coroutine completed");
                }
            }
        }

        Ok(resumed)
    }

    /// Starts a fresh coroutine from `factory` every time `hook` fires.
    ///
    /// The hook holds the executor weakly; once the executor is dropped the
    /// callback does nothing.
    pub fn bind<A: 'static>(
        self: &Rc<Self>,
        hook: &Hook<A, anyhow::Result<()>>,
        factory: impl Fn() -> Coroutine + 'static,
    ) -> CallbackId {
        let executor = Rc::downgrade(self);
        hook.add(move |_| {
            if let Some(executor) = executor.upgrade() {
                executor.start(factory())?;
            }
            Ok(())
        })
    }

    /// Runs one step and arms whatever the coroutine yielded.
    fn advance(&self, coroutine: &Coroutine) -> Result<Option<Waitable>> {
        let id = coroutine.id();
        let state = coroutine
            .resume()
            .map_err(|source| SchedulerError::CoroutineFailed { id, source })?;

        let request = match state {
            CoroutineState::Complete => return Ok(None),
            CoroutineState::Yielded(request) => request,
        };

        let wait = match request {
            Yield::NextFrame => WaitFor::next_frame(),
            Yield::Wait(wait) => wait,
            Yield::Kind(kind) => kind
                .instantiate()
                .ok_or(SchedulerError::InvalidYield { id, kind })?,
            Yield::Factory(factory) => factory(),
        };

        tracing::trace!(%id, ?wait, "coroutine suspended");
        Ok(Some(wait.arm(self.clock())))
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("active", &self.len())
            .field("ticks", &self.ticks.get())
            .finish()
    }
}
