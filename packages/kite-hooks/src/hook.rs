use crate::error::{HookError, Result};
use crate::priority::Priority;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

new_key_type! {
    pub struct CallbackId;
}

/// Returns `None` when the callback filtered itself out of the pass.
type Callback<A, R> = Rc<dyn Fn(&A) -> Option<R>>;

struct Registry<A, R> {
    callbacks: SlotMap<CallbackId, Callback<A, R>>,
    /// Sorted by descending priority, insertion order among equals.
    order: Vec<(CallbackId, i32)>,
}

#[derive(Default)]
struct PassState {
    depth: Cell<u32>,
    cancelled: Cell<bool>,
}

/// An ordered multicast callback list.
///
/// Callbacks fire by descending priority, ties in insertion order. Every
/// `notify` works on a snapshot taken when it begins, so callbacks may add
/// or remove callbacks (on this hook or any other) while it runs; the
/// changes are seen by the next pass.
///
/// All methods take `&self`: hooks are meant to be shared (`Rc<Hook>`) and
/// touched from inside their own callbacks.
pub struct Hook<A = (), R = ()> {
    registry: RefCell<Registry<A, R>>,
    cancellable: bool,
    once: bool,
    fired: Cell<bool>,
    pass: Rc<PassState>,
}

/// Cheap handle that stops the current pass of a cancellable hook.
///
/// Callbacks capture one of these instead of the hook itself so the hook
/// does not end up owning a reference to itself.
#[derive(Clone)]
pub struct Canceller {
    pass: Rc<PassState>,
}

impl Canceller {
    /// Skips the remaining callbacks of the pass in progress. Outside of a
    /// pass this does nothing.
    pub fn cancel(&self) {
        if self.pass.depth.get() > 0 {
            self.pass.cancelled.set(true);
        }
    }
}

impl<A: 'static, R: 'static> Default for Hook<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static, R: 'static> Hook<A, R> {
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(Registry {
                callbacks: SlotMap::with_key(),
                order: Vec::new(),
            }),
            cancellable: false,
            once: false,
            fired: Cell::new(false),
            pass: Rc::new(PassState::default()),
        }
    }

    /// A hook whose passes can be stopped early with [`Hook::cancel`].
    pub fn cancellable() -> Self {
        Self::new().with_cancellable(true)
    }

    /// A hook that fires a single time and drops its callbacks afterwards.
    pub fn once() -> Self {
        Self::new().with_once(true)
    }

    pub fn with_cancellable(mut self, cancellable: bool) -> Self {
        self.cancellable = cancellable;
        self
    }

    pub fn with_once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Whether a pass has completed at least once.
    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.borrow().order.is_empty()
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.registry.borrow().callbacks.contains_key(id)
    }

    pub fn priority_of(&self, id: CallbackId) -> Option<i32> {
        self.registry
            .borrow()
            .order
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|&(_, priority)| priority)
    }

    /// Registers a callback with the default priority (0).
    pub fn add(&self, callback: impl Fn(&A) -> R + 'static) -> CallbackId {
        self.add_with_priority(callback, Priority::Normal)
    }

    pub fn add_with_priority(
        &self,
        callback: impl Fn(&A) -> R + 'static,
        priority: impl Into<Priority>,
    ) -> CallbackId {
        self.insert(Rc::new(move |args: &A| Some(callback(args))), priority.into())
    }

    fn insert(&self, callback: Callback<A, R>, priority: Priority) -> CallbackId {
        let mut registry = self.registry.borrow_mut();
        let priority = priority.resolve(registry.order.iter().map(|&(_, p)| p));
        let id = registry.callbacks.insert(callback);

        // Lands after every callback with an equal or higher priority.
        let index = registry.order.partition_point(|&(_, p)| p >= priority);
        registry.order.insert(index, (id, priority));

        tracing::trace!(?id, priority, "callback registered");
        id
    }

    pub fn remove(&self, id: CallbackId) -> Result<()> {
        let mut registry = self.registry.borrow_mut();
        if registry.callbacks.remove(id).is_none() {
            return Err(HookError::CallbackNotFound(id));
        }
        registry.order.retain(|&(entry, _)| entry != id);
        tracing::trace!(?id, "callback removed");
        Ok(())
    }

    pub fn clear(&self) {
        let mut registry = self.registry.borrow_mut();
        registry.callbacks.clear();
        registry.order.clear();
    }

    /// Stops the pass in progress after the current callback returns.
    pub fn cancel(&self) -> Result<()> {
        self.canceller()?.cancel();
        Ok(())
    }

    pub fn canceller(&self) -> Result<Canceller> {
        if !self.cancellable {
            return Err(HookError::NotCancellable);
        }
        Ok(Canceller {
            pass: self.pass.clone(),
        })
    }

    /// Runs every callback and collects what they returned. Callbacks that
    /// filtered themselves out (see [`Hook::equals`]) contribute nothing.
    pub fn notify(&self, args: &A) -> Result<Vec<R>> {
        let mut results = Vec::new();
        self.dispatch(args, |result| {
            results.push(result);
            Ok::<(), HookError>(())
        })?;
        Ok(results)
    }

    fn dispatch<E>(
        &self,
        args: &A,
        mut sink: impl FnMut(R) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E>
    where
        E: From<HookError>,
    {
        if self.once && self.fired.get() {
            return Err(HookError::AlreadyFired.into());
        }

        let snapshot: SmallVec<[Callback<A, R>; 8]> = {
            let registry = self.registry.borrow();
            registry
                .order
                .iter()
                .filter_map(|&(id, _)| registry.callbacks.get(id).cloned())
                .collect()
        };

        // A nested pass gets its own cancel flag; the enclosing one is put
        // back when it returns.
        let enclosing_cancelled = self.pass.cancelled.replace(false);
        self.pass.depth.set(self.pass.depth.get() + 1);
        let mut outcome = Ok(());
        for callback in snapshot {
            if let Some(result) = callback(args) {
                if let Err(err) = sink(result) {
                    outcome = Err(err);
                    break;
                }
            }
            if self.pass.cancelled.get() {
                tracing::trace!("hook pass cancelled");
                break;
            }
        }
        self.pass.depth.set(self.pass.depth.get() - 1);
        self.pass.cancelled.set(enclosing_cancelled);

        if outcome.is_ok() {
            if self.once {
                self.clear();
            }
            self.fired.set(true);
        }
        outcome
    }
}

impl<A: PartialEq + 'static, R: 'static> Hook<A, R> {
    /// Registers a callback that only runs when the notified arguments equal
    /// `expected`.
    pub fn equals(&self, expected: A, callback: impl Fn() -> R + 'static) -> CallbackId {
        self.equals_with_priority(expected, callback, Priority::Normal)
    }

    pub fn equals_with_priority(
        &self,
        expected: A,
        callback: impl Fn() -> R + 'static,
        priority: impl Into<Priority>,
    ) -> CallbackId {
        self.insert(
            Rc::new(move |args: &A| (*args == expected).then(|| callback())),
            priority.into(),
        )
    }
}

impl<R: 'static> Hook<(), R> {
    /// `notify` for hooks that carry no arguments.
    pub fn fire(&self) -> Result<Vec<R>> {
        self.notify(&())
    }
}

impl<A: 'static, T: 'static, E: 'static> Hook<A, std::result::Result<T, E>>
where
    E: From<HookError>,
{
    /// Like `notify`, but the first callback returning `Err` aborts the pass
    /// and its error is returned.
    pub fn try_notify(&self, args: &A) -> std::result::Result<Vec<T>, E> {
        let mut results = Vec::new();
        self.dispatch(args, |result| {
            results.push(result?);
            Ok::<(), E>(())
        })?;
        Ok(results)
    }
}

impl<T: 'static, E: 'static> Hook<(), std::result::Result<T, E>>
where
    E: From<HookError>,
{
    pub fn try_fire(&self) -> std::result::Result<Vec<T>, E> {
        self.try_notify(&())
    }
}

impl<A, R> fmt::Debug for Hook<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("callbacks", &self.registry.borrow().order.len())
            .field("cancellable", &self.cancellable)
            .field("once", &self.once)
            .field("fired", &self.fired.get())
            .finish()
    }
}
