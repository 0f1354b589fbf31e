use crate::context::Context;
use crate::error::{AppError, AppResult};
use kite_scheduler::Coroutine;
use std::any::Any;
use std::fmt;

/// Upcast to [`Any`] for type queries on trait objects.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// What a `start` or `stop` call asks of the frame loop.
pub enum Lifecycle {
    /// Finished synchronously.
    Done,
    /// Continues as a coroutine. It is handed to the executor and the frame
    /// loop moves on without waiting for it to finish.
    Spawn(Coroutine),
}

impl From<()> for Lifecycle {
    fn from(_: ()) -> Self {
        Lifecycle::Done
    }
}

impl From<Coroutine> for Lifecycle {
    fn from(coroutine: Coroutine) -> Self {
        Lifecycle::Spawn(coroutine)
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Done => f.write_str("Done"),
            Lifecycle::Spawn(coroutine) => f.debug_tuple("Spawn").field(&coroutine.id()).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Update,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::Update => "update",
            Phase::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Behavior attached to a [`Scene`](crate::Scene).
///
/// Every method has a no-op default, so a component implements only the
/// phases it cares about.
pub trait Component: AsAny {
    fn start(&mut self, _cx: &Context) -> anyhow::Result<Lifecycle> {
        Ok(Lifecycle::Done)
    }

    fn update(&mut self, _cx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&mut self, _cx: &Context) -> anyhow::Result<Lifecycle> {
        Ok(Lifecycle::Done)
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub(crate) fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref()
}

pub(crate) fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut()
}

/// Runs one lifecycle phase, handing a returned coroutine to the executor.
pub(crate) fn run_phase(cx: &Context, component: &mut dyn Component, phase: Phase) -> AppResult<()> {
    let outcome = match phase {
        Phase::Start => component.start(cx),
        Phase::Update => component.update(cx).map(|()| Lifecycle::Done),
        Phase::Stop => component.stop(cx),
    };

    let lifecycle = outcome.map_err(|source| AppError::Component {
        name: component.name(),
        phase,
        source,
    })?;

    if let Lifecycle::Spawn(coroutine) = lifecycle {
        tracing::debug!(
            component = component.name(),
            %phase,
            coroutine = %coroutine.id(),
            "lifecycle continues as a coroutine"
        );
        cx.start_coroutine(coroutine)?;
    }
    Ok(())
}
