use crate::component::{AsAny, Phase};
use crate::context::Context;
use crate::error::{AppError, AppResult};

/// App-wide subsystem, started before and updated before every scene.
pub trait Service: AsAny {
    fn start(&mut self, _cx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn update(&mut self, _cx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop(&mut self, _cx: &Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub(crate) fn run_phase(cx: &Context, service: &mut dyn Service, phase: Phase) -> AppResult<()> {
    let outcome = match phase {
        Phase::Start => service.start(cx),
        Phase::Update => service.update(cx),
        Phase::Stop => service.stop(cx),
    };
    outcome.map_err(|source| AppError::Service {
        name: service.name(),
        phase,
        source,
    })
}

pub(crate) fn downcast_ref<T: Service>(service: &dyn Service) -> Option<&T> {
    service.as_any().downcast_ref()
}

pub(crate) fn downcast_mut<T: Service>(service: &mut dyn Service) -> Option<&mut T> {
    service.as_any_mut().downcast_mut()
}
