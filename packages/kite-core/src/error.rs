use crate::component::Phase;
use crate::scene::SceneId;
use kite_scheduler::SchedulerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("this app has already stopped and cannot run again")]
    AlreadyStopped,

    #[error("`{phase}` hook failed: {source}")]
    Hook {
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("component `{name}` failed to {phase}: {source}")]
    Component {
        name: &'static str,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error("service `{name}` failed to {phase}: {source}")]
    Service {
        name: &'static str,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("scene {0:?} not found")]
    SceneNotFound(SceneId),

    #[error("component not found: {0}")]
    ComponentNotFound(String),

    #[error("service `{0}` not found")]
    ServiceNotFound(&'static str),

    #[error("this app is sceneless and has no default scene")]
    NoDefaultScene,

    #[error("invalid app config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
