pub mod app;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod scene;
pub mod service;

pub use app::{App, AppState};
pub use component::{AsAny, Component, Lifecycle, Phase};
pub use config::AppConfig;
pub use context::Context;
pub use error::{AppError, AppResult};
pub use events::{EventSource, Headless, QuitAfter};
pub use scene::{ComponentId, PhaseHook, Scene, SceneId};
pub use service::Service;

pub use kite_hooks as hooks;
pub use kite_scheduler as scheduler;
