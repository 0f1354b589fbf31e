use crate::component::{Component, Phase};
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::{AppError, AppResult};
use crate::events::{EventSource, Headless};
use crate::scene::{ComponentId, PhaseHook, Scene, SceneId, fire};
use crate::service::{self, Service};
use kite_hooks::Hook;
use slotmap::SlotMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    NotStarted,
    Running,
    /// Terminal. A stopped app cannot be run again.
    Stopped,
}

/// Owns the services and scenes and drives them through the frame loop.
///
/// [`App::run`] goes through these phases, in this order, exactly once:
///
/// 1. `preload` hook, then every service's `start`, then every scene's
///    `start`, then the `setup` hook.
/// 2. Once per frame until the event source reports quit: `pre_update`
///    hook, the clock and the executor, every service's `update`, every
///    scene's `update`, the `post_update` hook.
/// 3. `teardown` hook, every service's `stop`, every scene's `stop`, then
///    the `cleanup` hook.
///
/// The first error from any phase ends the run and leaves the app stopped.
pub struct App {
    cx: Context,
    state: AppState,
    events: Box<dyn EventSource>,
    services: Vec<Box<dyn Service>>,
    scenes: SlotMap<SceneId, Scene>,
    scene_order: Vec<SceneId>,
    default_scene: Option<SceneId>,

    pub preload: PhaseHook,
    pub setup: PhaseHook,
    pub pre_update: PhaseHook,
    pub post_update: PhaseHook,
    pub teardown: PhaseHook,
    pub cleanup: PhaseHook,
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let sceneless = config.sceneless;
        let mut app = Self {
            cx: Context::new(config),
            state: AppState::NotStarted,
            events: Box::new(Headless),
            services: Vec::new(),
            scenes: SlotMap::with_key(),
            scene_order: Vec::new(),
            default_scene: None,
            preload: Hook::new(),
            setup: Hook::new(),
            pre_update: Hook::new(),
            post_update: Hook::new(),
            teardown: Hook::new(),
            cleanup: Hook::new(),
        };

        if !sceneless {
            let id = app.insert_scene(Scene::new("default"));
            app.default_scene = Some(id);
        }
        app
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(Self::new(AppConfig::from_json(json)?))
    }

    /// Replaces the event source polled for quit signals.
    pub fn with_events(mut self, events: impl EventSource + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn config(&self) -> &AppConfig {
        self.cx.config()
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AppState::Running
    }

    pub fn has_stopped(&self) -> bool {
        self.state == AppState::Stopped
    }

    // Services

    pub fn add_service(&mut self, service: impl Service) -> AppResult<()> {
        self.ensure_not_stopped()?;
        tracing::debug!("Registering service {}", service.name());
        self.services.push(Box::new(service));
        Ok(())
    }

    pub fn with_service(mut self, service: impl Service) -> AppResult<Self> {
        self.add_service(service)?;
        Ok(self)
    }

    pub fn get_service<T: Service>(&self) -> Option<&T> {
        self.services
            .iter()
            .find_map(|service| service::downcast_ref::<T>(service.as_ref()))
    }

    pub fn get_service_mut<T: Service>(&mut self) -> Option<&mut T> {
        self.services
            .iter_mut()
            .find_map(|service| service::downcast_mut::<T>(service.as_mut()))
    }

    pub fn has_service<T: Service>(&self) -> bool {
        self.get_service::<T>().is_some()
    }

    /// Removes the first service of type `T`. It is not stopped.
    pub fn remove_service<T: Service>(&mut self) -> AppResult<Box<dyn Service>> {
        let index = self
            .services
            .iter()
            .position(|service| service::downcast_ref::<T>(service.as_ref()).is_some())
            .ok_or(AppError::ServiceNotFound(std::any::type_name::<T>()))?;
        Ok(self.services.remove(index))
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    // Scenes

    pub fn add_scene(&mut self, scene: Scene) -> AppResult<SceneId> {
        self.ensure_not_stopped()?;
        Ok(self.insert_scene(scene))
    }

    /// Removes a scene. It is not stopped.
    pub fn remove_scene(&mut self, id: SceneId) -> AppResult<Scene> {
        let scene = self.scenes.remove(id).ok_or(AppError::SceneNotFound(id))?;
        self.scene_order.retain(|other| *other != id);
        if self.default_scene == Some(id) {
            self.default_scene = None;
        }
        tracing::debug!("Removed scene '{}'", scene.name());
        Ok(scene)
    }

    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn scene_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        self.scenes.get_mut(id)
    }

    pub fn default_scene(&self) -> Option<SceneId> {
        self.default_scene
    }

    /// Scenes in the order they are driven.
    pub fn scenes(&self) -> impl Iterator<Item = (SceneId, &Scene)> + '_ {
        self.scene_order
            .iter()
            .filter_map(|id| self.scenes.get(*id).map(|scene| (*id, scene)))
    }

    /// Adds a component to the default scene.
    pub fn add_component(&mut self, component: impl Component) -> AppResult<ComponentId> {
        self.ensure_not_stopped()?;
        let id = self.default_scene.ok_or(AppError::NoDefaultScene)?;
        let scene = self.scenes.get_mut(id).ok_or(AppError::SceneNotFound(id))?;
        Ok(scene.insert(Box::new(component)))
    }

    pub fn with_component(mut self, component: impl Component) -> AppResult<Self> {
        self.add_component(component)?;
        Ok(self)
    }

    fn insert_scene(&mut self, scene: Scene) -> SceneId {
        tracing::debug!("Adding scene '{}'", scene.name());
        let id = self.scenes.insert(scene);
        self.scene_order.push(id);
        id
    }

    fn ensure_not_stopped(&self) -> AppResult<()> {
        if self.has_stopped() {
            return Err(AppError::AlreadyStopped);
        }
        Ok(())
    }

    // Frame loop

    /// Runs the app until the event source reports quit or
    /// [`Context::quit`] is called.
    pub fn run(&mut self) -> AppResult<()> {
        self.ensure_not_stopped()?;

        let span = tracing::info_span!("app", name = %self.cx.config().name);
        let _guard = span.enter();

        self.state = AppState::Running;
        let result = self.run_phases();
        self.state = AppState::Stopped;
        self.cx.chrono().stop();

        match &result {
            Ok(()) => tracing::info!("App stopped after {} frames", self.cx.frames()),
            Err(err) => tracing::error!("App aborted: {}", err),
        }
        result
    }

    fn run_phases(&mut self) -> AppResult<()> {
        let cx = self.cx.clone();
        tracing::info!(
            "App starting with {} services and {} scenes",
            self.services.len(),
            self.scenes.len()
        );

        fire(&self.preload, "preload")?;
        cx.chrono().start();
        self.run_services(&cx, Phase::Start)?;
        for id in &self.scene_order {
            if let Some(scene) = self.scenes.get_mut(*id) {
                scene.start(&cx)?;
            }
        }
        fire(&self.setup, "setup")?;

        tracing::info!("Entering frame loop");
        loop {
            // The source is polled every iteration, even after a quit request.
            let quit = self.events.poll_quit();
            if quit || cx.quit_requested() {
                break;
            }
            self.frame(&cx)?;
        }
        tracing::info!("Leaving frame loop");

        fire(&self.teardown, "teardown")?;
        self.run_services(&cx, Phase::Stop)?;
        for id in &self.scene_order {
            if let Some(scene) = self.scenes.get_mut(*id) {
                scene.stop(&cx)?;
            }
        }
        fire(&self.cleanup, "cleanup")
    }

    fn frame(&mut self, cx: &Context) -> AppResult<()> {
        fire(&self.pre_update, "pre_update")?;

        cx.chrono().tick();
        let resumed = cx.executor().tick()?;
        self.run_services(cx, Phase::Update)?;
        for id in &self.scene_order {
            if let Some(scene) = self.scenes.get_mut(*id) {
                scene.update(cx)?;
            }
        }

        fire(&self.post_update, "post_update")?;

        if cx.config().debug {
            tracing::debug!(
                frame = cx.frames(),
                delta = cx.delta_seconds(),
                coroutines = cx.executor().len(),
                resumed,
                "frame"
            );
        } else {
            tracing::trace!(frame = cx.frames(), resumed, "frame");
        }
        Ok(())
    }

    fn run_services(&mut self, cx: &Context, phase: Phase) -> AppResult<()> {
        for service in &mut self.services {
            service::run_phase(cx, service.as_mut(), phase)?;
        }
        Ok(())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.cx.config().name)
            .field("state", &self.state)
            .field("services", &self.services.len())
            .field("scenes", &self.scenes.len())
            .finish()
    }
}
