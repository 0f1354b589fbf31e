use crate::component::{self, Component, Phase};
use crate::context::Context;
use crate::error::{AppError, AppResult};
use kite_hooks::Hook;
use slotmap::{SlotMap, new_key_type};
use std::fmt;

new_key_type! {
    pub struct SceneId;
    pub struct ComponentId;
}

/// Phase hooks carry no arguments; a failing callback aborts the phase.
pub type PhaseHook = Hook<(), anyhow::Result<()>>;

pub(crate) fn fire(hook: &PhaseHook, phase: &'static str) -> AppResult<()> {
    hook.try_fire()
        .map(|_| ())
        .map_err(|source| AppError::Hook { phase, source })
}

/// An ordered set of components driven together.
///
/// Each phase runs its `pre_*` hook, then every component in insertion
/// order, then its `post_*` hook.
pub struct Scene {
    name: String,
    components: SlotMap<ComponentId, Box<dyn Component>>,
    order: Vec<ComponentId>,
    running: bool,

    pub pre_start: PhaseHook,
    pub post_start: PhaseHook,
    pub pre_update: PhaseHook,
    pub post_update: PhaseHook,
    pub pre_stop: PhaseHook,
    pub post_stop: PhaseHook,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("scene")
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: SlotMap::with_key(),
            order: Vec::new(),
            running: false,
            pre_start: Hook::new(),
            post_start: Hook::new(),
            pre_update: Hook::new(),
            post_update: Hook::new(),
            pre_stop: Hook::new(),
            post_stop: Hook::new(),
        }
    }

    pub fn from_components(
        name: impl Into<String>,
        components: impl IntoIterator<Item = Box<dyn Component>>,
    ) -> Self {
        let mut scene = Self::new(name);
        for component in components {
            scene.insert(component);
        }
        scene
    }

    /// Builder form of [`Scene::insert`].
    pub fn with_component(mut self, component: impl Component) -> Self {
        self.insert(Box::new(component));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Adds a component without starting it. It starts with the scene.
    pub fn insert(&mut self, component: Box<dyn Component>) -> ComponentId {
        let id = self.components.insert(component);
        self.order.push(id);
        id
    }

    /// Adds a component, starting it right away if the scene is running.
    pub fn add_component(&mut self, cx: &Context, component: impl Component) -> AppResult<ComponentId> {
        self.add_boxed(cx, Box::new(component))
    }

    pub fn add_boxed(&mut self, cx: &Context, component: Box<dyn Component>) -> AppResult<ComponentId> {
        let id = self.insert(component);
        if self.running {
            if let Some(component) = self.components.get_mut(id) {
                tracing::debug!(scene = %self.name, component = component.name(), "starting late component");
                component::run_phase(cx, component.as_mut(), Phase::Start)?;
            }
        }
        Ok(id)
    }

    /// Removes a component. It is not stopped.
    pub fn remove(&mut self, id: ComponentId) -> AppResult<Box<dyn Component>> {
        let component = self
            .components
            .remove(id)
            .ok_or_else(|| AppError::ComponentNotFound(format!("{id:?}")))?;
        self.order.retain(|other| *other != id);
        Ok(component)
    }

    /// Removes the first component of type `T`.
    pub fn remove_of<T: Component>(&mut self) -> AppResult<Box<dyn Component>> {
        let id = self
            .id_of::<T>()
            .ok_or_else(|| AppError::ComponentNotFound(std::any::type_name::<T>().to_string()))?;
        self.remove(id)
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.order.clear();
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.id_of::<T>().is_some()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id).map(|component| component.as_ref())
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut (dyn Component + 'static)> {
        self.components.get_mut(id).map(|component| component.as_mut())
    }

    /// First component of type `T`, in insertion order.
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.iter().find_map(component::downcast_ref::<T>)
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let id = self.id_of::<T>()?;
        let component = self.components.get_mut(id)?;
        component::downcast_mut::<T>(component.as_mut())
    }

    pub fn components_of<T: Component>(&self) -> Vec<&T> {
        self.iter().filter_map(component::downcast_ref::<T>).collect()
    }

    /// Components in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.components.get(*id))
            .map(|component| component.as_ref())
    }

    pub fn ids(&self) -> &[ComponentId] {
        &self.order
    }

    fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.order.iter().copied().find(|id| {
            self.components
                .get(*id)
                .is_some_and(|component| component::downcast_ref::<T>(component.as_ref()).is_some())
        })
    }

    pub fn start(&mut self, cx: &Context) -> AppResult<()> {
        tracing::debug!(scene = %self.name, components = self.len(), "starting scene");
        fire(&self.pre_start, "scene.pre_start")?;
        self.run_components(cx, Phase::Start)?;
        self.running = true;
        fire(&self.post_start, "scene.post_start")
    }

    pub fn update(&mut self, cx: &Context) -> AppResult<()> {
        fire(&self.pre_update, "scene.pre_update")?;
        self.run_components(cx, Phase::Update)?;
        fire(&self.post_update, "scene.post_update")
    }

    pub fn stop(&mut self, cx: &Context) -> AppResult<()> {
        tracing::debug!(scene = %self.name, "stopping scene");
        fire(&self.pre_stop, "scene.pre_stop")?;
        self.run_components(cx, Phase::Stop)?;
        self.running = false;
        fire(&self.post_stop, "scene.post_stop")
    }

    fn run_components(&mut self, cx: &Context, phase: Phase) -> AppResult<()> {
        for id in &self.order {
            if let Some(component) = self.components.get_mut(*id) {
                component::run_phase(cx, component.as_mut(), phase)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("components", &self.len())
            .field("running", &self.running)
            .finish()
    }
}
