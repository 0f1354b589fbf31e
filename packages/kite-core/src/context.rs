use crate::config::AppConfig;
use kite_scheduler::{Chrono, Clock, Coroutine, Executor, SchedulerError, Yielder};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

/// Shared handle to the running app, passed to every lifecycle call.
///
/// Cloning is cheap; all clones see the same clock, executor and quit flag.
#[derive(Clone)]
pub struct Context {
    chrono: Rc<Chrono>,
    executor: Rc<Executor>,
    quit: Rc<Cell<bool>>,
    config: Rc<AppConfig>,
}

impl Context {
    pub fn new(config: AppConfig) -> Self {
        let chrono = Rc::new(Chrono::new());
        let executor = Rc::new(Executor::new(chrono.clone()));
        Self {
            chrono,
            executor,
            quit: Rc::new(Cell::new(false)),
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn chrono(&self) -> &Rc<Chrono> {
        &self.chrono
    }

    pub fn executor(&self) -> &Rc<Executor> {
        &self.executor
    }

    /// Frames ticked since the app started.
    pub fn frames(&self) -> u64 {
        self.chrono.frames()
    }

    pub fn delta_seconds(&self) -> f64 {
        self.chrono.delta_seconds()
    }

    /// Asks the frame loop to exit when it next polls for events.
    pub fn quit(&self) {
        self.quit.set(true);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }

    pub fn start_coroutine(&self, coroutine: Coroutine) -> Result<Coroutine, SchedulerError> {
        self.executor.start(coroutine)
    }

    pub fn spawn<F, Fut>(&self, body: F) -> Result<Coroutine, SchedulerError>
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.executor.spawn(body)
    }
}
