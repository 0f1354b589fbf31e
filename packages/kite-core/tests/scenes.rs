use kite_core::{
    App, AppConfig, AppError, Component, Context, Lifecycle, QuitAfter, Scene, Service,
};
use kite_scheduler::Coroutine;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct Paddle {
    updates: u32,
}

impl Component for Paddle {
    fn update(&mut self, _cx: &Context) -> anyhow::Result<()> {
        self.updates += 1;
        Ok(())
    }
}

struct Ball {
    speed: f32,
}

impl Component for Ball {}

/// Fades in over three frames when started; `start` returns immediately.
struct FadeIn {
    alpha: Rc<Cell<u32>>,
}

impl Component for FadeIn {
    fn start(&mut self, _cx: &Context) -> anyhow::Result<Lifecycle> {
        let alpha = self.alpha.clone();
        Ok(Coroutine::from_future(move |y| async move {
            for _ in 0..3 {
                y.next_frame().await;
                alpha.set(alpha.get() + 1);
            }
        })
        .into())
    }
}

#[test]
fn test_queries_by_type() {
    let mut scene = Scene::new("court")
        .with_component(Paddle::default())
        .with_component(Ball { speed: 2.0 })
        .with_component(Paddle::default());

    assert_eq!(scene.len(), 3);
    assert!(scene.has::<Ball>());
    assert_eq!(scene.components_of::<Paddle>().len(), 2);
    assert_eq!(scene.get::<Ball>().map(|ball| ball.speed), Some(2.0));

    scene.get_mut::<Ball>().unwrap().speed = 4.0;
    assert_eq!(scene.get::<Ball>().unwrap().speed, 4.0);

    scene.remove_of::<Ball>().unwrap();
    assert!(!scene.has::<Ball>());
    assert!(matches!(
        scene.remove_of::<Ball>(),
        Err(AppError::ComponentNotFound(_))
    ));

    scene.clear();
    assert!(scene.is_empty());
}

#[test]
fn test_remove_by_id() {
    let mut scene = Scene::default();
    let paddle = scene.insert(Box::new(Paddle::default()));
    let ball = scene.insert(Box::new(Ball { speed: 1.0 }));

    let removed = scene.remove(paddle).unwrap();
    assert!((*removed).as_any().downcast_ref::<Paddle>().is_some());
    assert!(!scene.contains(paddle));
    assert_eq!(scene.ids(), &[ball]);
    assert!(scene.remove(paddle).is_err());
}

#[test]
fn test_components_update_in_insertion_order() {
    let log = Rc::new(RefCell::new(Vec::new()));

    struct Named(&'static str, Rc<RefCell<Vec<&'static str>>>);
    impl Component for Named {
        fn update(&mut self, _cx: &Context) -> anyhow::Result<()> {
            self.1.borrow_mut().push(self.0);
            Ok(())
        }
    }

    let cx = Context::new(AppConfig::default());
    let mut scene = Scene::from_components(
        "ordered",
        ["a", "b", "c"]
            .into_iter()
            .map(|name| Box::new(Named(name, log.clone())) as Box<dyn Component>),
    );
    scene.start(&cx).unwrap();
    scene.update(&cx).unwrap();
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn test_component_added_to_running_scene_starts() {
    let cx = Context::new(AppConfig::default());
    let alpha = Rc::new(Cell::new(0));

    let mut scene = Scene::new("late");
    scene.add_component(&cx, FadeIn { alpha: alpha.clone() }).unwrap();
    assert!(cx.executor().is_empty());

    scene.start(&cx).unwrap();
    assert!(scene.is_running());
    assert_eq!(cx.executor().len(), 1);

    scene.add_component(&cx, FadeIn { alpha: alpha.clone() }).unwrap();
    assert_eq!(cx.executor().len(), 2);
}

#[test]
fn test_start_coroutine_is_not_awaited() {
    let alpha = Rc::new(Cell::new(0));
    let setup_alpha = Rc::new(Cell::new(None));

    let mut app = App::default().with_events(QuitAfter::new(5));
    app.add_component(FadeIn { alpha: alpha.clone() }).unwrap();

    let (a, seen) = (alpha.clone(), setup_alpha.clone());
    app.setup.add(move |_| {
        seen.set(Some(a.get()));
        Ok(())
    });

    app.run().unwrap();
    // Setup ran before the fade had progressed at all.
    assert_eq!(setup_alpha.get(), Some(0));
    assert_eq!(alpha.get(), 3);
    assert!(app.context().executor().is_empty());
}

struct Farewell {
    said: Rc<Cell<bool>>,
}

impl Component for Farewell {
    fn stop(&mut self, _cx: &Context) -> anyhow::Result<Lifecycle> {
        let said = self.said.clone();
        Ok(Lifecycle::Spawn(Coroutine::from_future(move |y| async move {
            y.next_frame().await;
            said.set(true);
        })))
    }
}

#[test]
fn test_stop_coroutine_may_never_finish() {
    let said = Rc::new(Cell::new(false));
    let mut app = App::default().with_events(QuitAfter::new(2));
    app.add_component(Farewell { said: said.clone() }).unwrap();

    app.run().unwrap();
    // The loop is over, so nothing resumes the coroutine.
    assert!(!said.get());
    assert_eq!(app.context().executor().len(), 1);
}

#[test]
fn test_scene_registry() {
    let mut app = App::default().with_events(QuitAfter::new(1));
    let main = app.default_scene().unwrap();
    let hud = app.add_scene(Scene::new("hud").with_component(Paddle::default())).unwrap();

    let names: Vec<_> = app.scenes().map(|(_, scene)| scene.name().to_string()).collect();
    assert_eq!(names, vec!["default", "hud"]);

    app.run().unwrap();
    assert_eq!(app.scene(hud).unwrap().get::<Paddle>().unwrap().updates, 1);
    assert!(!app.scene(hud).unwrap().is_running());

    let removed = app.remove_scene(main).unwrap();
    assert_eq!(removed.name(), "default");
    assert!(app.default_scene().is_none());
    assert!(matches!(app.remove_scene(main), Err(AppError::SceneNotFound(id)) if id == main));
}

#[test]
fn test_sceneless_app() {
    let mut app = App::new(AppConfig::default().with_sceneless(true));
    assert!(app.default_scene().is_none());
    assert_eq!(app.scenes().count(), 0);
    assert!(matches!(
        app.add_component(Ball { speed: 0.0 }),
        Err(AppError::NoDefaultScene)
    ));
}

#[derive(Default)]
struct Score {
    points: u32,
}

impl Service for Score {
    fn update(&mut self, _cx: &Context) -> anyhow::Result<()> {
        self.points += 10;
        Ok(())
    }
}

struct Audio;

impl Service for Audio {}

#[test]
fn test_service_registry() {
    let mut app = App::default().with_events(QuitAfter::new(3));
    app.add_service(Score::default()).unwrap();
    app.add_service(Audio).unwrap();
    assert_eq!(app.service_count(), 2);
    assert!(app.has_service::<Audio>());

    app.run().unwrap();
    assert_eq!(app.get_service::<Score>().unwrap().points, 30);

    app.get_service_mut::<Score>().unwrap().points = 0;
    assert_eq!(app.get_service::<Score>().unwrap().points, 0);

    app.remove_service::<Audio>().unwrap();
    assert!(!app.has_service::<Audio>());
    assert!(matches!(
        app.remove_service::<Audio>(),
        Err(AppError::ServiceNotFound(_))
    ));
}

#[test]
fn test_app_from_json() {
    let app = App::from_json(r#"{ "name": "pong", "sceneless": true }"#).unwrap();
    assert_eq!(app.config().name, "pong");
    assert!(app.default_scene().is_none());

    assert!(matches!(App::from_json("{"), Err(AppError::Config(_))));
}
