use kite_scheduler::{
    Coroutine, CoroutineState, Executor, ManualClock, SchedulerError, WaitFor, WaitKind, Yield,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

fn setup() -> (Rc<ManualClock>, Executor) {
    let clock = Rc::new(ManualClock::new());
    let executor = Executor::new(clock.clone());
    (clock, executor)
}

/// Advances the clock one frame and ticks, like a single frame loop iteration.
fn frame(clock: &ManualClock, executor: &Executor) -> usize {
    clock.advance_frame();
    executor.tick().unwrap()
}

fn counter(count: Rc<Cell<u32>>, wait: impl Fn() -> Yield + 'static) -> Coroutine {
    Coroutine::new(move || -> anyhow::Result<CoroutineState> {
        count.set(count.get() + 1);
        Ok(CoroutineState::Yielded(wait()))
    })
}

#[test]
fn test_start_runs_first_step() {
    let (_clock, executor) = setup();
    let count = Rc::new(Cell::new(0));

    let co = executor
        .start(counter(count.clone(), || WaitFor::next_frame().into()))
        .unwrap();

    assert_eq!(count.get(), 1);
    assert!(executor.is_active(&co));
    assert_eq!(executor.len(), 1);
}

#[test]
fn test_frame_quantization() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || WaitFor::frames(1).into()))
        .unwrap();
    count.set(0);

    for k in 1..=25 {
        assert_eq!(frame(&clock, &executor), 1);
        assert_eq!(count.get(), k);
    }

    // Ticking without a new frame resumes nothing.
    assert_eq!(executor.tick().unwrap(), 0);
    assert_eq!(count.get(), 25);
}

#[test]
fn test_yielding_nothing_waits_one_frame() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor.start(counter(count.clone(), || ().into())).unwrap();

    frame(&clock, &executor);
    frame(&clock, &executor);
    assert_eq!(count.get(), 3);
}

#[test]
fn test_zero_frames_never_ready_on_same_tick() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || WaitFor::frames(0).into()))
        .unwrap();

    assert_eq!(executor.tick().unwrap(), 0);
    assert_eq!(count.get(), 1);
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);
}

#[test]
fn test_multi_frame_wait() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || WaitFor::frames(3).into()))
        .unwrap();

    frame(&clock, &executor);
    frame(&clock, &executor);
    assert_eq!(count.get(), 1);
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);
}

#[test]
fn test_seconds_wait() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || WaitFor::seconds(2.0).into()))
        .unwrap();

    for _ in 0..100 {
        clock.advance(Duration::from_millis(10));
        frame(&clock, &executor);
    }
    assert_eq!(count.get(), 1);

    clock.advance(Duration::from_millis(990));
    frame(&clock, &executor);
    assert_eq!(count.get(), 1);

    // First tick at or after the deadline.
    clock.advance(Duration::from_millis(10));
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);
}

#[test]
fn test_predicate_waits() {
    let (clock, executor) = setup();
    let gate = Rc::new(Cell::new(false));
    let count = Rc::new(Cell::new(0));

    let g = gate.clone();
    executor
        .start(counter(count.clone(), move || {
            let g = g.clone();
            WaitFor::until(move || g.get()).into()
        }))
        .unwrap();

    frame(&clock, &executor);
    frame(&clock, &executor);
    assert_eq!(count.get(), 1);

    gate.set(true);
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);

    // Still open, so every tick resumes it once.
    frame(&clock, &executor);
    assert_eq!(count.get(), 3);
}

#[test]
fn test_factory_yield_is_built_after_step() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || {
            Yield::Factory(Box::new(|| WaitFor::frames(2)))
        }))
        .unwrap();

    frame(&clock, &executor);
    assert_eq!(count.get(), 1);
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);
}

#[test]
fn test_bare_kind_yield() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    executor
        .start(counter(count.clone(), || WaitKind::Frames.into()))
        .unwrap();
    frame(&clock, &executor);
    assert_eq!(count.get(), 2);

    let err = executor
        .start(counter(Rc::new(Cell::new(0)), || WaitKind::Seconds.into()))
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::InvalidYield {
            kind: WaitKind::Seconds,
            ..
        }
    ));
    assert_eq!(executor.len(), 1);
}

#[test]
fn test_invalid_yield_during_tick() {
    let (clock, executor) = setup();
    let steps = Rc::new(Cell::new(0));
    let s = steps.clone();
    let co = executor
        .start(Coroutine::new(move || -> anyhow::Result<CoroutineState> {
            s.set(s.get() + 1);
            if s.get() == 1 {
                Ok(CoroutineState::next_frame())
            } else {
                Ok(CoroutineState::wait(WaitKind::Until))
            }
        }))
        .unwrap();

    clock.advance_frame();
    let err = executor.tick().unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidYield { id, .. } if id == co.id()));
    assert!(!executor.is_active(&co));
}

#[test]
fn test_duplicate_start() {
    let (_clock, executor) = setup();
    let co = counter(Rc::new(Cell::new(0)), || ().into());

    executor.start(co.clone()).unwrap();
    let err = executor.start(co.clone()).unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateCoroutine(id) if id == co.id()));
    assert_eq!(executor.len(), 1);
}

#[test]
fn test_start_with_calls_factory_once() {
    let (clock, executor) = setup();
    let built = Rc::new(Cell::new(0));
    let count = Rc::new(Cell::new(0));

    let (b, c) = (built.clone(), count.clone());
    let co = executor
        .start_with(move || {
            b.set(b.get() + 1);
            counter(c, || WaitFor::next_frame().into())
        })
        .unwrap();

    assert_eq!(built.get(), 1);
    assert_eq!(count.get(), 1);
    assert!(executor.is_active(&co));

    frame(&clock, &executor);
    assert_eq!(built.get(), 1);
    assert_eq!(count.get(), 2);

    let err = executor.start_with(|| co.clone()).unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateCoroutine(id) if id == co.id()));
    assert_eq!(count.get(), 2);
    assert_eq!(executor.len(), 1);
}

#[test]
fn test_completed_coroutine_is_untracked() {
    let (clock, executor) = setup();
    let steps = Rc::new(Cell::new(0));
    let s = steps.clone();
    let co = executor
        .start(Coroutine::new(move || -> anyhow::Result<CoroutineState> {
            s.set(s.get() + 1);
            if s.get() < 3 {
                Ok(CoroutineState::next_frame())
            } else {
                Ok(CoroutineState::Complete)
            }
        }))
        .unwrap();

    frame(&clock, &executor);
    assert!(executor.is_active(&co));
    frame(&clock, &executor);
    assert!(!executor.is_active(&co));
    assert!(executor.is_empty());
    assert!(co.is_finished());

    frame(&clock, &executor);
    assert_eq!(steps.get(), 3);
}

#[test]
fn test_completes_on_first_step() {
    let (_clock, executor) = setup();
    let co = executor
        .spawn(|_| async {})
        .unwrap();
    assert!(co.is_finished());
    assert!(executor.is_empty());

    // Restarting a finished coroutine completes immediately again.
    executor.start(co.clone()).unwrap();
    assert!(executor.is_empty());
}

#[test]
fn test_stop() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    let co = executor
        .start(counter(count.clone(), || ().into()))
        .unwrap();

    executor.stop(&co).unwrap();
    frame(&clock, &executor);
    assert_eq!(count.get(), 1);

    let err = executor.stop(&co).unwrap_err();
    assert!(matches!(err, SchedulerError::CoroutineNotFound(id) if id == co.id()));
}

#[test]
fn test_stop_all() {
    let (clock, executor) = setup();
    let count = Rc::new(Cell::new(0));
    for _ in 0..4 {
        executor.start(counter(count.clone(), || ().into())).unwrap();
    }
    assert_eq!(executor.len(), 4);

    executor.stop_all();
    assert!(executor.is_empty());
    assert_eq!(frame(&clock, &executor), 0);
    assert_eq!(count.get(), 4);
}

#[test]
fn test_resumes_in_start_order() {
    let (clock, executor) = setup();
    let log = Rc::new(std::cell::RefCell::new(Vec::new()));

    let mut handles = Vec::new();
    for name in ["a", "b", "c"] {
        let log = log.clone();
        handles.push(
            executor
                .start(Coroutine::new(move || -> anyhow::Result<CoroutineState> {
                    log.borrow_mut().push(name);
                    Ok(CoroutineState::next_frame())
                }))
                .unwrap(),
        );
    }
    log.borrow_mut().clear();

    frame(&clock, &executor);
    assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    assert_eq!(executor.active(), handles);
}
