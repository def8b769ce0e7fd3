use spark_view::{
    array, cloned, computed, configure, next_tick, object, observe, reset_config, run_ticks, watch, Error, Object,
    Value, WatchOptions, WatchSource, Watcher, WatcherOptions,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn observed(state: Object) -> Object {
    observe(&Value::from(state.clone()));
    state
}

/// A render-style watcher that counts its evaluations.
fn counting(runs: &Rc<Cell<u32>>, mut read: impl FnMut() -> Value + 'static) -> Watcher {
    let runs = runs.clone();
    Watcher::new(
        Box::new(move || {
            runs.set(runs.get() + 1);
            Ok(read())
        }),
        None,
        WatcherOptions::render(),
    )
}

// =============================================================================
// COALESCING
// =============================================================================

#[test]
fn many_writes_one_run() {
    let state = observed(object! { "a" => 0, "b" => 0 });
    let runs = Rc::new(Cell::new(0));
    let _w = counting(&runs, cloned!(state => move || {
        Value::from(state.get("a").as_f64().unwrap_or(0.0) + state.get("b").as_f64().unwrap_or(0.0))
    }));
    assert_eq!(runs.get(), 1);

    for i in 1..=10 {
        state.set("a", i);
        state.set("b", i * 2);
    }
    run_ticks();
    assert_eq!(runs.get(), 2);
}

#[test]
fn unchanged_write_does_not_schedule() {
    let state = observed(object! { "x" => f64::NAN, "s" => "same" });
    let runs = Rc::new(Cell::new(0));
    let _w = counting(&runs, cloned!(state => move || {
        state.get("x");
        state.get("s")
    }));

    state.set("x", f64::NAN);
    state.set("s", "same");
    run_ticks();
    assert_eq!(runs.get(), 1);
}

#[test]
fn array_mutator_notifies_once() {
    let list = array![3, 1, 2];
    let state = observed(object! { "list" => list.clone() });
    let runs = Rc::new(Cell::new(0));
    let _w = counting(&runs, cloned!(state => move || {
        Value::from(state.get("list").as_array().map(|a| a.len()).unwrap_or(0))
    }));

    list.sort_by(|a, b| a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(std::cmp::Ordering::Equal));
    run_ticks();
    assert_eq!(runs.get(), 2);
    assert_eq!(list.to_vec(), vec![Value::from(1), Value::from(2), Value::from(3)]);

    list.splice(0, 1, vec![Value::from(9), Value::from(8)]);
    run_ticks();
    assert_eq!(runs.get(), 3);
}

// =============================================================================
// DEPENDENCY SETS
// =============================================================================

#[test]
fn dropped_branch_stops_notifying() {
    let state = observed(object! { "flag" => true, "a" => 1, "b" => 2 });
    let runs = Rc::new(Cell::new(0));
    let _w = counting(&runs, cloned!(state => move || {
        if state.get("flag").truthy() { state.get("a") } else { state.get("b") }
    }));

    state.set("flag", false);
    run_ticks();
    assert_eq!(runs.get(), 2);

    state.set("a", 100);
    run_ticks();
    assert_eq!(runs.get(), 2);

    state.set("b", 200);
    run_ticks();
    assert_eq!(runs.get(), 3);
}

#[test]
fn added_key_reaches_key_readers() {
    let state = observed(object! { "a" => 1 });
    let computed_keys = computed(cloned!(state => move || state.keys().len()));
    assert_eq!(computed_keys.get(), Value::from(1));

    spark_view::set(&Value::from(state.clone()), "b", 2);
    assert!(computed_keys.is_dirty());
    assert_eq!(computed_keys.get(), Value::from(2));
}

// =============================================================================
// ORDERING & CYCLES
// =============================================================================

#[test]
fn queued_watchers_run_in_creation_order() {
    let state = observed(object! { "n" => 0 });
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut watchers = Vec::new();
    for label in ["first", "second", "third"] {
        let order = order.clone();
        let state = state.clone();
        watchers.push(Watcher::new(
            Box::new(move || {
                order.borrow_mut().push(label);
                Ok(state.get("n"))
            }),
            None,
            WatcherOptions::default(),
        ));
    }
    order.borrow_mut().clear();

    state.set("n", 1);
    run_ticks();
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn tick_callbacks_see_flushed_state() {
    let state = observed(object! { "n" => 1 });
    let rendered = Rc::new(RefCell::new(Value::Null));
    let _w = Watcher::new(
        Box::new(cloned!(state, rendered => move || {
            let n = state.get("n");
            *rendered.borrow_mut() = n.clone();
            Ok(n)
        })),
        None,
        WatcherOptions::render(),
    );

    let seen = Rc::new(RefCell::new(Value::Null));
    state.set("n", 5);
    next_tick(cloned!(seen, rendered => move || *seen.borrow_mut() = rendered.borrow().clone()));
    run_ticks();
    assert_eq!(*seen.borrow(), Value::from(5));
}

#[test]
fn self_feeding_watcher_is_cut_off() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    configure(|cfg| {
        cfg.max_update_count = 5;
        cfg.error_handler = Some(Rc::new(move |e: &Error, _: &str| sink.borrow_mut().push(e.clone())));
    });

    let state = observed(object! { "n" => 0 });
    let _stop = watch(
        WatchSource::path(&state, "n"),
        cloned!(state => move |new: &Value, _: &Value| {
            state.set("n", new.as_i64().unwrap_or(0) + 1);
        }),
        WatchOptions::default(),
    );

    state.set("n", 1);
    run_ticks();

    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], Error::InfiniteUpdateLoop { .. }));
    reset_config();
}
