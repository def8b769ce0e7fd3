use spark_view::{
    array, cloned, configure, mount, object, observe, reset_config, run_ticks, Component, Error,
    FnComponent, MemoryBackend, MountTarget, NodeId, Object, Patcher, Scope, VNode, Value,
};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

/// `RUST_LOG=spark_view=trace cargo test` shows the backend op log.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn host(backend: &Rc<MemoryBackend>) -> NodeId {
    use spark_view::Backend;
    backend.create_element("body")
}

fn capture_errors() -> Rc<RefCell<Vec<Error>>> {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    configure(|cfg| {
        cfg.error_handler = Some(Rc::new(move |e: &Error, _: &str| sink.borrow_mut().push(e.clone())))
    });
    errors
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn text_follows_written_field() {
    let state = object! { "a" => 1 };
    observe(&Value::from(state.clone()));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let app = mount(
        FnComponent::new("text", cloned!(state => move |_: &Scope| {
            Ok(VNode::element("p").child(VNode::text(state.get("a").to_string())))
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );
    assert_eq!(backend.to_html(body), "<body><p>1</p></body>");

    state.set("a", 2);
    run_ticks();
    assert_eq!(backend.to_html(body), "<body><p>2</p></body>");
    assert!(app.is_mounted());
}

#[test]
fn reversed_keyed_list_reuses_nodes() {
    init_tracing();
    let items = array![object! { "id" => 1 }, object! { "id" => 2 }, object! { "id" => 3 }];
    let state = object! { "items" => items.clone() };
    observe(&Value::from(state.clone()));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let app = mount(
        FnComponent::new("list", cloned!(state => move |_: &Scope| {
            let rows = state
                .get("items")
                .as_array()
                .map(|a| a.to_vec())
                .unwrap_or_default()
                .into_iter()
                .map(|item| {
                    let id = item.as_object().map(|o| o.get("id")).unwrap_or_default();
                    VNode::element("li")
                        .key(id.as_i64().unwrap_or(0))
                        .text_content(id.to_string())
                });
            Ok(VNode::element("ul").children(rows))
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );

    let ul = app.root().unwrap();
    let before = backend.children(ul);
    backend.clear_ops();

    items.reverse();
    run_ticks();

    assert_eq!(backend.created_count(), 0);
    assert_eq!(backend.to_html(ul), "<ul><li>3</li><li>2</li><li>1</li></ul>");
    let mut after = backend.children(ul);
    after.reverse();
    assert_eq!(after, before);
}

#[test]
fn failed_rerender_keeps_first_output() {
    let errors = capture_errors();
    let state = object! { "n" => 1 };
    observe(&Value::from(state.clone()));
    let runs = Rc::new(Cell::new(0));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let _app = mount(
        FnComponent::new("flaky", cloned!(state, runs => move |_: &Scope| {
            runs.set(runs.get() + 1);
            let n = state.get("n");
            if runs.get() == 2 {
                return Err(Error::msg("second run fails"));
            }
            Ok(VNode::element("em").text_content(n.to_string()))
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );

    state.set("n", 2);
    run_ticks();

    assert_eq!(runs.get(), 2);
    assert_eq!(backend.to_html(body), "<body><em>1</em></body>");
    assert_eq!(errors.borrow().len(), 1);
    assert!(matches!(&errors.borrow()[0], Error::Render { component, .. } if component == "flaky"));
    reset_config();
}

#[test]
fn two_writes_in_one_burst_render_once() {
    let state = object! { "first" => "Ada", "last" => "Lovelace" };
    observe(&Value::from(state.clone()));
    let renders = Rc::new(Cell::new(0));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let app = mount(
        FnComponent::new("name", cloned!(state, renders => move |_: &Scope| {
            renders.set(renders.get() + 1);
            Ok(VNode::element("h1").text_content(format!("{} {}", state.get("first"), state.get("last"))))
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );

    let button = {
        use spark_view::Backend;
        let button = backend.create_element("button");
        let s = state.clone();
        backend.add_event_listener(
            button,
            "click",
            Rc::new(move |_: &spark_view::Event| {
                s.set("first", "Grace");
                s.set("last", "Hopper");
            }),
        );
        button
    };
    backend.dispatch_event(button, "click", Value::Null);
    run_ticks();

    assert_eq!(renders.get(), 2);
    assert_eq!(backend.to_html(app.root().unwrap()), "<h1>Grace Hopper</h1>");
}

// =============================================================================
// CHILD COMPONENTS
// =============================================================================

fn label_child(log: Rc<RefCell<Vec<String>>>, own: Object) -> Rc<dyn Component> {
    FnComponent::new("label", move |scope: &Scope| {
        log.borrow_mut().push("child".into());
        Ok(VNode::element("span").text_content(format!("{}{}", scope.prop("text"), scope.get("suffix"))))
    })
    .with_data(move || own.clone())
    .build()
}

#[test]
fn parent_flushes_before_child_and_props_flow_down() {
    init_tracing();
    let log = Rc::new(RefCell::new(Vec::new()));
    let child_state = object! { "suffix" => "!" };
    let child = label_child(log.clone(), child_state.clone());
    let parent_state = object! { "text" => "hi" };
    observe(&Value::from(parent_state.clone()));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let _app = mount(
        FnComponent::new("parent", cloned!(log, parent_state => move |_: &Scope| {
            log.borrow_mut().push("parent".into());
            Ok(VNode::element("div").child(
                VNode::component(child.clone()).prop("text", parent_state.get("text")),
            ))
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );
    assert_eq!(backend.to_html(body), "<body><div><span>hi!</span></div></body>");
    log.borrow_mut().clear();

    // Child's own state written first; the parent still runs first
    child_state.set("suffix", "?");
    parent_state.set("text", "yo");
    run_ticks();

    assert_eq!(*log.borrow(), vec!["parent".to_string(), "child".to_string()]);
    assert_eq!(backend.to_html(body), "<body><div><span>yo?</span></div></body>");
}

#[test]
fn removed_placeholder_destroys_child() {
    let destroyed = Rc::new(Cell::new(0));
    let mounted = Rc::new(Cell::new(0));
    let child = FnComponent::new("leaf", |_: &Scope| Ok(VNode::element("b")))
        .on_mounted(cloned!(mounted => move |_: &Scope| mounted.set(mounted.get() + 1)))
        .on_destroyed(cloned!(destroyed => move |_: &Scope| destroyed.set(destroyed.get() + 1)))
        .build();
    let state = object! { "show" => true };
    observe(&Value::from(state.clone()));

    let backend = MemoryBackend::new();
    let body = host(&backend);
    let _app = mount(
        FnComponent::new("toggle", cloned!(state => move |_: &Scope| {
            let mut root = VNode::element("section");
            if state.get("show").truthy() {
                root = root.child(VNode::component(child.clone()));
            }
            Ok(root)
        }))
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );
    assert_eq!(mounted.get(), 1);
    assert_eq!(backend.to_html(body), "<body><section><b></b></section></body>");

    state.set("show", false);
    run_ticks();
    assert_eq!(destroyed.get(), 1);
    assert_eq!(backend.to_html(body), "<body><section></section></body>");
}

#[test]
fn root_props_are_shallow_reactive() {
    let backend = MemoryBackend::new();
    let body = host(&backend);
    let mut props = BTreeMap::new();
    props.insert(Rc::from("title"), Value::from("one"));

    let app = spark_view::mount_with_props(
        FnComponent::new("titled", |scope: &Scope| Ok(VNode::element("h2").text_content(scope.prop("title").to_string())))
            .build(),
        &props,
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );

    props.insert(Rc::from("title"), Value::from("two"));
    app.set_props(&props);
    run_ticks();
    assert_eq!(backend.to_html(body), "<body><h2>two</h2></body>");
}

// =============================================================================
// HYDRATION & BACKEND FAILURES
// =============================================================================

#[test]
fn hydration_mismatch_rebuilds_root() {
    init_tracing();
    use spark_view::Backend;
    let errors = capture_errors();
    let backend = MemoryBackend::new();
    let body = host(&backend);
    let stale = backend.create_text_node("stale");
    let server = backend.build_element("article", &[], &[stale]);
    backend.append_child(body, server);

    let app = mount(
        FnComponent::new("page", |_: &Scope| Ok(VNode::element("main").text_content("fresh"))).build(),
        &Patcher::new(backend.clone()),
        MountTarget::Hydrate(server),
    );

    assert!(matches!(&errors.borrow()[0], Error::HydrationMismatch { .. }));
    assert_eq!(backend.to_html(body), "<body><main>fresh</main></body>");
    assert_ne!(app.root(), Some(server));
    reset_config();
}

#[test]
fn rejected_attribute_does_not_abort_render() {
    let errors = capture_errors();
    let backend = MemoryBackend::new();
    backend.reject_attribute("data-bad");
    let body = host(&backend);

    let _app = mount(
        FnComponent::new("attrs", |_: &Scope| {
            Ok(VNode::element("div")
                .attr("data-bad", "1")
                .attr("id", "ok")
                .child(VNode::text("still here")))
        })
        .build(),
        &Patcher::new(backend.clone()),
        MountTarget::AppendTo(body),
    );

    assert_eq!(errors.borrow().len(), 1);
    assert!(matches!(&errors.borrow()[0], Error::Backend(_)));
    assert_eq!(backend.to_html(body), "<body><div id=\"ok\">still here</div></body>");
    reset_config();
}
