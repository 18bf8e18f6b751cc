//! The hook state machine: positional cells, state batching, memoization,
//! effects, and hook-order violations.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_core::{
    Bindable, Component, EventHandler, RenderContext, RenderError, Root, RuntimeEvent,
    StandardHost, SubscribeFn, UpdateOptions, ONCE,
};
use weft_dom::{Event, Namespace, Node};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

fn find_button(container: &Node) -> Node {
    fn search(node: &Node) -> Option<Node> {
        if node.tag_name().as_deref() == Some("button") {
            return Some(node.clone());
        }
        node.children().iter().find_map(search)
    }
    search(container).expect("a button was mounted")
}

#[derive(Clone)]
struct CounterProps {
    step: i64,
    renders: Rc<Cell<usize>>,
}

fn counter(props: &CounterProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    let (count, set_count, _) = ctx.use_state(|| 0i64)?;
    let step = props.step;
    let on_click = EventHandler::new({
        let set_count = set_count.clone();
        move |_event: &Event| set_count.set(count + step)
    });
    ctx.html(
        &["<button @click=", ">", "</button>"],
        vec![on_click.into(), count.into()],
    )
}

#[test]
fn state_updates_rerender_the_component() {
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("counter", counter);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(CounterProps {
            step: 1,
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains(">0</button>"));
    assert_eq!(renders.get(), 1);

    find_button(&container).dispatch_event(&Event::new("click"));
    root.flush();
    assert!(container.inner_html().contains(">1</button>"));
    assert_eq!(renders.get(), 2);
}

fn reducer_counter(
    props: &CounterProps,
    ctx: &mut RenderContext,
) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    let (count, dispatch, _) =
        ctx.use_reducer(|state: &i64, delta: i64| state + delta, || 0i64)?;
    let step = props.step;
    let on_click = EventHandler::new({
        let dispatch = dispatch.clone();
        move |_event: &Event| dispatch.dispatch(step)
    });
    ctx.html(
        &["<button @click=", ">", "</button>"],
        vec![on_click.into(), count.into()],
    )
}

#[test]
fn reducer_dispatches_batch_into_one_render() {
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("reducer-counter", reducer_counter);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(CounterProps {
            step: 1,
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());

    let button = find_button(&container);
    button.dispatch_event(&Event::new("click"));
    button.dispatch_event(&Event::new("click"));
    root.flush();

    assert!(container.inner_html().contains(">2</button>"));
    assert_eq!(renders.get(), 2, "two dispatches settle in one frame");
}

#[derive(Clone)]
struct MemoProps {
    dep: i64,
    calls: Rc<Cell<usize>>,
}

fn memoized(props: &MemoProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let calls = props.calls.clone();
    let doubled = ctx.use_memo((props.dep,), move || {
        calls.set(calls.get() + 1);
        props.dep * 2
    })?;
    ctx.html(&["<p>", "</p>"], vec![doubled.into()])
}

#[test]
fn memo_recomputes_only_when_deps_change() {
    let calls = Rc::new(Cell::new(0));
    let def = Component::new("memoized", memoized);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(MemoProps {
            dep: 3,
            calls: calls.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("6"));
    assert_eq!(calls.get(), 1);

    // same dep value: memo holds
    root.update(
        def.el(MemoProps {
            dep: 3,
            calls: calls.clone(),
        }),
        &UpdateOptions::immediate(),
    );
    assert_eq!(calls.get(), 1);

    // changed dep: recompute
    root.update(
        def.el(MemoProps {
            dep: 5,
            calls: calls.clone(),
        }),
        &UpdateOptions::immediate(),
    );
    assert!(container.inner_html().contains("10"));
    assert_eq!(calls.get(), 2);
}

#[derive(Clone)]
struct SharedSlotProps {
    seen: Rc<RefCell<Vec<String>>>,
}

fn ref_and_id(props: &SharedSlotProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let stash: Rc<RefCell<i64>> = ctx.use_ref(|| 7)?;
    let id = ctx.use_id()?;
    props
        .seen
        .borrow_mut()
        .push(format!("{:p}:{}", Rc::as_ptr(&stash), id));
    ctx.html(&["<p>x</p>"], vec![])
}

#[test]
fn refs_and_ids_are_stable_across_renders() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let def = Component::new("ref-and-id", ref_and_id);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(SharedSlotProps { seen: seen.clone() }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    root.update(
        def.el(SharedSlotProps { seen: seen.clone() }),
        &UpdateOptions::immediate(),
    );

    let seen = seen.borrow();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1], "same cell, same identifier");
    assert!(seen[0].contains(":w-"));
}

#[derive(Clone)]
struct EffectProps {
    log: Rc<RefCell<Vec<&'static str>>>,
    dep: i64,
}

fn effectful(props: &EffectProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let log = props.log.clone();
    ctx.use_insertion_effect(Some((props.dep,)), {
        let log = log.clone();
        move || {
            log.borrow_mut().push("insertion");
            let log = log.clone();
            Some(Box::new(move || log.borrow_mut().push("insertion-cleanup")))
        }
    })?;
    ctx.use_layout_effect(Some((props.dep,)), {
        let log = log.clone();
        move || {
            log.borrow_mut().push("layout");
            None
        }
    })?;
    ctx.use_effect(Some((props.dep,)), {
        let log = log.clone();
        move || {
            log.borrow_mut().push("passive");
            None
        }
    })?;
    ctx.html(&["<p>x</p>"], vec![])
}

#[test]
fn effect_phases_commit_in_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let def = Component::new("effectful", effectful);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(EffectProps {
            log: log.clone(),
            dep: 0,
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert_eq!(*log.borrow(), vec!["insertion", "layout", "passive"]);
}

#[test]
fn cleanup_commits_before_the_new_callback() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let def = Component::new("effectful", effectful);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(EffectProps {
            log: log.clone(),
            dep: 0,
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    log.borrow_mut().clear();

    root.update(
        def.el(EffectProps {
            log: log.clone(),
            dep: 1,
        }),
        &UpdateOptions::immediate(),
    );
    assert_eq!(
        *log.borrow(),
        vec!["insertion-cleanup", "insertion", "layout", "passive"]
    );
}

#[test]
fn once_deps_run_exactly_once() {
    #[derive(Clone)]
    struct OnceProps {
        runs: Rc<Cell<usize>>,
    }
    fn once_effect(props: &OnceProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
        let runs = props.runs.clone();
        ctx.use_effect(ONCE, move || {
            runs.set(runs.get() + 1);
            None
        })?;
        ctx.html(&["<p>x</p>"], vec![])
    }

    let runs = Rc::new(Cell::new(0));
    let def = Component::new("once-effect", once_effect);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(def.el(OnceProps { runs: runs.clone() }), &container, host);
    root.mount(&UpdateOptions::immediate());
    root.update(def.el(OnceProps { runs: runs.clone() }), &UpdateOptions::immediate());
    root.update(def.el(OnceProps { runs: runs.clone() }), &UpdateOptions::immediate());
    assert_eq!(runs.get(), 1);
}

#[derive(Clone)]
struct FlakyProps {
    renders: Rc<Cell<usize>>,
}

fn conditional_hooks(props: &FlakyProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    let (generation, bump, _) = ctx.use_state(|| 0i64)?;
    if generation > 0 {
        // a second state hook appears only on later renders
        let _ = ctx.use_state(|| 0i64)?;
    }
    let on_click = EventHandler::new({
        let bump = bump.clone();
        move |_event: &Event| bump.set(generation + 1)
    });
    ctx.html(
        &["<button @click=", ">g", "</button>"],
        vec![on_click.into(), generation.into()],
    )
}

#[test]
fn hook_order_violation_rejects_the_frame_and_keeps_the_dom() {
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("conditional-hooks", conditional_hooks);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(FlakyProps {
            renders: renders.clone(),
        }),
        &container,
        host,
    );

    let failures: Rc<RefCell<Vec<RenderError>>> = Rc::new(RefCell::new(Vec::new()));
    let _observer = root.observe({
        let failures = failures.clone();
        move |event| {
            if let RuntimeEvent::FrameFailed { error } = event {
                failures.borrow_mut().push(error.clone());
            }
        }
    });

    root.mount(&UpdateOptions::immediate());
    let before = container.inner_html();
    assert!(before.contains(">g0</button>"));

    find_button(&container).dispatch_event(&Event::new("click"));
    root.flush();

    let failures = failures.borrow();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        RenderError::HookOrderViolation { .. }
    ));
    assert_eq!(container.inner_html(), before, "no DOM effect from the failed frame");
}

#[derive(Clone)]
struct DeferredProps {
    value: String,
    renders: Rc<Cell<usize>>,
}

fn deferred(props: &DeferredProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    let lagging = ctx.use_deferred_value(props.value.clone())?;
    ctx.html(&["<p>", "</p>"], vec![lagging.into()])
}

#[test]
fn deferred_value_lags_by_one_background_update() {
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("deferred", deferred);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(DeferredProps {
            value: "a".to_string(),
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("a"));
    assert_eq!(renders.get(), 1);

    root.update(
        def.el(DeferredProps {
            value: "b".to_string(),
            renders: renders.clone(),
        }),
        &UpdateOptions::immediate(),
    );
    // the prop change renders with the old snapshot, then the background
    // update catches it up
    assert_eq!(renders.get(), 3);
    assert!(container.inner_html().contains("b"));
}

struct MiniStore {
    value: Cell<i64>,
    listeners: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl MiniStore {
    fn set(&self, value: i64) {
        self.value.set(value);
        for listener in self.listeners.borrow().clone() {
            listener();
        }
    }
}

#[derive(Clone)]
struct StoreProps {
    store: Rc<MiniStore>,
    subscribe: SubscribeFn,
}

fn store_reader(props: &StoreProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let store = props.store.clone();
    let snapshot = ctx.use_sync_external_store(&props.subscribe, move || store.value.get())?;
    ctx.html(&["<p>", "</p>"], vec![snapshot.into()])
}

#[test]
fn external_store_subscription_rerenders_on_change() {
    let store = Rc::new(MiniStore {
        value: Cell::new(1),
        listeners: RefCell::new(Vec::new()),
    });
    let subscribe: SubscribeFn = {
        let store = store.clone();
        Rc::new(move |on_change| {
            store.listeners.borrow_mut().push(on_change);
            let store = store.clone();
            Box::new(move || store.listeners.borrow_mut().clear())
        })
    };

    let def = Component::new("store-reader", store_reader);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(StoreProps {
            store: store.clone(),
            subscribe,
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("1"));

    store.set(5);
    root.flush();
    assert!(container.inner_html().contains("5"));
}
