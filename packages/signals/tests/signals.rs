//! The signal contract and its engine integration.

use std::cell::Cell;
use std::rc::Rc;

use weft_core::{
    html, Bindable, Component, RenderContext, RenderError, Root, StandardHost, UpdateOptions,
};
use weft_dom::{Namespace, Node};
use weft_signals::{bind_signal, use_signal, Signal};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

#[test]
fn versions_are_monotone_and_track_change() {
    let signal = Signal::new(1i64);
    assert_eq!(signal.version(), 0);
    signal.set(2);
    assert_eq!(signal.version(), 1);
    signal.update(|v| *v += 1);
    assert_eq!(signal.version(), 2);
    assert_eq!(signal.value(), 3);

    // an equal write keeps the version: the value is unchanged
    signal.set_if_changed(3);
    assert_eq!(signal.version(), 2);
    signal.set_if_changed(4);
    assert_eq!(signal.version(), 3);
}

#[test]
fn subscribers_fire_synchronously_and_unsubscribe_in_o1() {
    let signal = Signal::new(0i64);
    let fired = Rc::new(Cell::new(0));
    let subscription = signal.subscribe(Rc::new({
        let fired = fired.clone();
        move || fired.set(fired.get() + 1)
    }));

    signal.set(1);
    assert_eq!(fired.get(), 1, "notification is synchronous");

    subscription.unsubscribe();
    signal.set(2);
    assert_eq!(fired.get(), 1);
}

#[derive(Clone)]
struct ViewProps {
    signal: Signal<i64>,
    renders: Rc<Cell<usize>>,
}

fn view(props: &ViewProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    let value = use_signal(ctx, &props.signal)?;
    ctx.html(&["<p>", "</p>"], vec![value.into()])
}

#[test]
fn components_rerender_when_a_signal_moves() {
    let signal = Signal::new(0i64);
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("view", view);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(ViewProps {
            signal: signal.clone(),
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("0"));
    assert_eq!(renders.get(), 1);

    signal.set(7);
    root.flush();
    assert!(container.inner_html().contains("7"));
    assert_eq!(renders.get(), 2);
}

#[test]
fn mutations_in_one_tick_coalesce_into_one_render() {
    let signal = Signal::new(0i64);
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("view", view);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(ViewProps {
            signal: signal.clone(),
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert_eq!(renders.get(), 1);

    // 0 → 1 → 0 in the same tick: one render, reading the latest value
    signal.set(1);
    signal.set(0);
    root.flush();
    assert_eq!(renders.get(), 2, "exactly one re-render");
    assert!(container.inner_html().contains("0"));
}

#[test]
fn unchanged_versions_cause_no_rerender() {
    let signal = Signal::new(5i64);
    let renders = Rc::new(Cell::new(0));
    let def = Component::new("view", view);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(ViewProps {
            signal: signal.clone(),
            renders: renders.clone(),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert_eq!(renders.get(), 1);

    signal.set_if_changed(5);
    root.flush();
    assert_eq!(renders.get(), 1, "equal version, no work");
}

#[test]
fn custom_hook_form_reads_like_any_other_hook() {
    #[derive(Clone)]
    struct HookProps {
        signal: Signal<i64>,
    }
    fn hooked(props: &HookProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
        let value = ctx.use_custom(&props.signal)?;
        ctx.html(&["<em>", "</em>"], vec![value.into()])
    }

    let signal = Signal::new(3i64);
    let def = Component::new("hooked", hooked);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(def.el(HookProps { signal }), &container, host);
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("<em>3</em>"));
}

#[test]
fn bound_signals_rerender_their_own_subtree_only() {
    let signal = Signal::new(1i64);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            &["<div><h1>static</h1>", "</div>"],
            vec![bind_signal(&signal)],
        )
        .unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("1"));

    signal.set(2);
    root.flush();
    assert!(container.inner_html().contains("2"));
    assert!(!container.inner_html().contains(">1<"));
}

#[test]
fn rebinding_the_same_signal_keeps_the_binding() {
    let signal = Signal::new(1i64);
    let strings: &'static [&'static str] = &["<div>", "</div>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![bind_signal(&signal)]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());

    // a parent-level update re-creating the same binding is a no-op
    root.update(
        html(host.as_ref(), strings, vec![bind_signal(&signal)]).unwrap(),
        &UpdateOptions::immediate(),
    );
    signal.set(9);
    root.flush();
    assert!(container.inner_html().contains("9"));
}
