//! Component lifecycle: nesting, props comparison, shared context, and
//! teardown ordering.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_core::{
    Bindable, Component, ComponentDef, RenderContext, RenderError, Root, StandardHost,
    UpdateOptions, ONCE,
};
use weft_dom::{Namespace, Node};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

#[derive(Clone)]
struct LeafProps {
    text: &'static str,
    renders: Rc<Cell<usize>>,
}

fn leaf(props: &LeafProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    props.renders.set(props.renders.get() + 1);
    ctx.html(&["<em>", "</em>"], vec![props.text.into()])
}

#[derive(Clone)]
struct TreeProps {
    child: ComponentDef<LeafProps>,
    leaf: LeafProps,
}

fn tree(props: &TreeProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let inner = props.child.el(props.leaf.clone());
    ctx.html(&["<section>", "</section>"], vec![inner])
}

#[test]
fn nested_components_render_in_the_same_frame() {
    let renders = Rc::new(Cell::new(0));
    let leaf_def = Component::new("leaf", leaf);
    let tree_def = Component::new("tree", tree);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        tree_def.el(TreeProps {
            child: leaf_def,
            leaf: LeafProps {
                text: "deep",
                renders: renders.clone(),
            },
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("<section><em>deep</em>"));
    assert_eq!(renders.get(), 1);
}

#[test]
fn memo_components_skip_when_props_compare_equal() {
    let renders = Rc::new(Cell::new(0));
    let leaf_def = Component::memo("leaf", leaf, |a, b| a.text == b.text);
    let tree_def = Component::new("tree", tree);
    let host = StandardHost::new();
    let container = container();
    let props = TreeProps {
        child: leaf_def,
        leaf: LeafProps {
            text: "same",
            renders: renders.clone(),
        },
    };
    let root = Root::with_host(tree_def.el(props.clone()), &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(renders.get(), 1);

    // parent re-renders; the child's props still compare equal
    root.update(tree_def.el(props.clone()), &UpdateOptions::immediate());
    assert_eq!(renders.get(), 1, "memoized child skipped");

    let mut changed = props;
    changed.leaf.text = "new";
    root.update(tree_def.el(changed), &UpdateOptions::immediate());
    assert_eq!(renders.get(), 2);
    assert!(container.inner_html().contains("new"));
}

#[derive(Clone)]
struct Theme(&'static str);

#[derive(Clone)]
struct ProviderProps {
    child: ComponentDef<ConsumerProps>,
    consumer: ConsumerProps,
}

#[derive(Clone)]
struct ConsumerProps {
    fallback: &'static str,
}

fn provider(props: &ProviderProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    ctx.set_shared_context(Theme("dark"));
    let inner = props.child.el(props.consumer.clone());
    ctx.html(&["<div>", "</div>"], vec![inner])
}

fn consumer(props: &ConsumerProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let theme = ctx
        .get_shared_context::<Theme>()
        .map(|t| t.0)
        .unwrap_or(props.fallback);
    ctx.html(&["<span>", "</span>"], vec![theme.into()])
}

#[test]
fn shared_context_flows_down_the_scope_chain() {
    let provider_def = Component::new("provider", provider);
    let consumer_def = Component::new("consumer", consumer);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        provider_def.el(ProviderProps {
            child: consumer_def,
            consumer: ConsumerProps { fallback: "none" },
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("<span>dark</span>"));
}

#[test]
fn shared_context_is_invisible_to_siblings_outside_the_chain() {
    let consumer_def = Component::new("consumer", consumer);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        consumer_def.el(ConsumerProps { fallback: "none" }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("<span>none</span>"));
}

#[derive(Clone)]
struct CleanupProps {
    log: Rc<RefCell<Vec<&'static str>>>,
    label: &'static str,
    child: Option<(ComponentDef<CleanupProps>, Box<CleanupProps>)>,
}

fn cleanup_logger(props: &CleanupProps, ctx: &mut RenderContext) -> Result<Bindable, RenderError> {
    let log = props.log.clone();
    let label = props.label;
    ctx.use_effect(ONCE, move || {
        Some(Box::new(move || log.borrow_mut().push(label)))
    })?;
    match &props.child {
        Some((def, child_props)) => {
            let inner = def.el((**child_props).clone());
            ctx.html(&["<div>", "</div>"], vec![inner])
        }
        None => ctx.html(&["<div>leaf</div>"], vec![]),
    }
}

#[test]
fn unmount_runs_cleanups_child_before_parent() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let def = Component::new("cleanup-logger", cleanup_logger);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(CleanupProps {
            log: log.clone(),
            label: "parent",
            child: Some((
                def.clone(),
                Box::new(CleanupProps {
                    log: log.clone(),
                    label: "child",
                    child: None,
                }),
            )),
        }),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    assert!(log.borrow().is_empty());

    root.unmount(&UpdateOptions::immediate());
    assert_eq!(*log.borrow(), vec!["child", "parent"]);
    assert_eq!(container.inner_html(), "");
}

#[test]
fn swapping_root_content_disposes_the_old_tree() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let def = Component::new("cleanup-logger", cleanup_logger);
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        def.el(CleanupProps {
            log: log.clone(),
            label: "old",
            child: None,
        }),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());

    root.update(
        weft_core::html(host.as_ref(), &["<p>replacement</p>"], vec![]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(*log.borrow(), vec!["old"]);
    assert!(container.inner_html().contains("<p>replacement</p>"));
    assert!(!container.inner_html().contains("leaf"));
}
