//! Event bindings: delegated listener objects, retargeting, and teardown.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_core::{html, Bindable, EventHandler, Root, StandardHost, UpdateOptions};
use weft_dom::{record, Edit, Event, Namespace, Node};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

fn find(container: &Node, tag: &str) -> Node {
    fn search(node: &Node, tag: &str) -> Option<Node> {
        if node.tag_name().as_deref() == Some(tag) {
            return Some(node.clone());
        }
        node.children().iter().find_map(|c| search(c, tag))
    }
    search(container, tag).expect("element present")
}

#[test]
fn handlers_receive_dispatched_events() {
    let strings: &'static [&'static str] = &["<button @click=", ">go</button>"];
    let host = StandardHost::new();
    let container = container();
    let clicks = Rc::new(Cell::new(0));
    let handler = EventHandler::new({
        let clicks = clicks.clone();
        move |_| clicks.set(clicks.get() + 1)
    });
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![handler.into()]).unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());

    find(&container, "button").dispatch_event(&Event::new("click"));
    assert_eq!(clicks.get(), 1);
}

#[test]
fn swapping_handlers_keeps_the_registered_listener() {
    let strings: &'static [&'static str] = &["<button @click=", ">go</button>"];
    let host = StandardHost::new();
    let container = container();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let first = EventHandler::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("first")
    });
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![first.into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let button = find(&container, "button");
    assert_eq!(button.listener_count("click"), 1);

    let second = EventHandler::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("second")
    });
    let (_, edits) = record::capture(|| {
        root.update(
            html(host.as_ref(), strings, vec![second.into()]).unwrap(),
            &UpdateOptions::immediate(),
        );
    });
    // same options: the listener object stays attached, only the callback
    // swaps
    assert!(!edits
        .iter()
        .any(|e| matches!(e, Edit::AttachListener { .. } | Edit::DetachListener { .. })));
    assert_eq!(button.listener_count("click"), 1);

    button.dispatch_event(&Event::new("click"));
    assert_eq!(*log.borrow(), vec!["second"]);
}

#[test]
fn binding_null_detaches_the_listener() {
    let strings: &'static [&'static str] = &["<button @click=", ">go</button>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::handler(|_| {})],
        )
        .unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let button = find(&container, "button");
    assert_eq!(button.listener_count("click"), 1);

    root.update(
        html(host.as_ref(), strings, vec![Bindable::Null]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(button.listener_count("click"), 0);
}

#[test]
fn events_bubble_to_ancestor_handlers() {
    let strings: &'static [&'static str] =
        &["<div @click=", "><button @click=", ">go</button></div>"];
    let host = StandardHost::new();
    let container = container();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let outer = EventHandler::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("outer")
    });
    let inner = EventHandler::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("inner")
    });
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![outer.into(), inner.into()]).unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());

    find(&container, "button").dispatch_event(&Event::new("click"));
    assert_eq!(*log.borrow(), vec!["inner", "outer"]);
}

#[test]
fn stop_propagation_halts_the_walk() {
    let strings: &'static [&'static str] =
        &["<div @click=", "><button @click=", ">go</button></div>"];
    let host = StandardHost::new();
    let container = container();
    let outer_called = Rc::new(Cell::new(false));
    let outer = EventHandler::new({
        let outer_called = outer_called.clone();
        move |_| outer_called.set(true)
    });
    let inner = EventHandler::new(move |event: &Event| event.stop_propagation());
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![outer.into(), inner.into()]).unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());

    find(&container, "button").dispatch_event(&Event::new("click"));
    assert!(!outer_called.get());
}

#[test]
fn unmount_detaches_all_listeners() {
    let strings: &'static [&'static str] = &["<button @click=", ">go</button>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::handler(|_| {})],
        )
        .unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    let button = find(&container, "button");
    assert_eq!(button.listener_count("click"), 1);

    root.unmount(&UpdateOptions::immediate());
    assert_eq!(button.listener_count("click"), 0);
}
