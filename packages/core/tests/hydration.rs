//! Hydration: adopting a pre-rendered tree instead of building one.

use weft_core::{html, RenderError, Root, StandardHost, UpdateOptions};
use weft_dom::{Namespace, Node};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

/// `<!----><span>hi</span>`: the root marker followed by the rendered
/// template content, the shape a server renderer leaves behind.
fn prerendered(tag: &str) -> (Node, Node, Node) {
    let container = container();
    let span = Node::element(tag, Namespace::Html);
    let text = Node::text("hi");
    span.append_child(&text);
    container.append_child(&Node::comment(""));
    container.append_child(&span);
    (container, span, text)
}

#[test]
fn hydration_adopts_existing_nodes() {
    let (container, span, text) = prerendered("span");
    let host = StandardHost::new();
    let root = Root::with_host(
        html(host.as_ref(), &["<span>", "</span>"], vec!["hi".into()]).unwrap(),
        &container,
        host,
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    futures::executor::block_on(handle.wait()).unwrap();

    // the live element and its text node survive by identity
    let adopted_span = container
        .children()
        .into_iter()
        .find(|n| n.is_element())
        .expect("span still present");
    assert_eq!(adopted_span, span);
    assert_eq!(span.first_child(), Some(text));
}

#[test]
fn hydrated_trees_update_like_mounted_ones() {
    let strings: &'static [&'static str] = &["<span>", "</span>"];
    let (container, span, _) = prerendered("span");
    let host = StandardHost::new();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["hi".into()]).unwrap(),
        &container,
        host.clone(),
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    futures::executor::block_on(handle.wait()).unwrap();

    root.update(
        html(host.as_ref(), strings, vec!["bye".into()]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(span.text_content(), "bye");
    assert!(container.inner_html().contains("bye"));
}

#[test]
fn mismatched_elements_reject_and_leave_the_tree_alone() {
    let (container, _, _) = prerendered("div");
    let before = container.inner_html();
    let host = StandardHost::new();
    let root = Root::with_host(
        html(host.as_ref(), &["<span>", "</span>"], vec!["hi".into()]).unwrap(),
        &container,
        host,
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    let error = futures::executor::block_on(handle.wait()).unwrap_err();
    assert!(matches!(error, RenderError::HydrationMismatch { .. }));
    assert_eq!(container.inner_html(), before, "container contents unchanged");
}

#[test]
fn mismatched_text_rejects() {
    let (container, _, _) = prerendered("span");
    let host = StandardHost::new();
    let root = Root::with_host(
        html(host.as_ref(), &["<span>", "</span>"], vec!["other".into()]).unwrap(),
        &container,
        host,
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    let error = futures::executor::block_on(handle.wait()).unwrap_err();
    assert!(matches!(error, RenderError::HydrationMismatch { .. }));
}

#[test]
fn hydrating_static_markup_with_attributes() {
    let container = container();
    container.append_child(&Node::comment(""));
    let anchor = Node::element("a", Namespace::Html);
    anchor.set_attribute("class", "x");
    anchor.append_child(&Node::text("go"));
    container.append_child(&anchor);

    let host = StandardHost::new();
    let root = Root::with_host(
        html(host.as_ref(), &["<a class=", ">go</a>"], vec!["x".into()]).unwrap(),
        &container,
        host.clone(),
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    futures::executor::block_on(handle.wait()).unwrap();

    // rebinding after hydration mutates the adopted attribute
    root.update(
        html(host.as_ref(), &["<a class=", ">go</a>"], vec!["y".into()]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(anchor.attribute("class").as_deref(), Some("y"));
}

#[test]
fn hydration_attaches_event_listeners() {
    use std::cell::Cell;
    use std::rc::Rc;

    let container = container();
    container.append_child(&Node::comment(""));
    let button = Node::element("button", Namespace::Html);
    button.append_child(&Node::text("go"));
    container.append_child(&button);

    let clicks = Rc::new(Cell::new(0));
    let handler = weft_core::EventHandler::new({
        let clicks = clicks.clone();
        move |_| clicks.set(clicks.get() + 1)
    });

    let host = StandardHost::new();
    let root = Root::with_host(
        html(
            host.as_ref(),
            &["<button @click=", ">go</button>"],
            vec![handler.into()],
        )
        .unwrap(),
        &container,
        host,
    );
    let handle = root.hydrate(&UpdateOptions::immediate());
    futures::executor::block_on(handle.wait()).unwrap();

    button.dispatch_event(&weft_dom::Event::new("click"));
    assert_eq!(clicks.get(), 1);
}
