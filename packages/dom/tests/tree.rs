//! Document model basics: structure, attributes, serialization, parsing,
//! dispatch and the edit recorder.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{parse_fragment, record, Edit, Event, EventListener, Namespace, Node, PropertyValue};

#[test]
fn structural_operations_keep_order_and_parents() {
    let parent = Node::element("ul", Namespace::Html);
    let a = Node::element("li", Namespace::Html);
    let b = Node::element("li", Namespace::Html);
    let c = Node::element("li", Namespace::Html);
    parent.append_child(&a);
    parent.append_child(&c);
    parent.insert_before(&b, Some(&c));

    assert_eq!(parent.children(), vec![a.clone(), b.clone(), c.clone()]);
    assert_eq!(b.parent(), Some(parent.clone()));
    assert_eq!(b.next_sibling(), Some(c.clone()));
    assert_eq!(b.previous_sibling(), Some(a.clone()));

    // re-inserting an attached node moves it
    parent.append_child(&a);
    assert_eq!(parent.children(), vec![b.clone(), c.clone(), a.clone()]);

    parent.remove_child(&c);
    assert_eq!(c.parent(), None);
    assert_eq!(parent.child_count(), 2);
}

#[test]
fn replace_child_keeps_the_position() {
    let parent = Node::element("div", Namespace::Html);
    let old = Node::text("old");
    let tail = Node::text("tail");
    parent.append_child(&old);
    parent.append_child(&tail);

    let new = Node::comment("marker");
    parent.replace_child(&old, &new);
    assert_eq!(parent.children(), vec![new, tail]);
    assert_eq!(old.parent(), None);
}

#[test]
fn deep_clone_copies_structure_but_not_identity() {
    let original = Node::element("div", Namespace::Html);
    original.set_attribute("class", "x");
    original.set_style_property("color", "red");
    let child = Node::element("span", Namespace::Html);
    child.append_child(&Node::text("hi"));
    original.append_child(&child);

    let clone = original.deep_clone();
    assert_ne!(clone, original);
    assert_eq!(clone.outer_html(), original.outer_html());
    assert_ne!(clone.first_child(), original.first_child());
}

#[test]
fn serialization_escapes_and_handles_voids() {
    let div = Node::element("div", Namespace::Html);
    div.set_attribute("title", "a\"b");
    div.append_child(&Node::text("1 < 2 & 3"));
    div.append_child(&Node::element("br", Namespace::Html));
    div.append_child(&Node::comment("note"));
    assert_eq!(
        div.outer_html(),
        "<div title=\"a&quot;b\">1 &lt; 2 &amp; 3<br><!--note--></div>"
    );
}

#[test]
fn boolean_attributes_serialize_bare() {
    let input = Node::element("input", Namespace::Html);
    input.toggle_attribute("disabled", true);
    assert_eq!(input.outer_html(), "<input disabled>");
    input.toggle_attribute("disabled", false);
    assert_eq!(input.outer_html(), "<input>");
}

#[test]
fn class_and_style_views() {
    let div = Node::element("div", Namespace::Html);
    div.toggle_class("a", true);
    div.toggle_class("b", true);
    assert_eq!(div.attribute("class").as_deref(), Some("a b"));
    div.toggle_class("a", false);
    assert_eq!(div.attribute("class").as_deref(), Some("b"));

    div.set_style_property("color", "red");
    div.set_style_property("margin", "0");
    assert_eq!(
        div.attribute("style").as_deref(),
        Some("color: red; margin: 0")
    );
    div.remove_style_property("color");
    assert_eq!(div.attribute("style").as_deref(), Some("margin: 0"));
}

#[test]
fn properties_do_not_serialize() {
    let input = Node::element("input", Namespace::Html);
    input.set_property("value", PropertyValue::from("secret"));
    assert_eq!(input.outer_html(), "<input>");
    assert!(input
        .property("value")
        .unwrap()
        .same_value(&PropertyValue::from("secret")));
}

#[test]
fn same_value_distinguishes_float_bits() {
    assert!(PropertyValue::Float(f64::NAN).same_value(&PropertyValue::Float(f64::NAN)));
    assert!(!PropertyValue::Float(0.0).same_value(&PropertyValue::Float(-0.0)));
    assert!(PropertyValue::from("x").same_value(&PropertyValue::from("x")));
}

#[test]
fn parse_fragment_round_trips_simple_markup() {
    let nodes = parse_fragment("<div id=\"a\"><p>hi</p><!--c--></div>", Namespace::Html).unwrap();
    assert_eq!(nodes.len(), 1);
    let div = &nodes[0];
    assert_eq!(div.tag_name().as_deref(), Some("div"));
    assert_eq!(div.attribute("id").as_deref(), Some("a"));
    assert_eq!(div.outer_html(), "<div id=\"a\"><p>hi</p><!--c--></div>");
}

#[test]
fn parse_fragment_switches_namespaces_under_svg() {
    let nodes = parse_fragment("<svg><circle></circle></svg>", Namespace::Html).unwrap();
    let svg = &nodes[0];
    assert_eq!(svg.namespace(), Some(Namespace::Svg));
    assert_eq!(svg.first_child().unwrap().namespace(), Some(Namespace::Svg));
}

#[test]
fn parse_fragment_rejects_garbage() {
    assert!(parse_fragment("<div", Namespace::Html).is_err());
}

#[test]
fn recorder_captures_only_while_active() {
    let div = Node::element("div", Namespace::Html);
    div.set_attribute("a", "1");

    let (_, edits) = record::capture(|| {
        div.set_attribute("b", "2");
        div.remove_attribute("a");
    });
    assert_eq!(
        edits,
        vec![
            Edit::SetAttribute {
                name: "b".to_string(),
                value: "2".to_string()
            },
            Edit::RemoveAttribute {
                name: "a".to_string()
            },
        ]
    );

    div.set_attribute("c", "3");
    let (_, silent) = record::capture(|| {});
    assert!(silent.is_empty());
}

#[test]
fn dispatch_runs_capture_target_bubble() {
    let outer = Node::element("div", Namespace::Html);
    let inner = Node::element("button", Namespace::Html);
    outer.append_child(&inner);

    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let capture_listener = EventListener::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("capture")
    });
    let bubble_listener = EventListener::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("bubble")
    });
    let target_listener = EventListener::new({
        let log = log.clone();
        move |_| log.borrow_mut().push("target")
    });
    outer.add_event_listener("click", &capture_listener, true);
    outer.add_event_listener("click", &bubble_listener, false);
    inner.add_event_listener("click", &target_listener, false);

    inner.dispatch_event(&Event::new("click"));
    assert_eq!(*log.borrow(), vec!["capture", "target", "bubble"]);
}

#[test]
fn event_exposes_target_and_current_target() {
    let outer = Node::element("div", Namespace::Html);
    let inner = Node::element("button", Namespace::Html);
    outer.append_child(&inner);

    let seen: Rc<RefCell<Vec<(Option<Node>, Option<Node>)>>> = Rc::new(RefCell::new(Vec::new()));
    let listener = EventListener::new({
        let seen = seen.clone();
        move |event: &Event| {
            seen.borrow_mut()
                .push((event.target(), event.current_target()));
        }
    });
    outer.add_event_listener("click", &listener, false);

    inner.dispatch_event(&Event::new("click"));
    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, Some(inner));
    assert_eq!(seen[0].1, Some(outer));
}
