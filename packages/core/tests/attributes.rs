//! Primitive bindings: attributes, properties, live writes, classes,
//! styles, refs and spreads.

use weft_core::{html, Bindable, NodeRef, Root, StandardHost, UpdateOptions};
use weft_dom::{record, Edit, Namespace, Node, PropertyValue};

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

fn first_element(container: &Node) -> Node {
    container
        .children()
        .into_iter()
        .find(|n| n.is_element())
        .expect("an element was mounted")
}

#[test]
fn rebinding_touches_only_the_changed_attribute() {
    let strings: &'static [&'static str] = &["<a class=", " href=", ">hi</a>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["x".into(), "/a".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().ends_with("<a class=\"x\" href=\"/a\">hi</a>"));

    let (_, edits) = record::capture(|| {
        root.update(
            html(host.as_ref(), strings, vec!["y".into(), "/a".into()]).unwrap(),
            &UpdateOptions::immediate(),
        );
    });

    let class_writes = edits
        .iter()
        .filter(|e| matches!(e, Edit::SetAttribute { name, .. } if name == "class"))
        .count();
    let href_writes = edits
        .iter()
        .filter(|e| matches!(e, Edit::SetAttribute { name, .. } if name == "href"))
        .count();
    assert_eq!(class_writes, 1, "class changed, exactly one write");
    assert_eq!(href_writes, 0, "href did not change");
    assert!(container.inner_html().ends_with("<a class=\"y\" href=\"/a\">hi</a>"));
}

#[test]
fn rebinding_an_identical_value_commits_nothing() {
    let strings: &'static [&'static str] = &["<a class=", ">hi</a>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["x".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());

    let (_, edits) = record::capture(|| {
        root.update(
            html(host.as_ref(), strings, vec!["x".into()]).unwrap(),
            &UpdateOptions::immediate(),
        );
    });
    assert!(
        !edits
            .iter()
            .any(|e| matches!(e, Edit::SetAttribute { .. })),
        "identical values are suppressed before commit"
    );
}

#[test]
fn boolean_attributes_toggle() {
    let strings: &'static [&'static str] = &["<input disabled=", ">"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec![true.into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let input = first_element(&container);
    assert!(input.has_attribute("disabled"));

    root.update(
        html(host.as_ref(), strings, vec![false.into()]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert!(!input.has_attribute("disabled"));
}

#[test]
fn null_clears_a_previously_set_attribute() {
    let strings: &'static [&'static str] = &["<p title=", ">x</p>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["t".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let p = first_element(&container);
    assert_eq!(p.attribute("title").as_deref(), Some("t"));

    root.update(
        html(host.as_ref(), strings, vec![Bindable::Null]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert!(!p.has_attribute("title"));
}

#[test]
fn property_and_live_sigils_write_properties() {
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            &["<input .title=", " $value=", ">"],
            vec!["tip".into(), "abc".into()],
        )
        .unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    let input = first_element(&container);
    assert!(input
        .property("title")
        .unwrap()
        .same_value(&PropertyValue::from("tip")));
    assert!(input
        .property("value")
        .unwrap()
        .same_value(&PropertyValue::from("abc")));
    // properties never serialize
    assert!(!container.inner_html().contains("abc"));
}

#[test]
fn live_binding_does_not_clobber_user_input() {
    let strings: &'static [&'static str] = &["<input $value=", ">"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["a".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let input = first_element(&container);

    // the user types
    input.set_property("value", "ab".into());

    // a re-render with the unchanged bound value leaves the edit alone
    root.update(
        html(host.as_ref(), strings, vec!["a".into()]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert!(input
        .property("value")
        .unwrap()
        .same_value(&PropertyValue::from("ab")));

    // a genuinely new bound value does write
    root.update(
        html(host.as_ref(), strings, vec!["c".into()]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert!(input
        .property("value")
        .unwrap()
        .same_value(&PropertyValue::from("c")));
}

#[test]
fn class_keyword_diffs_token_sets() {
    let strings: &'static [&'static str] = &["<p :class=", ">x</p>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::map([("on", true.into()), ("off", false.into())])],
        )
        .unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let p = first_element(&container);
    assert!(p.has_class("on"));
    assert!(!p.has_class("off"));

    let (_, edits) = record::capture(|| {
        root.update(
            html(
                host.as_ref(),
                strings,
                vec![Bindable::map([("on", true.into()), ("off", true.into())])],
            )
            .unwrap(),
            &UpdateOptions::immediate(),
        );
    });
    assert!(p.has_class("on") && p.has_class("off"));
    let toggles = edits
        .iter()
        .filter(|e| matches!(e, Edit::ToggleClass { .. }))
        .count();
    assert_eq!(toggles, 1, "only the newly-on token toggles");
}

#[test]
fn style_keyword_applies_declarations() {
    let strings: &'static [&'static str] = &["<p :style=", ">x</p>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::map([
                ("color", "red".into()),
                ("margin", "4px".into()),
            ])],
        )
        .unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let p = first_element(&container);
    assert_eq!(p.style_property("color").as_deref(), Some("red"));

    root.update(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::map([("margin", "4px".into())])],
        )
        .unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(p.style_property("color"), None);
    assert_eq!(p.style_property("margin").as_deref(), Some("4px"));
}

#[test]
fn ref_keyword_hands_out_the_node_and_clears_on_unmount() {
    let host = StandardHost::new();
    let container = container();
    let node_ref = NodeRef::new();
    let root = Root::with_host(
        html(
            host.as_ref(),
            &["<p :ref=", ">x</p>"],
            vec![node_ref.clone().into()],
        )
        .unwrap(),
        &container,
        host,
    );
    root.mount(&UpdateOptions::immediate());
    let p = first_element(&container);
    assert_eq!(node_ref.get(), Some(p));

    root.unmount(&UpdateOptions::immediate());
    assert_eq!(node_ref.get(), None);
    assert_eq!(container.inner_html(), "");
}

#[test]
fn strict_slots_reject_directive_changes() {
    let strings: &'static [&'static str] = &["<a class=", ">hi</a>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["x".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());

    // an attribute hole is a strict slot: a directive element cannot
    // replace the attribute primitive
    let nested = html(host.as_ref(), &["<p>no</p>"], vec![]).unwrap();
    let handle = root.update(
        html(host.as_ref(), strings, vec![nested]).unwrap(),
        &UpdateOptions::immediate(),
    );
    let error = futures::executor::block_on(handle.wait()).unwrap_err();
    assert!(matches!(
        error,
        weft_core::RenderError::DirectiveMismatch { .. }
    ));
    assert!(
        container.inner_html().contains("class=\"x\""),
        "the failed frame commits nothing"
    );
}

#[test]
fn child_slots_swap_directives_flexibly() {
    let strings: &'static [&'static str] = &["<div>", "</div>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(host.as_ref(), strings, vec!["plain".into()]).unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    assert!(container.inner_html().contains("plain"));

    let nested = html(host.as_ref(), &["<p>nested</p>"], vec![]).unwrap();
    root.update(
        html(host.as_ref(), strings, vec![nested]).unwrap(),
        &UpdateOptions::immediate(),
    );
    assert!(container.inner_html().contains("<p>nested</p>"));
    assert!(!container.inner_html().contains("plain"));
}

#[test]
fn spread_binds_the_whole_attribute_list() {
    let strings: &'static [&'static str] = &["<button ", ">go</button>"];
    let host = StandardHost::new();
    let container = container();
    let root = Root::with_host(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::map([
                ("id", "b1".into()),
                ("@click", Bindable::handler(|_| {})),
                (".title", "tip".into()),
            ])],
        )
        .unwrap(),
        &container,
        host.clone(),
    );
    root.mount(&UpdateOptions::immediate());
    let button = first_element(&container);
    assert_eq!(button.attribute("id").as_deref(), Some("b1"));
    assert_eq!(button.listener_count("click"), 1);
    assert!(button
        .property("title")
        .unwrap()
        .same_value(&PropertyValue::from("tip")));

    // removing a key disposes its binding
    root.update(
        html(
            host.as_ref(),
            strings,
            vec![Bindable::map([("id", "b1".into())])],
        )
        .unwrap(),
        &UpdateOptions::immediate(),
    );
    assert_eq!(button.listener_count("click"), 0);
}
