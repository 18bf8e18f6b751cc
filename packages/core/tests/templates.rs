//! Template parsing, caching and rendering.

use std::rc::Rc;

use weft_core::{html, Bindable, RenderError, RenderHost, Root, StandardHost, TemplateMode};
use weft_dom::{Namespace, Node};
use weft_core::UpdateOptions;

fn container() -> Node {
    Node::element("main", Namespace::Html)
}

#[test]
fn static_markup_renders_verbatim() {
    let host = StandardHost::new();
    let value = html(host.as_ref(), &["<p>hi</p>"], vec![]).unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!----><p>hi</p>");
}

#[test]
fn attribute_holes_fill_in_source_order() {
    let host = StandardHost::new();
    let value = html(
        host.as_ref(),
        &["<a class=", " href=", ">hi</a>"],
        vec!["x".into(), "/a".into()],
    )
    .unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(
        container.inner_html(),
        "<!----><a class=\"x\" href=\"/a\">hi</a>"
    );
}

#[test]
fn text_holes_keep_their_literal_flanks() {
    let host = StandardHost::new();
    let value = html(host.as_ref(), &["<p>a ", " b</p>"], vec!["X".into()]).unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!----><p>a X b</p>");
}

#[test]
fn several_holes_in_one_text_node() {
    let host = StandardHost::new();
    let value = html(
        host.as_ref(),
        &["<p>", " and ", "!</p>"],
        vec!["one".into(), "two".into()],
    )
    .unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!----><p>one and two!</p>");
}

#[test]
fn lone_bind_is_child_content() {
    let host = StandardHost::new();
    let value = html(host.as_ref(), &["", ""], vec!["hello".into()]).unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!---->hello<!---->");
}

#[test]
fn lone_bind_in_plain_text_is_a_text_template() {
    let host = StandardHost::new();
    let value = html(host.as_ref(), &["count: ", "!"], vec![42i64.into()]).unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!---->count:42!");
}

#[test]
fn whitespace_only_template_renders_nothing() {
    let host = StandardHost::new();
    let value = html(host.as_ref(), &["   "], vec![]).unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!---->");
}

#[test]
fn templates_cache_by_strings_identity_and_mode() {
    let host = StandardHost::new();
    let strings: &'static [&'static str] = &["<p>", "</p>"];
    let first = host
        .parse_template(&strings.into(), TemplateMode::Html)
        .unwrap();
    let second = host
        .parse_template(&strings.into(), TemplateMode::Html)
        .unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    let svg = host
        .parse_template(&strings.into(), TemplateMode::Svg)
        .unwrap();
    assert!(!Rc::ptr_eq(&first, &svg));
}

#[test]
fn literal_binds_expand_before_cache_lookup() {
    let host = StandardHost::new();
    let strings: &'static [&'static str] = &["<", ">x</", ">"];
    let binds = || vec![Bindable::literal("b"), Bindable::literal("b")];
    let first = html(host.as_ref(), strings, binds()).unwrap();
    let second = html(host.as_ref(), strings, binds()).unwrap();
    let (Bindable::Directive(first), Bindable::Directive(second)) = (first.clone(), second) else {
        panic!("templates are directive elements");
    };
    assert!(
        Rc::ptr_eq(&first.directive, &second.directive),
        "identical literal shapes must reuse the cached template"
    );

    let container = container();
    let root = Root::with_host(Bindable::Directive(first), &container, host);
    root.mount(&UpdateOptions::immediate());
    assert_eq!(container.inner_html(), "<!----><b>x</b>");
}

#[test]
fn bind_mixed_into_attribute_text_is_a_parse_error() {
    let host = StandardHost::new();
    let result = html(
        host.as_ref(),
        &["<a href=\"x", "\">hi</a>"],
        vec!["y".into()],
    );
    assert!(matches!(result, Err(RenderError::Parse { .. })));
}

#[test]
fn unbalanced_markup_is_a_parse_error() {
    let host = StandardHost::new();
    let result = html(host.as_ref(), &["<div"], vec![]);
    assert!(matches!(result, Err(RenderError::Parse { .. })));
}

#[test]
fn arity_mismatch_is_a_parse_error() {
    let host = StandardHost::new();
    let result = html(host.as_ref(), &["<p>", "</p>"], vec![]);
    assert!(matches!(result, Err(RenderError::Parse { .. })));
}

#[test]
fn svg_mode_assigns_the_svg_namespace() {
    let host = StandardHost::new();
    let value = weft_core::svg(
        host.as_ref(),
        &["<circle r=", "></circle>"],
        vec!["4".into()],
    )
    .unwrap();
    let container = container();
    let root = Root::with_host(value, &container, host);
    root.mount(&UpdateOptions::immediate());
    let circle = container
        .children()
        .into_iter()
        .find(|n| n.is_element())
        .expect("circle mounted");
    assert_eq!(circle.namespace(), Some(Namespace::Svg));
    assert_eq!(circle.attribute("r").as_deref(), Some("4"));
}

#[test]
fn reconcile_matches_a_fresh_render() {
    let strings: &'static [&'static str] = &["<a class=", " href=", ">hi</a>"];

    let host_a = StandardHost::new();
    let updated = container();
    let root_a = Root::with_host(
        html(host_a.as_ref(), strings, vec!["x".into(), "/a".into()]).unwrap(),
        &updated,
        host_a.clone(),
    );
    root_a.mount(&UpdateOptions::immediate());
    root_a.update(
        html(host_a.as_ref(), strings, vec!["y".into(), "/b".into()]).unwrap(),
        &UpdateOptions::immediate(),
    );

    let host_b = StandardHost::new();
    let fresh = container();
    let root_b = Root::with_host(
        html(host_b.as_ref(), strings, vec!["y".into(), "/b".into()]).unwrap(),
        &fresh,
        host_b,
    );
    root_b.mount(&UpdateOptions::immediate());

    assert_eq!(updated.inner_html(), fresh.inner_html());
}
