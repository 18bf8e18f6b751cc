//! Markup fragment parsing.
//!
//! Wraps `html_parser` and converts its AST into detached [`Node`] trees.
//! Attribute order is normalized alphabetically during conversion so that
//! parsing is deterministic regardless of the underlying map iteration
//! order; callers that care about author-visible ordering (template holes)
//! re-establish it themselves from their own bookkeeping.

use html_parser::{Dom, Element as AstElement, Node as AstNode};
use thiserror::Error;

use crate::node::{Namespace, Node};

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("markup could not be parsed: {0}")]
    Syntax(String),
}

/// Parse a markup fragment into a list of detached root nodes.
///
/// `namespace` is the namespace the fragment's roots are created under;
/// `<svg>` and `<math>` subtrees switch namespaces on their own.
pub fn parse_fragment(markup: &str, namespace: Namespace) -> Result<Vec<Node>, MarkupError> {
    let dom = Dom::parse(markup).map_err(|e| MarkupError::Syntax(e.to_string()))?;
    if !dom.errors.is_empty() {
        return Err(MarkupError::Syntax(dom.errors.join("; ")));
    }
    Ok(crate::record::suspended(|| {
        dom.children
            .iter()
            .filter_map(|child| convert(child, namespace))
            .collect()
    }))
}

fn convert(ast: &AstNode, namespace: Namespace) -> Option<Node> {
    match ast {
        AstNode::Text(text) => Some(Node::text(text)),
        AstNode::Comment(data) => Some(Node::comment(data)),
        AstNode::Element(element) => Some(convert_element(element, namespace)),
    }
}

fn convert_element(element: &AstElement, inherited: Namespace) -> Node {
    let namespace = match element.name.as_str() {
        "svg" => Namespace::Svg,
        "math" => Namespace::MathMl,
        _ => inherited,
    };
    let node = Node::element(&element.name, namespace);

    let mut attributes: Vec<(String, String)> = element
        .attributes
        .iter()
        .map(|(name, value)| (name.clone(), value.clone().unwrap_or_default()))
        .collect();
    if let Some(id) = &element.id {
        attributes.push(("id".to_string(), id.clone()));
    }
    if !element.classes.is_empty() {
        attributes.push(("class".to_string(), element.classes.join(" ")));
    }
    attributes.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in attributes {
        node.set_attribute_silent(&name, &value);
    }

    for child in &element.children {
        if let Some(converted) = convert(child, namespace) {
            node.append_child(&converted);
        }
    }
    node
}
