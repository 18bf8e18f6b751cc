//! Typed descriptors of DOM attach points.
//!
//! A [`Part`] is produced exactly once, during template instantiation or
//! root creation, and is owned by exactly one binding for its lifetime. No
//! two bindings ever observe the same part.

use std::rc::Rc;

use weft_dom::{Namespace, Node, PropertyValue};

#[derive(Clone)]
pub enum Part {
    /// Sets or clears an element attribute.
    Attribute { node: Node, name: Rc<str> },

    /// Writes an element property.
    Property {
        node: Node,
        name: Rc<str>,
        default: PropertyValue,
    },

    /// Writes a property only when the DOM-reported value differs, so
    /// in-flight user input is never clobbered.
    Live {
        node: Node,
        name: Rc<str>,
        default: PropertyValue,
    },

    /// Registers a delegated listener object.
    Event { node: Node, name: Rc<str> },

    /// Spread-style attach: all attributes of an element at once.
    Element { node: Node },

    /// A marker comment; bound content lives immediately before `node`,
    /// or immediately after `anchor` when one is set (the root layout).
    ChildNode {
        node: Node,
        anchor: Option<Node>,
        namespace: Namespace,
    },

    /// A live text fragment surrounded by fixed literal text.
    Text {
        node: Node,
        preceding: Rc<str>,
        following: Rc<str>,
    },
}

impl Part {
    /// The node this part is attached to or anchored at.
    pub fn node(&self) -> &Node {
        match self {
            Part::Attribute { node, .. }
            | Part::Property { node, .. }
            | Part::Live { node, .. }
            | Part::Event { node, .. }
            | Part::Element { node }
            | Part::ChildNode { node, .. }
            | Part::Text { node, .. } => node,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Part::Attribute { .. } => "attribute",
            Part::Property { .. } => "property",
            Part::Live { .. } => "live",
            Part::Event { .. } => "event",
            Part::Element { .. } => "element",
            Part::ChildNode { .. } => "child-node",
            Part::Text { .. } => "text",
        }
    }

    /// Insert `content` at the position this child-node part owns: before
    /// the marker, or right behind the anchor (and any content already
    /// placed there) when an anchor is set.
    pub(crate) fn insert_content(&self, content: &Node, before: Option<&Node>) {
        let Part::ChildNode { node, anchor, .. } = self else {
            debug_assert!(false, "insert_content on a non-child part");
            return;
        };
        let parent = match anchor.as_ref().or(Some(node)).and_then(|n| n.parent()) {
            Some(parent) => parent,
            None => return,
        };
        match (before, anchor) {
            (Some(reference), _) => parent.insert_before(content, Some(reference)),
            // anchored (root) layout: owned content trails the marker
            (None, Some(_)) => parent.insert_before(content, None),
            (None, None) => parent.insert_before(content, Some(node)),
        }
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Part::Attribute { name, .. } => write!(f, "AttributePart({name})"),
            Part::Property { name, .. } => write!(f, "PropertyPart({name})"),
            Part::Live { name, .. } => write!(f, "LivePart({name})"),
            Part::Event { name, .. } => write!(f, "EventPart({name})"),
            Part::Element { .. } => write!(f, "ElementPart"),
            Part::ChildNode { .. } => write!(f, "ChildNodePart"),
            Part::Text { .. } => write!(f, "TextPart"),
        }
    }
}
