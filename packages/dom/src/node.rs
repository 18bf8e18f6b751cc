//! The retained node tree.
//!
//! A [`Node`] is a cheap clonable handle over shared tree data. Identity is
//! handle identity: two `Node`s are equal iff they point at the same tree
//! node, which is what reconciliation and hydration compare. Parents hold
//! strong references to children; children hold weak references back, so
//! dropping every external handle to a detached subtree frees it.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::event::{Event, EventListener, EventPhase};
use crate::record::{self, Edit};
use crate::value::PropertyValue;

/// Markup namespace an element was created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

/// The three node kinds the runtime works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Comment,
}

pub(crate) enum NodeKind {
    Element(ElementData),
    Text(RefCell<String>),
    Comment(RefCell<String>),
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) namespace: Namespace,
    pub(crate) attributes: RefCell<IndexMap<String, String>>,
    pub(crate) styles: RefCell<IndexMap<String, String>>,
    pub(crate) properties: RefCell<FxHashMap<String, PropertyValue>>,
    pub(crate) listeners: RefCell<Vec<ListenerEntry>>,
}

pub(crate) struct ListenerEntry {
    pub(crate) event: String,
    pub(crate) listener: EventListener,
    pub(crate) capture: bool,
}

pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<Node>>,
}

/// A handle to one node of the document tree.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeData>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element(el) => write!(f, "<{}>", el.tag),
            NodeKind::Text(data) => write!(f, "#text({:?})", data.borrow()),
            NodeKind::Comment(data) => write!(f, "<!--{}-->", data.borrow()),
        }
    }
}

impl Node {
    fn from_kind(kind: NodeKind) -> Node {
        Node(Rc::new(NodeData {
            kind,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create a detached element.
    pub fn element(tag: &str, namespace: Namespace) -> Node {
        Node::from_kind(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            namespace,
            attributes: RefCell::new(IndexMap::new()),
            styles: RefCell::new(IndexMap::new()),
            properties: RefCell::new(FxHashMap::default()),
            listeners: RefCell::new(Vec::new()),
        }))
    }

    /// Create a detached text node.
    pub fn text(data: &str) -> Node {
        Node::from_kind(NodeKind::Text(RefCell::new(data.to_string())))
    }

    /// Create a detached comment node.
    pub fn comment(data: &str) -> Node {
        Node::from_kind(NodeKind::Comment(RefCell::new(data.to_string())))
    }

    pub fn node_type(&self) -> NodeType {
        match &self.0.kind {
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type() == NodeType::Text
    }

    pub fn is_comment(&self) -> bool {
        self.node_type() == NodeType::Comment
    }

    pub(crate) fn element_data(&self) -> Option<&ElementData> {
        match &self.0.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Element tag name; `None` for text and comment nodes.
    pub fn tag_name(&self) -> Option<String> {
        self.element_data().map(|el| el.tag.clone())
    }

    pub fn namespace(&self) -> Option<Namespace> {
        self.element_data().map(|el| el.namespace)
    }

    /// A short human-readable description used in errors and edit records.
    pub fn describe(&self) -> String {
        match &self.0.kind {
            NodeKind::Element(el) => format!("<{}>", el.tag),
            NodeKind::Text(_) => "#text".to_string(),
            NodeKind::Comment(_) => "#comment".to_string(),
        }
    }

    // -- tree structure -----------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.children.borrow().get(index).cloned()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.child(0)
    }

    pub fn last_child(&self) -> Option<Node> {
        let children = self.0.children.borrow();
        children.last().cloned()
    }

    /// Index of this node within its parent's child list.
    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let children = parent.0.children.borrow();
        children.iter().position(|c| c == self)
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        parent.child(index + 1)
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        if index == 0 {
            None
        } else {
            parent.child(index - 1)
        }
    }

    /// Whether `other` is this node or a descendant of it.
    pub fn contains(&self, other: &Node) -> bool {
        let mut cursor = Some(other.clone());
        while let Some(node) = cursor {
            if &node == self {
                return true;
            }
            cursor = node.parent();
        }
        false
    }

    /// Append `child` as the last child, detaching it from any previous
    /// parent first.
    pub fn append_child(&self, child: &Node) {
        self.insert_before(child, None);
    }

    /// Insert `new` before `reference` (or at the end when `reference` is
    /// `None`). A reference that is not actually a child falls back to an
    /// append.
    pub fn insert_before(&self, new: &Node, reference: Option<&Node>) {
        debug_assert!(
            self.is_element() || self.parent().is_none(),
            "only elements and detached roots hold children"
        );
        new.detach();
        let index = reference
            .and_then(|r| {
                let children = self.0.children.borrow();
                children.iter().position(|c| c == r)
            })
            .unwrap_or_else(|| self.0.children.borrow().len());
        self.0.children.borrow_mut().insert(index, new.clone());
        *new.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        record::push(|| Edit::InsertNode {
            node: new.describe(),
        });
    }

    /// Insert `new` immediately after `reference`.
    pub fn insert_after(&self, new: &Node, reference: &Node) {
        let next = reference.next_sibling();
        self.insert_before(new, next.as_ref());
    }

    /// Remove `child` from this node. Does nothing if it is not a child.
    pub fn remove_child(&self, child: &Node) {
        let mut children = self.0.children.borrow_mut();
        if let Some(index) = children.iter().position(|c| c == child) {
            children.remove(index);
            *child.0.parent.borrow_mut() = Weak::new();
            record::push(|| Edit::RemoveNode {
                node: child.describe(),
            });
        }
    }

    /// Detach this node from its parent, if any.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Replace `old` with `new`, keeping the position in the child list.
    pub fn replace_child(&self, old: &Node, new: &Node) {
        let index = {
            let children = self.0.children.borrow();
            children.iter().position(|c| c == old)
        };
        if let Some(index) = index {
            new.detach();
            let mut children = self.0.children.borrow_mut();
            children[index] = new.clone();
            *new.0.parent.borrow_mut() = Rc::downgrade(&self.0);
            *old.0.parent.borrow_mut() = Weak::new();
            record::push(|| Edit::RemoveNode {
                node: old.describe(),
            });
            record::push(|| Edit::InsertNode {
                node: new.describe(),
            });
        }
    }

    /// Deep structural clone: tag, namespace, attributes, styles, character
    /// data and children. Properties and listeners belong to live nodes and
    /// are not cloned. Clone construction is not recorded.
    pub fn deep_clone(&self) -> Node {
        let clone = match &self.0.kind {
            NodeKind::Element(el) => Node::from_kind(NodeKind::Element(ElementData {
                tag: el.tag.clone(),
                namespace: el.namespace,
                attributes: RefCell::new(el.attributes.borrow().clone()),
                styles: RefCell::new(el.styles.borrow().clone()),
                properties: RefCell::new(FxHashMap::default()),
                listeners: RefCell::new(Vec::new()),
            })),
            NodeKind::Text(data) => Node::text(&data.borrow()),
            NodeKind::Comment(data) => Node::comment(&data.borrow()),
        };
        for child in self.0.children.borrow().iter() {
            let child_clone = child.deep_clone();
            clone.0.children.borrow_mut().push(child_clone.clone());
            *child_clone.0.parent.borrow_mut() = Rc::downgrade(&clone.0);
        }
        clone
    }

    // -- character data -----------------------------------------------------

    /// Character data of a text or comment node.
    pub fn data(&self) -> Option<String> {
        match &self.0.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.borrow().clone()),
            NodeKind::Element(_) => None,
        }
    }

    /// Replace the character data of a text or comment node.
    pub fn set_data(&self, value: &str) {
        match &self.0.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                *data.borrow_mut() = value.to_string();
                record::push(|| Edit::SetText {
                    data: value.to_string(),
                });
            }
            NodeKind::Element(_) => {}
        }
    }

    /// Concatenated text of this node and all descendants.
    pub fn text_content(&self) -> String {
        match &self.0.kind {
            NodeKind::Text(data) => data.borrow().clone(),
            NodeKind::Comment(_) => String::new(),
            NodeKind::Element(_) => {
                let mut out = String::new();
                for child in self.0.children.borrow().iter() {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    // -- attributes ---------------------------------------------------------

    pub fn attribute(&self, name: &str) -> Option<String> {
        let el = self.element_data()?;
        if name == "style" {
            let styles = el.styles.borrow();
            if styles.is_empty() {
                return None;
            }
            return Some(crate::serialize::style_text(&styles));
        }
        el.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attribute_names(&self) -> Vec<String> {
        match self.element_data() {
            Some(el) => el.attributes.borrow().keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        if let Some(el) = self.element_data() {
            if name == "style" {
                let mut styles = el.styles.borrow_mut();
                *styles = crate::serialize::parse_style_text(value);
            } else {
                el.attributes
                    .borrow_mut()
                    .insert(name.to_string(), value.to_string());
            }
            record::push(|| Edit::SetAttribute {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Attribute write that bypasses the edit recorder; used when building
    /// trees from parsed markup.
    pub(crate) fn set_attribute_silent(&self, name: &str, value: &str) {
        if let Some(el) = self.element_data() {
            if name == "style" {
                *el.styles.borrow_mut() = crate::serialize::parse_style_text(value);
            } else {
                el.attributes
                    .borrow_mut()
                    .insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        let Some(el) = self.element_data() else {
            return false;
        };
        let removed = if name == "style" {
            let mut styles = el.styles.borrow_mut();
            let had = !styles.is_empty();
            styles.clear();
            had
        } else {
            el.attributes.borrow_mut().shift_remove(name).is_some()
        };
        if removed {
            record::push(|| Edit::RemoveAttribute {
                name: name.to_string(),
            });
        }
        removed
    }

    /// Add or remove a valueless attribute.
    pub fn toggle_attribute(&self, name: &str, on: bool) {
        if let Some(el) = self.element_data() {
            if on {
                el.attributes
                    .borrow_mut()
                    .insert(name.to_string(), String::new());
            } else {
                el.attributes.borrow_mut().shift_remove(name);
            }
            record::push(|| Edit::ToggleAttribute {
                name: name.to_string(),
                on,
            });
        }
    }

    // -- classes ------------------------------------------------------------

    pub fn has_class(&self, name: &str) -> bool {
        self.attribute("class")
            .map(|class| class.split_ascii_whitespace().any(|c| c == name))
            .unwrap_or(false)
    }

    /// Add or remove one class token, preserving the order of the others.
    pub fn toggle_class(&self, name: &str, on: bool) {
        let Some(el) = self.element_data() else {
            return;
        };
        let mut attributes = el.attributes.borrow_mut();
        let current = attributes.get("class").cloned().unwrap_or_default();
        let mut tokens: Vec<&str> = current.split_ascii_whitespace().collect();
        if on {
            if !tokens.contains(&name) {
                tokens.push(name);
            }
        } else {
            tokens.retain(|t| *t != name);
        }
        if tokens.is_empty() {
            attributes.shift_remove("class");
        } else {
            attributes.insert("class".to_string(), tokens.join(" "));
        }
        record::push(|| Edit::ToggleClass {
            name: name.to_string(),
            on,
        });
    }

    // -- inline style -------------------------------------------------------

    pub fn style_property(&self, name: &str) -> Option<String> {
        self.element_data()?.styles.borrow().get(name).cloned()
    }

    pub fn set_style_property(&self, name: &str, value: &str) {
        if let Some(el) = self.element_data() {
            el.styles
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
            record::push(|| Edit::SetStyleProperty {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    pub fn remove_style_property(&self, name: &str) -> bool {
        let Some(el) = self.element_data() else {
            return false;
        };
        let removed = el.styles.borrow_mut().shift_remove(name).is_some();
        if removed {
            record::push(|| Edit::RemoveStyleProperty {
                name: name.to_string(),
            });
        }
        removed
    }

    // -- properties ---------------------------------------------------------

    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.element_data()?.properties.borrow().get(name).cloned()
    }

    pub fn set_property(&self, name: &str, value: PropertyValue) {
        if let Some(el) = self.element_data() {
            el.properties.borrow_mut().insert(name.to_string(), value);
            record::push(|| Edit::SetProperty {
                name: name.to_string(),
            });
        }
    }

    pub fn remove_property(&self, name: &str) {
        if let Some(el) = self.element_data() {
            el.properties.borrow_mut().remove(name);
        }
    }

    // -- listeners ----------------------------------------------------------

    /// Register a listener. The same listener object may be registered for
    /// several event names; identity is the listener handle plus the capture
    /// flag.
    pub fn add_event_listener(&self, event: &str, listener: &EventListener, capture: bool) {
        if let Some(el) = self.element_data() {
            let mut listeners = el.listeners.borrow_mut();
            let exists = listeners
                .iter()
                .any(|l| l.event == event && l.listener.ptr_eq(listener) && l.capture == capture);
            if !exists {
                listeners.push(ListenerEntry {
                    event: event.to_string(),
                    listener: listener.clone(),
                    capture,
                });
                record::push(|| Edit::AttachListener {
                    event: event.to_string(),
                });
            }
        }
    }

    pub fn remove_event_listener(&self, event: &str, listener: &EventListener, capture: bool) {
        if let Some(el) = self.element_data() {
            let mut listeners = el.listeners.borrow_mut();
            let before = listeners.len();
            listeners
                .retain(|l| !(l.event == event && l.listener.ptr_eq(listener) && l.capture == capture));
            if listeners.len() != before {
                record::push(|| Edit::DetachListener {
                    event: event.to_string(),
                });
            }
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        match self.element_data() {
            Some(el) => el
                .listeners
                .borrow()
                .iter()
                .filter(|l| l.event == event)
                .count(),
            None => 0,
        }
    }

    /// Dispatch an event at this node: capture from the root down, target,
    /// then bubble back up. Returns `false` if a listener prevented the
    /// default action.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        tracing::trace!(event = event.name(), target = ?self, "dispatching");
        event.begin_dispatch(self);
        let mut path = Vec::new();
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            cursor = node.parent();
            path.push(node);
        }
        // capture: outermost ancestor first
        for node in path.iter().rev() {
            if event.propagation_stopped() {
                break;
            }
            node.invoke_listeners(event, EventPhase::Capture);
        }
        if !event.propagation_stopped() {
            self.invoke_listeners(event, EventPhase::Target);
        }
        for node in path.iter() {
            if event.propagation_stopped() {
                break;
            }
            node.invoke_listeners(event, EventPhase::Bubble);
        }
        event.end_dispatch();
        !event.default_prevented()
    }

    fn invoke_listeners(&self, event: &Event, phase: EventPhase) {
        let Some(el) = self.element_data() else {
            return;
        };
        // snapshot so listeners may detach themselves mid-dispatch
        let listeners: Vec<(EventListener, bool)> = el
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.event == event.name())
            .map(|l| (l.listener.clone(), l.capture))
            .collect();
        for (listener, capture) in listeners {
            let wanted = match phase {
                EventPhase::Capture => capture,
                EventPhase::Bubble => !capture,
                EventPhase::Target => true,
            };
            if wanted {
                event.set_current_target(self);
                listener.call(event);
            }
        }
    }
}
