//! The polymorphic value an author hands to the engine.
//!
//! The original's dynamically typed value space is modeled as a closed sum:
//! plain scalars, listener and ref values, node adoption, lists and keyed
//! maps, directive elements, and `Null`. Directive payloads that carry
//! arbitrary typed data (component props) travel as `Any`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use weft_dom::{Event, Node, PropertyValue};

use crate::binding::Directive;

/// A directive paired with the value it should resolve.
#[derive(Clone)]
pub struct DirectiveElement {
    pub directive: Rc<dyn Directive>,
    pub value: Rc<Bindable>,
}

/// A key identifying one entry of a keyed list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Text(Rc<str>),
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Text(t) => write!(f, "{t}"),
        }
    }
}

/// One entry of a keyed list value.
pub struct KeyedEntry {
    pub key: Key,
    pub content: Bindable,
}

/// A value an author may hand to the engine.
#[derive(Clone)]
pub enum Bindable {
    Null,
    Text(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// An event listener value for `@name` holes.
    Handler(EventHandler),
    /// A ref object written with the part's node.
    NodeRef(NodeRef),
    /// A ref callback invoked with the part's node.
    RefCallback(RefCallback),
    /// Adopt an existing node as child content.
    Node(Node),
    /// Index-keyed sequence of child content.
    List(Rc<[Bindable]>),
    /// Keyed entries (`key` → value), used by class/style/spread values.
    Map(Rc<[(Rc<str>, Bindable)]>),
    /// One keyed list entry, produced by keyed-list helpers.
    Keyed(Rc<KeyedEntry>),
    /// Opaque directive payload (component props and the like).
    Any(Rc<dyn Any>),
    /// A directive element: `{type, value}`.
    Directive(DirectiveElement),
    /// Compile-time-stable text spliced into the template source before
    /// cache lookup. Never reaches a binding.
    Literal(Rc<str>),
}

impl Bindable {
    pub fn list(items: impl IntoIterator<Item = Bindable>) -> Bindable {
        Bindable::List(items.into_iter().collect())
    }

    pub fn map<N: Into<Rc<str>>>(entries: impl IntoIterator<Item = (N, Bindable)>) -> Bindable {
        Bindable::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    pub fn keyed(key: impl Into<Key>, content: impl Into<Bindable>) -> Bindable {
        Bindable::Keyed(Rc::new(KeyedEntry {
            key: key.into(),
            content: content.into(),
        }))
    }

    pub fn handler(f: impl Fn(&Event) + 'static) -> Bindable {
        Bindable::Handler(EventHandler::new(f))
    }

    pub fn literal(text: impl Into<Rc<str>>) -> Bindable {
        Bindable::Literal(text.into())
    }

    pub fn directive(directive: Rc<dyn Directive>, value: Bindable) -> Bindable {
        Bindable::Directive(DirectiveElement {
            directive,
            value: Rc::new(value),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Bindable::Null)
    }

    /// Semantic equality: the check `should_bind` runs to suppress no-op
    /// rebinds. Floats compare by bits, handles by identity.
    pub fn same(&self, other: &Bindable) -> bool {
        match (self, other) {
            (Bindable::Null, Bindable::Null) => true,
            (Bindable::Text(a), Bindable::Text(b)) => a == b,
            (Bindable::Int(a), Bindable::Int(b)) => a == b,
            (Bindable::Float(a), Bindable::Float(b)) => a.to_bits() == b.to_bits(),
            (Bindable::Bool(a), Bindable::Bool(b)) => a == b,
            (Bindable::Handler(a), Bindable::Handler(b)) => a.same(b),
            (Bindable::NodeRef(a), Bindable::NodeRef(b)) => a.ptr_eq(b),
            (Bindable::RefCallback(a), Bindable::RefCallback(b)) => a.ptr_eq(b),
            (Bindable::Node(a), Bindable::Node(b)) => a == b,
            (Bindable::List(a), Bindable::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y))
            }
            (Bindable::Map(a), Bindable::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((an, av), (bn, bv))| an == bn && av.same(bv))
            }
            (Bindable::Keyed(a), Bindable::Keyed(b)) => {
                a.key == b.key && a.content.same(&b.content)
            }
            (Bindable::Any(a), Bindable::Any(b)) => Rc::ptr_eq(a, b),
            (Bindable::Directive(a), Bindable::Directive(b)) => {
                Rc::ptr_eq(&a.directive, &b.directive) && a.value.same(&b.value)
            }
            (Bindable::Literal(a), Bindable::Literal(b)) => a == b,
            _ => false,
        }
    }

    /// The text a text-expecting part renders for this value. `Null`
    /// renders empty; non-scalar values have no text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Bindable::Null => Some(String::new()),
            Bindable::Text(t) => Some(t.to_string()),
            Bindable::Int(i) => Some(i.to_string()),
            Bindable::Float(f) => Some(f.to_string()),
            Bindable::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The property form of this value, for property and live parts.
    pub fn to_property(&self) -> Option<PropertyValue> {
        match self {
            Bindable::Null => Some(PropertyValue::Null),
            Bindable::Text(t) => Some(PropertyValue::Text(t.clone())),
            Bindable::Int(i) => Some(PropertyValue::Int(*i)),
            Bindable::Float(f) => Some(PropertyValue::Float(*f)),
            Bindable::Bool(b) => Some(PropertyValue::Bool(*b)),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Bindable::Null => "null",
            Bindable::Text(_) => "text",
            Bindable::Int(_) => "int",
            Bindable::Float(_) => "float",
            Bindable::Bool(_) => "bool",
            Bindable::Handler(_) => "handler",
            Bindable::NodeRef(_) => "node-ref",
            Bindable::RefCallback(_) => "ref-callback",
            Bindable::Node(_) => "node",
            Bindable::List(_) => "list",
            Bindable::Map(_) => "map",
            Bindable::Keyed(_) => "keyed",
            Bindable::Any(_) => "any",
            Bindable::Directive(_) => "directive",
            Bindable::Literal(_) => "literal",
        }
    }
}

impl fmt::Debug for Bindable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bindable::Text(t) => write!(f, "Text({t:?})"),
            Bindable::Int(i) => write!(f, "Int({i})"),
            Bindable::Float(x) => write!(f, "Float({x})"),
            Bindable::Bool(b) => write!(f, "Bool({b})"),
            Bindable::Directive(el) => write!(f, "Directive({})", el.directive.name()),
            other => f.write_str(other.type_name()),
        }
    }
}

impl Default for Bindable {
    fn default() -> Self {
        Bindable::Null
    }
}

impl From<&str> for Bindable {
    fn from(value: &str) -> Self {
        Bindable::Text(value.into())
    }
}

impl From<String> for Bindable {
    fn from(value: String) -> Self {
        Bindable::Text(value.into())
    }
}

impl From<i64> for Bindable {
    fn from(value: i64) -> Self {
        Bindable::Int(value)
    }
}

impl From<i32> for Bindable {
    fn from(value: i32) -> Self {
        Bindable::Int(value as i64)
    }
}

impl From<usize> for Bindable {
    fn from(value: usize) -> Self {
        Bindable::Int(value as i64)
    }
}

impl From<f64> for Bindable {
    fn from(value: f64) -> Self {
        Bindable::Float(value)
    }
}

impl From<bool> for Bindable {
    fn from(value: bool) -> Self {
        Bindable::Bool(value)
    }
}

impl From<Node> for Bindable {
    fn from(value: Node) -> Self {
        Bindable::Node(value)
    }
}

impl From<EventHandler> for Bindable {
    fn from(value: EventHandler) -> Self {
        Bindable::Handler(value)
    }
}

impl From<NodeRef> for Bindable {
    fn from(value: NodeRef) -> Self {
        Bindable::NodeRef(value)
    }
}

impl<T: Into<Bindable>> From<Option<T>> for Bindable {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Bindable::Null,
        }
    }
}

/// An event listener value: a callback plus registration options.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<dyn Fn(&Event)>,
    capture: bool,
}

impl EventHandler {
    pub fn new(callback: impl Fn(&Event) + 'static) -> EventHandler {
        EventHandler {
            callback: Rc::new(callback),
            capture: false,
        }
    }

    pub fn with_capture(mut self) -> EventHandler {
        self.capture = true;
        self
    }

    pub fn capture(&self) -> bool {
        self.capture
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    pub(crate) fn callback(&self) -> Rc<dyn Fn(&Event)> {
        self.callback.clone()
    }

    /// Identity plus options: when both hold, a registered listener object
    /// can be kept attached and only its inner callback swapped.
    pub fn same(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback) && self.capture == other.capture
    }
}

/// A stable container for a node reference, written during the layout
/// phase and cleared on rollback.
#[derive(Clone, Default)]
pub struct NodeRef {
    inner: Rc<std::cell::RefCell<Option<Node>>>,
}

impl NodeRef {
    pub fn new() -> NodeRef {
        NodeRef::default()
    }

    pub fn get(&self) -> Option<Node> {
        self.inner.borrow().clone()
    }

    pub(crate) fn set(&self, node: Option<Node>) {
        *self.inner.borrow_mut() = node;
    }

    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Cleanup returned by a ref callback, invoked on rollback.
pub type RefCleanup = Box<dyn FnOnce()>;

/// A callback invoked with the part's node once it is live.
#[derive(Clone)]
pub struct RefCallback {
    callback: Rc<dyn Fn(Node) -> Option<RefCleanup>>,
}

impl RefCallback {
    pub fn new(callback: impl Fn(Node) -> Option<RefCleanup> + 'static) -> RefCallback {
        RefCallback {
            callback: Rc::new(callback),
        }
    }

    pub(crate) fn call(&self, node: Node) -> Option<RefCleanup> {
        (self.callback)(node)
    }

    pub fn ptr_eq(&self, other: &RefCallback) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}
