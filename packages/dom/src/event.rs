//! Synchronous event dispatch.
//!
//! Listeners are opaque callback handles compared by identity, which lets a
//! binding keep one registered listener object alive across value changes
//! instead of detaching and re-attaching on every update.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::node::Node;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum EventPhase {
    Capture,
    Target,
    Bubble,
}

struct EventInner {
    name: String,
    detail: Option<Rc<dyn Any>>,
    target: RefCell<Option<Node>>,
    current_target: RefCell<Option<Node>>,
    propagation_stopped: Cell<bool>,
    default_prevented: Cell<bool>,
}

/// An event travelling through the tree.
#[derive(Clone)]
pub struct Event {
    inner: Rc<EventInner>,
}

impl Event {
    pub fn new(name: &str) -> Event {
        Event::with_detail_opt(name, None)
    }

    /// An event carrying an arbitrary payload, retrieved with
    /// [`Event::detail`].
    pub fn with_detail<D: Any>(name: &str, detail: D) -> Event {
        Event::with_detail_opt(name, Some(Rc::new(detail) as Rc<dyn Any>))
    }

    fn with_detail_opt(name: &str, detail: Option<Rc<dyn Any>>) -> Event {
        Event {
            inner: Rc::new(EventInner {
                name: name.to_string(),
                detail,
                target: RefCell::new(None),
                current_target: RefCell::new(None),
                propagation_stopped: Cell::new(false),
                default_prevented: Cell::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn detail<D: Any>(&self) -> Option<Rc<D>> {
        self.inner.detail.clone()?.downcast::<D>().ok()
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> Option<Node> {
        self.inner.target.borrow().clone()
    }

    /// The node whose listener is currently running.
    pub fn current_target(&self) -> Option<Node> {
        self.inner.current_target.borrow().clone()
    }

    pub fn stop_propagation(&self) {
        self.inner.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.inner.propagation_stopped.get()
    }

    pub fn prevent_default(&self) {
        self.inner.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.inner.default_prevented.get()
    }

    pub(crate) fn begin_dispatch(&self, target: &Node) {
        *self.inner.target.borrow_mut() = Some(target.clone());
    }

    pub(crate) fn set_current_target(&self, node: &Node) {
        *self.inner.current_target.borrow_mut() = Some(node.clone());
    }

    pub(crate) fn end_dispatch(&self) {
        *self.inner.current_target.borrow_mut() = None;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.inner.name)
            .finish()
    }
}

/// A registered event callback, compared by identity.
#[derive(Clone)]
pub struct EventListener {
    callback: Rc<dyn Fn(&Event)>,
}

impl EventListener {
    pub fn new(callback: impl Fn(&Event) + 'static) -> EventListener {
        EventListener {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    pub fn ptr_eq(&self, other: &EventListener) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventListener")
    }
}
