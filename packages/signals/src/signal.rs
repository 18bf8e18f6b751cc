//! The signal cell.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_core::LinkedList;

pub(crate) struct SignalInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: RefCell<LinkedList<Rc<dyn Fn()>>>,
    /// Memoised child-content directive, so every `bind_signal` of this
    /// signal carries the same directive identity. Holds the signal only
    /// weakly.
    pub(crate) directive: RefCell<Option<Rc<dyn weft_core::Directive>>>,
}

/// A shared observable value with a monotone version counter.
pub struct Signal<T> {
    pub(crate) inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Signal<T> {
        Signal {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: RefCell::new(LinkedList::new()),
                directive: RefCell::new(None),
            }),
        }
    }

    /// Stable identity of this signal cell.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    /// The version counter. Never decreases; equal versions mean the value
    /// is unchanged.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Read through a borrow without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, bump the version, and notify subscribers
    /// synchronously.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.touch();
    }

    /// Mutate the value in place, bump the version, and notify.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.touch();
    }

    fn touch(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        tracing::trace!(version = self.inner.version.get(), "signal changed");
        self.notify();
    }

    fn notify(&self) {
        // subscribers may unsubscribe while being notified; snapshot first
        let subscribers: Vec<Rc<dyn Fn()>> =
            self.inner.subscribers.borrow().iter().cloned().collect();
        for subscriber in subscribers {
            subscriber();
        }
    }

    /// Register a notification callback. Dropping the returned
    /// [`Subscription`] unsubscribes in O(1).
    pub fn subscribe(&self, subscriber: Rc<dyn Fn()>) -> Subscription {
        let handle = self.inner.subscribers.borrow_mut().push_back(subscriber);
        let inner = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.subscribers.borrow_mut().remove(handle);
                }
            })),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// The current value.
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Replace the value only if it differs; an equal value keeps the
    /// version, so dependents see "unchanged" and skip work.
    pub fn set_if_changed(&self, value: T) {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.touch();
    }
}

/// An active subscription; unsubscribes when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
