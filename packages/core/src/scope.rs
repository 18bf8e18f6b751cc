//! Lexically nested shared state.
//!
//! Each coroutine renders under a [`Scope`]: a chain of keyed entries with
//! a parent pointer. Shared context lookups walk the chain outward, the way
//! nested components see state provided above them. Scopes also carry the
//! error boundary entries the scheduler searches when a render fails, and a
//! weak link to the coroutine that installed them so cleanup ordering stays
//! well-defined without a reference cycle.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::RenderError;
use crate::scheduler::CoroutineHandle;

pub struct Scope {
    parent: Option<Rc<Scope>>,
    entries: RefCell<Vec<(TypeId, Rc<dyn Any>)>>,
    boundary: RefCell<Option<Rc<ErrorBoundaryCell>>>,
    owner: RefCell<Option<Weak<RefCell<dyn crate::scheduler::Coroutine>>>>,
}

impl Scope {
    /// The root scope of a tree; it has no parent and no owner until a
    /// root coroutine claims it.
    pub fn root() -> Rc<Scope> {
        Rc::new(Scope {
            parent: None,
            entries: RefCell::new(Vec::new()),
            boundary: RefCell::new(None),
            owner: RefCell::new(None),
        })
    }

    /// A child scope nested under `parent`.
    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            parent: Some(parent.clone()),
            entries: RefCell::new(Vec::new()),
            boundary: RefCell::new(None),
            owner: RefCell::new(None),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    pub(crate) fn set_owner(&self, owner: Weak<RefCell<dyn crate::scheduler::Coroutine>>) {
        *self.owner.borrow_mut() = Some(owner);
    }

    pub(crate) fn owner(&self) -> Option<CoroutineHandle> {
        self.owner.borrow().as_ref()?.upgrade()
    }

    /// Store a value under its type in this scope, shadowing any value of
    /// the same type provided further out.
    pub fn set_shared<T: 'static>(&self, value: T) {
        let key = TypeId::of::<T>();
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = Rc::new(value);
        } else {
            entries.push((key, Rc::new(value)));
        }
    }

    /// Look a value up by type, walking the chain outward.
    pub fn get_shared<T: 'static>(&self) -> Option<Rc<T>> {
        let key = TypeId::of::<T>();
        if let Some(value) = self
            .entries
            .borrow()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone())
        {
            return value.downcast::<T>().ok();
        }
        self.parent.as_ref()?.get_shared::<T>()
    }

    pub(crate) fn install_boundary(&self, cell: Rc<ErrorBoundaryCell>) {
        *self.boundary.borrow_mut() = Some(cell);
    }

    /// Walk outward for the nearest error boundary, returning the boundary
    /// cell together with the coroutine that owns its scope.
    pub(crate) fn find_boundary(
        self: &Rc<Scope>,
    ) -> Option<(Rc<ErrorBoundaryCell>, CoroutineHandle)> {
        let mut cursor = Some(self.clone());
        while let Some(scope) = cursor {
            if let Some(cell) = scope.boundary.borrow().clone() {
                if let Some(owner) = scope.owner() {
                    return Some((cell, owner));
                }
            }
            cursor = scope.parent.clone();
        }
        None
    }
}

/// Shared state behind an installed error boundary: the last caught error,
/// read back by the owning component when it re-renders its fallback.
#[derive(Default)]
pub struct ErrorBoundaryCell {
    error: RefCell<Option<RenderError>>,
}

impl ErrorBoundaryCell {
    pub(crate) fn catch(&self, error: RenderError) {
        *self.error.borrow_mut() = Some(error);
    }

    pub fn error(&self) -> Option<RenderError> {
        self.error.borrow().clone()
    }

    pub fn clear(&self) {
        *self.error.borrow_mut() = None;
    }
}

/// Author-facing handle to an installed error boundary.
#[derive(Clone)]
pub struct ErrorBoundary {
    pub(crate) cell: Rc<ErrorBoundaryCell>,
}

impl ErrorBoundary {
    /// The error most recently caught by this boundary, if any.
    pub fn caught(&self) -> Option<RenderError> {
        self.cell.error()
    }

    /// Forget the caught error so the next failure is observed fresh.
    pub fn reset(&self) {
        self.cell.clear();
    }
}
