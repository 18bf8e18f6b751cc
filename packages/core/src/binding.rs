//! The directive/binding contract.
//!
//! A [`Directive`] is a capability object that turns a value plus a
//! [`Part`] into a [`Binding`]: the stateful connection of one value to one
//! DOM attach point. Directive identity is handle identity, which is what
//! slot discipline compares when deciding whether a binding may stay.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::Node;

use crate::bindable::Bindable;
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::{CommitPhase, RenderSession};

pub type BindingHandle = Rc<RefCell<dyn Binding>>;

pub trait Directive {
    /// Short name used in error messages.
    fn name(&self) -> &str;

    /// Precondition check run before a binding is created or rebound.
    fn ensure_value(&self, _value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        Ok(())
    }

    /// Create the binding connecting `value` to `part`.
    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError>;
}

/// The stateful link between one value and one part.
///
/// Lifecycle: created by a directive, *attached* through `connect` or
/// `hydrate`, *committed* when its effect applies to the DOM, and finally
/// `disconnect`ed, after which `rollback` reverses the last commit. A
/// binding is never reattached; the slot constructs a new one instead.
pub trait Binding {
    fn directive(&self) -> Rc<dyn Directive>;

    fn part(&self) -> &Part;

    /// The last bound input.
    fn value(&self) -> &Bindable;

    /// Pure decision: does `new` warrant a rebind? Returning `false`
    /// suppresses no-op work for values that are semantically identical.
    fn should_bind(&self, new: &Bindable) -> bool;

    /// Accept a new value. Returns `true` when an observable change must be
    /// committed.
    fn bind(&mut self, value: Bindable, session: &mut RenderSession) -> Result<bool, RenderError>;

    /// First attach: resolve initial state. Returns `true` when a first
    /// commit must be enqueued.
    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError>;

    /// First attach over existing DOM: validate the walker's next nodes
    /// match this binding's shape and adopt them.
    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.connect(session)
    }

    /// Detach. Enqueues whatever teardown the binding's subtree needs; the
    /// owner enqueues the binding's own rollback effect.
    fn disconnect(&mut self, session: &mut RenderSession);

    /// Apply the bound value to the DOM. Idempotent for identical values.
    fn commit(&mut self);

    /// Reverse the last commit.
    fn rollback(&mut self);

    /// The commit queue this binding's effects belong to.
    fn commit_phase(&self) -> CommitPhase {
        CommitPhase::Mutation
    }

    /// The content nodes a child-node binding currently owns, in document
    /// order. Non-content bindings own none.
    fn content_nodes(&self) -> Vec<Node> {
        Vec::new()
    }
}
