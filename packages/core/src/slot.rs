//! Slots: the discipline layer over bindings.
//!
//! A slot wraps one binding and polices directive changes across updates.
//! A *strict* slot insists the directive stay the same and raises
//! [`RenderError::DirectiveMismatch`] otherwise; a *flexible* slot disposes
//! the old binding and attaches a new one, preserving the part's marker so
//! surrounding siblings are unaffected. The render host picks the
//! discipline per part kind: flexible for child-node parts, strict
//! elsewhere.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::Node;

use crate::bindable::Bindable;
use crate::binding::{BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::{Effect, RenderSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// The directive must remain the same across updates.
    Strict,
    /// The directive may change; the old binding is disposed.
    Flexible,
}

pub struct Slot {
    binding: BindingHandle,
    kind: SlotKind,
    queued_commit: bool,
    connected: bool,
}

pub type SlotHandle = Rc<RefCell<Slot>>;

impl Slot {
    /// Resolve `value` into a binding for `part` and wrap it in a slot.
    pub fn resolve(
        value: Bindable,
        part: Part,
        session: &mut RenderSession,
    ) -> Result<SlotHandle, RenderError> {
        let (directive, inner) = split_value(value, &part, session)?;
        directive.ensure_value(&inner, &part)?;
        let kind = session.host().resolve_slot_kind(&inner, &part);
        let binding = directive.resolve_binding(inner, part)?;
        Ok(Rc::new(RefCell::new(Slot {
            binding,
            kind,
            queued_commit: false,
            connected: false,
        })))
    }

    /// First attach.
    pub fn connect(handle: &SlotHandle, session: &mut RenderSession) -> Result<(), RenderError> {
        let needs_commit = {
            let slot = handle.borrow();
            let binding = slot.binding.clone();
            drop(slot);
            let needs = binding.borrow_mut().connect(session)?;
            handle.borrow_mut().connected = true;
            needs
        };
        if needs_commit {
            Slot::enqueue_commit(handle, session);
        }
        Ok(())
    }

    /// First attach over existing DOM.
    pub fn hydrate(handle: &SlotHandle, session: &mut RenderSession) -> Result<(), RenderError> {
        let needs_commit = {
            let binding = handle.borrow().binding.clone();
            let needs = binding.borrow_mut().hydrate(session)?;
            handle.borrow_mut().connected = true;
            needs
        };
        if needs_commit {
            Slot::enqueue_commit(handle, session);
        }
        Ok(())
    }

    /// Reconcile a new value against the active binding.
    pub fn reconcile(
        handle: &SlotHandle,
        value: Bindable,
        session: &mut RenderSession,
    ) -> Result<(), RenderError> {
        let (part, kind, current) = {
            let slot = handle.borrow();
            let binding = slot.binding.borrow();
            (binding.part().clone(), slot.kind, binding.directive())
        };
        let (directive, inner) = split_value(value, &part, session)?;

        if Rc::ptr_eq(&current, &directive) {
            directive.ensure_value(&inner, &part)?;
            let binding = handle.borrow().binding.clone();
            let needs_commit = {
                let mut binding = binding.borrow_mut();
                if !binding.should_bind(&inner) {
                    return Ok(());
                }
                binding.bind(inner, session)?
            };
            if needs_commit {
                Slot::enqueue_commit(handle, session);
            }
            return Ok(());
        }

        match kind {
            SlotKind::Strict => Err(RenderError::DirectiveMismatch {
                expected: current.name().to_string(),
                found: directive.name().to_string(),
            }),
            SlotKind::Flexible => {
                tracing::trace!(
                    from = current.name(),
                    to = directive.name(),
                    "slot swapping directive"
                );
                let old = handle.borrow().binding.clone();
                old.borrow_mut().disconnect(session);
                let phase = old.borrow().commit_phase();
                session.enqueue(phase, Effect::BindingRollback(old));

                directive.ensure_value(&inner, &part)?;
                let new_binding = directive.resolve_binding(inner, part)?;
                handle.borrow_mut().binding = new_binding.clone();
                let needs_commit = new_binding.borrow_mut().connect(session)?;
                if needs_commit {
                    Slot::enqueue_commit(handle, session);
                }
                Ok(())
            }
        }
    }

    /// Detach the active binding, scheduling its rollback.
    pub fn disconnect(handle: &SlotHandle, session: &mut RenderSession) {
        let binding = {
            let mut slot = handle.borrow_mut();
            if !slot.connected {
                return;
            }
            slot.connected = false;
            slot.binding.clone()
        };
        binding.borrow_mut().disconnect(session);
        let phase = binding.borrow().commit_phase();
        session.enqueue(phase, Effect::BindingRollback(binding));
    }

    fn enqueue_commit(handle: &SlotHandle, session: &mut RenderSession) {
        let phase = {
            let mut slot = handle.borrow_mut();
            if slot.queued_commit {
                return;
            }
            slot.queued_commit = true;
            let phase = slot.binding.borrow().commit_phase();
            phase
        };
        session.enqueue(phase, Effect::SlotCommit(handle.clone()));
    }

    pub(crate) fn commit(&mut self) {
        self.queued_commit = false;
        self.binding.borrow_mut().commit();
    }

    pub(crate) fn rollback(&mut self) {
        self.binding.borrow_mut().rollback();
    }

    pub(crate) fn part(&self) -> Part {
        self.binding.borrow().part().clone()
    }

    /// The content nodes the active binding owns.
    pub fn content_nodes(&self) -> Vec<Node> {
        self.binding.borrow().content_nodes()
    }
}

/// Split a bindable into the directive that will handle it and the value
/// handed to that directive: directive elements carry their own, everything
/// else resolves to a primitive chosen by the host.
fn split_value(
    value: Bindable,
    part: &Part,
    session: &mut RenderSession,
) -> Result<(Rc<dyn Directive>, Bindable), RenderError> {
    match value {
        Bindable::Directive(element) => {
            Ok((element.directive.clone(), (*element.value).clone()))
        }
        other => {
            let directive = session.host().resolve_primitive(&other, part)?;
            Ok((directive, other))
        }
    }
}
