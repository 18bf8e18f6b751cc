//! The element-spread primitive.
//!
//! The bound value is a keyed map; each key is dispatched to the primitive
//! its sigil selects, creating child bindings that the spread binding owns
//! and disposes collectively.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{Node, PropertyValue};

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::{Effect, RenderSession};

pub(crate) struct SpreadDirective;

impl Directive for SpreadDirective {
    fn name(&self) -> &str {
        "spread"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::Null | Bindable::Map(_) => Ok(()),
            other => Err(RenderError::precondition(
                "spread",
                format!("expected a keyed map, got {}", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(SpreadBinding {
            directive: self,
            part,
            value,
            entries: Vec::new(),
        })))
    }
}

/// Build the part a spread key addresses, using the same sigil table the
/// template parser applies to attribute names.
fn child_part(node: &Node, key: &str) -> Part {
    if let Some(name) = key.strip_prefix('@') {
        Part::Event {
            node: node.clone(),
            name: name.into(),
        }
    } else if let Some(name) = key.strip_prefix('.') {
        let default = node.property(name).unwrap_or(PropertyValue::Null);
        Part::Property {
            node: node.clone(),
            name: name.into(),
            default,
        }
    } else if let Some(name) = key.strip_prefix('$') {
        let default = node.property(name).unwrap_or(PropertyValue::Null);
        Part::Live {
            node: node.clone(),
            name: name.into(),
            default,
        }
    } else {
        Part::Attribute {
            node: node.clone(),
            name: key.into(),
        }
    }
}

struct SpreadBinding {
    directive: Rc<SpreadDirective>,
    part: Part,
    value: Bindable,
    entries: Vec<(Rc<str>, BindingHandle)>,
}

impl SpreadBinding {
    fn pairs(&self) -> Vec<(Rc<str>, Bindable)> {
        match &self.value {
            Bindable::Map(entries) => entries.to_vec(),
            _ => Vec::new(),
        }
    }

    fn apply(&mut self, session: &mut RenderSession, hydrating: bool) -> Result<(), RenderError> {
        let pairs = self.pairs();

        // keys gone from the map are disposed
        let mut removed = Vec::new();
        self.entries.retain(|(name, binding)| {
            let keep = pairs.iter().any(|(n, _)| n == name);
            if !keep {
                removed.push(binding.clone());
            }
            keep
        });
        for binding in removed {
            binding.borrow_mut().disconnect(session);
            let phase = binding.borrow().commit_phase();
            session.enqueue(phase, Effect::BindingRollback(binding));
        }

        for (name, value) in pairs {
            if let Some((_, binding)) = self.entries.iter().find(|(n, _)| *n == name) {
                let binding = binding.clone();
                let needs_commit = {
                    let mut binding = binding.borrow_mut();
                    if !binding.should_bind(&value) {
                        continue;
                    }
                    binding.bind(value, session)?
                };
                if needs_commit {
                    let phase = binding.borrow().commit_phase();
                    session.enqueue(phase, Effect::BindingCommit(binding));
                }
            } else {
                let part = child_part(self.part.node(), &name);
                let directive = session.host().resolve_primitive(&value, &part)?;
                directive.ensure_value(&value, &part)?;
                let binding = directive.resolve_binding(value, part)?;
                let needs_commit = if hydrating {
                    binding.borrow_mut().hydrate(session)?
                } else {
                    binding.borrow_mut().connect(session)?
                };
                if needs_commit {
                    let phase = binding.borrow().commit_phase();
                    session.enqueue(phase, Effect::BindingCommit(binding.clone()));
                }
                self.entries.push((name, binding));
            }
        }
        Ok(())
    }
}

impl Binding for SpreadBinding {
    fn directive(&self) -> Rc<dyn Directive> {
        self.directive.clone()
    }

    fn part(&self) -> &Part {
        &self.part
    }

    fn value(&self) -> &Bindable {
        &self.value
    }

    fn should_bind(&self, new: &Bindable) -> bool {
        !self.value.same(new)
    }

    fn bind(&mut self, value: Bindable, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.value = value;
        self.apply(session, false)?;
        Ok(false)
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.apply(session, false)?;
        Ok(false)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.apply(session, true)?;
        Ok(false)
    }

    fn disconnect(&mut self, session: &mut RenderSession) {
        for (_, binding) in &self.entries {
            binding.borrow_mut().disconnect(session);
        }
    }

    fn commit(&mut self) {}

    fn rollback(&mut self) {
        for (_, binding) in &self.entries {
            binding.borrow_mut().rollback();
        }
    }
}
