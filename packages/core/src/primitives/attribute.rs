//! The attribute primitive.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct AttributeDirective;

impl Directive for AttributeDirective {
    fn name(&self) -> &str {
        "attribute"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::Null
            | Bindable::Text(_)
            | Bindable::Int(_)
            | Bindable::Float(_)
            | Bindable::Bool(_) => Ok(()),
            other => Err(RenderError::precondition(
                "attribute",
                format!("expected a scalar value, got {}", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(AttributeBinding {
            directive: self,
            part,
            value,
            committed: None,
        })))
    }
}

/// What the last commit left on the element, memoised so commits are
/// idempotent and rollback knows whether to clear.
#[derive(PartialEq)]
enum Committed {
    Value(String),
    Toggled,
}

struct AttributeBinding {
    directive: Rc<AttributeDirective>,
    part: Part,
    value: Bindable,
    committed: Option<Committed>,
}

impl AttributeBinding {
    fn name(&self) -> &str {
        match &self.part {
            Part::Attribute { name, .. } => name,
            _ => unreachable!("attribute binding on a non-attribute part"),
        }
    }
}

impl Binding for AttributeBinding {
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

    fn bind(&mut self, value: Bindable, _session: &mut RenderSession) -> Result<bool, RenderError> {
        self.value = value;
        Ok(true)
    }

    fn connect(&mut self, _session: &mut RenderSession) -> Result<bool, RenderError> {
        Ok(!self.value.is_null())
    }

    fn hydrate(&mut self, _session: &mut RenderSession) -> Result<bool, RenderError> {
        // the pre-rendered tree already carries the attribute
        self.committed = match &self.value {
            Bindable::Bool(true) => Some(Committed::Toggled),
            Bindable::Null | Bindable::Bool(false) => None,
            other => other.to_text().map(Committed::Value),
        };
        Ok(false)
    }

    fn disconnect(&mut self, _session: &mut RenderSession) {}

    fn commit(&mut self) {
        let node = self.part.node().clone();
        let name = self.name().to_string();
        match &self.value {
            Bindable::Null | Bindable::Bool(false) => {
                if self.committed.take().is_some() {
                    node.remove_attribute(&name);
                }
            }
            Bindable::Bool(true) => {
                if self.committed != Some(Committed::Toggled) {
                    node.toggle_attribute(&name, true);
                    self.committed = Some(Committed::Toggled);
                }
            }
            other => {
                let text = other.to_text().unwrap_or_default();
                if self.committed != Some(Committed::Value(text.clone())) {
                    node.set_attribute(&name, &text);
                    self.committed = Some(Committed::Value(text));
                }
            }
        }
    }

    fn rollback(&mut self) {
        if self.committed.take().is_some() {
            let name = self.name().to_string();
            self.part.node().remove_attribute(&name);
        }
    }
}
