//! The property and live primitives.
//!
//! Both write element properties; the live variant first compares against
//! the value the DOM currently reports, so a user's in-flight edit of a
//! control is never clobbered by a no-op re-render.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::PropertyValue;

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct PropertyDirective {
    pub(crate) live: bool,
}

impl Directive for PropertyDirective {
    fn name(&self) -> &str {
        if self.live {
            "live"
        } else {
            "property"
        }
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        if value.to_property().is_some() {
            Ok(())
        } else {
            Err(RenderError::precondition(
                if self.live { "live" } else { "property" },
                format!("expected a scalar value, got {}", value.type_name()),
            ))
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(PropertyBinding {
            directive: self,
            part,
            value,
            committed: None,
        })))
    }
}

struct PropertyBinding {
    directive: Rc<PropertyDirective>,
    part: Part,
    value: Bindable,
    committed: Option<PropertyValue>,
}

impl PropertyBinding {
    fn name(&self) -> &str {
        match &self.part {
            Part::Property { name, .. } | Part::Live { name, .. } => name,
            _ => unreachable!("property binding on a non-property part"),
        }
    }

    fn default(&self) -> PropertyValue {
        match &self.part {
            Part::Property { default, .. } | Part::Live { default, .. } => default.clone(),
            _ => PropertyValue::Null,
        }
    }
}

impl Binding for PropertyBinding {
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

    fn disconnect(&mut self, _session: &mut RenderSession) {}

    fn commit(&mut self) {
        let Some(next) = self.value.to_property() else {
            return;
        };
        let node = self.part.node().clone();
        let name = self.name().to_string();
        if self.directive.live {
            // compare against what the DOM reports right now
            let current = node.property(&name).unwrap_or(PropertyValue::Null);
            if current.same_value(&next) {
                self.committed = Some(next);
                return;
            }
        } else if self
            .committed
            .as_ref()
            .is_some_and(|prev| prev.same_value(&next))
        {
            return;
        }
        node.set_property(&name, next.clone());
        self.committed = Some(next);
    }

    fn rollback(&mut self) {
        if self.committed.take().is_some() {
            let name = self.name().to_string();
            self.part.node().set_property(&name, self.default());
        }
    }
}
