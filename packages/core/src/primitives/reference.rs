//! The ref keyword primitive (`:ref`).
//!
//! Hands the part's node to the author once it is live: either by writing
//! a [`crate::bindable::NodeRef`] container or by invoking a callback whose
//! returned cleanup runs on rollback. Commits in the layout phase, after
//! the mutation phase has put the node where it belongs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bindable::{Bindable, RefCleanup};
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::{CommitPhase, RenderSession};

pub(crate) struct RefDirective;

impl Directive for RefDirective {
    fn name(&self) -> &str {
        "ref"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::Null | Bindable::NodeRef(_) | Bindable::RefCallback(_) => Ok(()),
            other => Err(RenderError::precondition(
                "ref",
                format!(
                    "expected a node ref or ref callback, got {}",
                    other.type_name()
                ),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(RefBinding {
            directive: self,
            part,
            value,
            applied: None,
        })))
    }
}

enum Applied {
    Object(crate::bindable::NodeRef),
    Callback(Option<RefCleanup>),
}

struct RefBinding {
    directive: Rc<RefDirective>,
    part: Part,
    value: Bindable,
    applied: Option<Applied>,
}

impl RefBinding {
    fn clear(&mut self) {
        match self.applied.take() {
            Some(Applied::Object(node_ref)) => node_ref.set(None),
            Some(Applied::Callback(Some(cleanup))) => cleanup(),
            _ => {}
        }
    }
}

impl Binding for RefBinding {
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

    fn commit_phase(&self) -> CommitPhase {
        CommitPhase::Layout
    }

    fn commit(&mut self) {
        self.clear();
        let node = self.part.node().clone();
        match &self.value {
            Bindable::NodeRef(node_ref) => {
                node_ref.set(Some(node));
                self.applied = Some(Applied::Object(node_ref.clone()));
            }
            Bindable::RefCallback(callback) => {
                let cleanup = callback.call(node);
                self.applied = Some(Applied::Callback(cleanup));
            }
            _ => {}
        }
    }

    fn rollback(&mut self) {
        self.clear();
    }
}
