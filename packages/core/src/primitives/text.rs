//! The text-node primitive: a live text fragment surrounded by fixed
//! literal text.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct TextDirective;

impl Directive for TextDirective {
    fn name(&self) -> &str {
        "text"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        if value.to_text().is_some() {
            Ok(())
        } else {
            Err(RenderError::precondition(
                "text",
                format!("expected a scalar value, got {}", value.type_name()),
            ))
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(TextBinding {
            directive: self,
            part,
            value,
            committed: None,
        })))
    }
}

struct TextBinding {
    directive: Rc<TextDirective>,
    part: Part,
    value: Bindable,
    committed: Option<String>,
}

impl TextBinding {
    fn rendered(&self) -> String {
        let Part::Text {
            preceding,
            following,
            ..
        } = &self.part
        else {
            unreachable!("text binding on a non-text part");
        };
        let text = self.value.to_text().unwrap_or_default();
        format!("{preceding}{text}{following}")
    }
}

impl Binding for TextBinding {
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
        Ok(true)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        let expected = self.rendered();
        let live = self.part.node().data().unwrap_or_default();
        if live != expected {
            return Err(RenderError::HydrationMismatch {
                path: session.walker()?.path(),
                expected: format!("text {expected:?}"),
                found: format!("text {live:?}"),
            });
        }
        self.committed = Some(expected);
        Ok(false)
    }

    fn disconnect(&mut self, _session: &mut RenderSession) {}

    fn commit(&mut self) {
        let rendered = self.rendered();
        if self.committed.as_deref() != Some(rendered.as_str()) {
            self.part.node().set_data(&rendered);
            self.committed = Some(rendered);
        }
    }

    fn rollback(&mut self) {
        if self.committed.take().is_some() {
            self.part.node().set_data("");
        }
    }
}
