//! The event primitive.
//!
//! The binding registers one listener object and keeps it attached across
//! value changes: when the old and new values are both handlers with the
//! same registration options, only the inner callback is swapped and the
//! DOM listener list is untouched.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::EventListener;

use crate::bindable::{Bindable, EventHandler};
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct EventDirective;

impl Directive for EventDirective {
    fn name(&self) -> &str {
        "event"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::Null | Bindable::Handler(_) => Ok(()),
            other => Err(RenderError::precondition(
                "event",
                format!("expected a handler or null, got {}", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        let slot: Rc<RefCell<Option<EventHandler>>> = Rc::new(RefCell::new(None));
        let listener = {
            let slot = slot.clone();
            EventListener::new(move |event| {
                let handler = slot.borrow().clone();
                if let Some(handler) = handler {
                    handler.call(event);
                }
            })
        };
        Ok(Rc::new(RefCell::new(EventBinding {
            directive: self,
            part,
            value,
            slot,
            listener,
            attached: None,
        })))
    }
}

struct EventBinding {
    directive: Rc<EventDirective>,
    part: Part,
    value: Bindable,
    /// The callback the registered listener object delegates to.
    slot: Rc<RefCell<Option<EventHandler>>>,
    listener: EventListener,
    /// Capture flag the listener is currently registered under.
    attached: Option<bool>,
}

impl EventBinding {
    fn event_name(&self) -> &str {
        match &self.part {
            Part::Event { name, .. } => name,
            _ => unreachable!("event binding on a non-event part"),
        }
    }

    fn detach(&mut self) {
        if let Some(capture) = self.attached.take() {
            let name = self.event_name().to_string();
            self.part
                .node()
                .remove_event_listener(&name, &self.listener, capture);
        }
    }
}

impl Binding for EventBinding {
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
        Ok(matches!(self.value, Bindable::Handler(_)))
    }

    fn disconnect(&mut self, _session: &mut RenderSession) {}

    fn commit(&mut self) {
        match self.value.clone() {
            Bindable::Handler(handler) => {
                let capture = handler.capture();
                match self.attached {
                    Some(current) if current == capture => {
                        // same options: swap the callback, keep the listener
                    }
                    _ => {
                        self.detach();
                        let name = self.event_name().to_string();
                        self.part
                            .node()
                            .add_event_listener(&name, &self.listener, capture);
                        self.attached = Some(capture);
                    }
                }
                *self.slot.borrow_mut() = Some(handler.clone());
            }
            _ => {
                self.detach();
                *self.slot.borrow_mut() = None;
            }
        }
    }

    fn rollback(&mut self) {
        self.detach();
        *self.slot.borrow_mut() = None;
    }
}
