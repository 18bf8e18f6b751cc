//! The style keyword primitive (`:style`).

use std::cell::RefCell;
use std::rc::Rc;

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct StyleDirective;

impl Directive for StyleDirective {
    fn name(&self) -> &str {
        "style"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        resolve_declarations(value).map(|_| ())
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(StyleBinding {
            directive: self,
            part,
            value,
            committed: Vec::new(),
        })))
    }
}

fn resolve_declarations(value: &Bindable) -> Result<Vec<(String, String)>, RenderError> {
    match value {
        Bindable::Null => Ok(Vec::new()),
        Bindable::Map(entries) => {
            let mut declarations = Vec::new();
            for (name, entry) in entries.iter() {
                match entry {
                    Bindable::Null => {}
                    other => match other.to_text() {
                        Some(text) => declarations.push((name.to_string(), text)),
                        None => {
                            return Err(RenderError::precondition(
                                "style",
                                format!(
                                    "declaration values must be scalars, got {}",
                                    other.type_name()
                                ),
                            ))
                        }
                    },
                }
            }
            Ok(declarations)
        }
        other => Err(RenderError::precondition(
            "style",
            format!("expected a declaration map, got {}", other.type_name()),
        )),
    }
}

struct StyleBinding {
    directive: Rc<StyleDirective>,
    part: Part,
    value: Bindable,
    committed: Vec<(String, String)>,
}

impl Binding for StyleBinding {
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
        let desired = resolve_declarations(&self.value).unwrap_or_default();
        let node = self.part.node().clone();
        for (name, _) in &self.committed {
            if !desired.iter().any(|(n, _)| n == name) {
                node.remove_style_property(name);
            }
        }
        for (name, value) in &desired {
            let unchanged = self
                .committed
                .iter()
                .any(|(n, v)| n == name && v == value);
            if !unchanged {
                node.set_style_property(name, value);
            }
        }
        self.committed = desired;
    }

    fn rollback(&mut self) {
        let node = self.part.node().clone();
        for (name, _) in self.committed.drain(..) {
            node.remove_style_property(&name);
        }
    }
}
