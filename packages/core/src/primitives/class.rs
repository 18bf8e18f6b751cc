//! The class keyword primitive (`:class`).
//!
//! Accepts a string, a list of strings, or a keyed-boolean map, diffs the
//! resolved token set against the memoised one, and toggles only the
//! difference.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;

pub(crate) struct ClassDirective;

impl Directive for ClassDirective {
    fn name(&self) -> &str {
        "class"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        resolve_tokens(value).map(|_| ())
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(ClassBinding {
            directive: self,
            part,
            value,
            committed: Vec::new(),
        })))
    }
}

fn resolve_tokens(value: &Bindable) -> Result<Vec<String>, RenderError> {
    match value {
        Bindable::Null => Ok(Vec::new()),
        Bindable::Text(text) => Ok(text
            .split_ascii_whitespace()
            .map(|t| t.to_string())
            .collect()),
        Bindable::List(items) => {
            let mut tokens = Vec::new();
            for item in items.iter() {
                match item {
                    Bindable::Null => {}
                    Bindable::Text(text) => tokens.push(text.to_string()),
                    other => {
                        return Err(RenderError::precondition(
                            "class",
                            format!("list entries must be strings, got {}", other.type_name()),
                        ))
                    }
                }
            }
            Ok(tokens)
        }
        Bindable::Map(entries) => {
            let mut tokens = Vec::new();
            for (name, enabled) in entries.iter() {
                match enabled {
                    Bindable::Bool(true) => tokens.push(name.to_string()),
                    Bindable::Bool(false) | Bindable::Null => {}
                    other => {
                        return Err(RenderError::precondition(
                            "class",
                            format!("map entries must be booleans, got {}", other.type_name()),
                        ))
                    }
                }
            }
            Ok(tokens)
        }
        other => Err(RenderError::precondition(
            "class",
            format!(
                "expected a string, list or boolean map, got {}",
                other.type_name()
            ),
        )),
    }
}

struct ClassBinding {
    directive: Rc<ClassDirective>,
    part: Part,
    value: Bindable,
    committed: Vec<String>,
}

impl Binding for ClassBinding {
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
        let desired = resolve_tokens(&self.value).unwrap_or_default();
        let node = self.part.node().clone();
        for token in &self.committed {
            if !desired.contains(token) {
                node.toggle_class(token, false);
            }
        }
        for token in &desired {
            if !self.committed.contains(token) {
                node.toggle_class(token, true);
            }
        }
        self.committed = desired;
    }

    fn rollback(&mut self) {
        let node = self.part.node().clone();
        for token in self.committed.drain(..) {
            node.toggle_class(&token, false);
        }
    }
}
