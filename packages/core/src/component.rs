//! Component definitions and the component coroutine.
//!
//! A component wraps a render function into a resumable unit: its binding
//! owns the hook cells, the child slot, a scope nested under the parent's,
//! and pending-lane bookkeeping. Connecting a component enqueues it into
//! the current frame; the actual render happens when the scheduler resumes
//! it. During hydration the resume runs inline instead, because the walker
//! must consume the pre-rendered tree in document order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_dom::Node;

use crate::bindable::{Bindable, DirectiveElement};
use crate::binding::{Binding, BindingHandle, Directive};
use crate::context::RenderContext;
use crate::error::RenderError;
use crate::hooks::HookCell;
use crate::part::Part;
use crate::scheduler::{Coroutine, Effect, Lanes, RenderSession, WeakCoroutine};
use crate::scope::Scope;
use crate::slot::{Slot, SlotHandle};

/// The render function of a component over props `P`.
pub type RenderFn<P> = fn(&P, &mut RenderContext) -> Result<Bindable, RenderError>;

/// A component definition: a named render function plus an optional props
/// comparator. The definition itself is the directive, so component
/// identity is definition identity.
pub struct Component<P: 'static> {
    name: &'static str,
    render: RenderFn<P>,
    props_equal: Option<fn(&P, &P) -> bool>,
}

impl<P: 'static> Component<P> {
    /// A component re-rendered whenever its props handle changes.
    pub fn new(name: &'static str, render: RenderFn<P>) -> ComponentDef<P> {
        ComponentDef(Rc::new(Component {
            name,
            render,
            props_equal: None,
        }))
    }

    /// A component skipped when `props_equal` says the props match.
    pub fn memo(
        name: &'static str,
        render: RenderFn<P>,
        props_equal: fn(&P, &P) -> bool,
    ) -> ComponentDef<P> {
        ComponentDef(Rc::new(Component {
            name,
            render,
            props_equal: Some(props_equal),
        }))
    }
}

/// A shareable component definition handle.
pub struct ComponentDef<P: 'static>(Rc<Component<P>>);

impl<P: 'static> Clone for ComponentDef<P> {
    fn clone(&self) -> Self {
        ComponentDef(self.0.clone())
    }
}

impl<P: 'static> ComponentDef<P> {
    /// Build a component element carrying `props`.
    pub fn el(&self, props: P) -> Bindable {
        Bindable::Directive(DirectiveElement {
            directive: self.0.clone(),
            value: Rc::new(Bindable::Any(Rc::new(props))),
        })
    }
}

fn downcast_props<P: 'static>(value: &Bindable, name: &str) -> Result<Rc<P>, RenderError> {
    match value {
        Bindable::Any(any) => any.clone().downcast::<P>().map_err(|_| {
            RenderError::precondition("component", format!("`{name}` received foreign props"))
        }),
        other => Err(RenderError::precondition(
            "component",
            format!("`{name}` expected props, got {}", other.type_name()),
        )),
    }
}

impl<P: 'static> Directive for Component<P> {
    fn name(&self) -> &str {
        self.name
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        downcast_props::<P>(value, self.name).map(|_| ())
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        let props = downcast_props::<P>(&value, self.name)?;
        let binding = Rc::new(RefCell::new(ComponentBinding {
            component: self,
            props,
            value,
            part,
            hooks: Rc::new(RefCell::new(Vec::new())),
            slot: None,
            scope: None,
            parent_scope: None,
            pending_lanes: Cell::new(Lanes::empty()),
            self_weak: None,
            connected: false,
        }));
        let weak: WeakCoroutine = Rc::downgrade(&(binding.clone() as Rc<RefCell<dyn Coroutine>>));
        binding.borrow_mut().self_weak = Some(weak);
        Ok(binding)
    }
}

pub(crate) struct ComponentBinding<P: 'static> {
    component: Rc<Component<P>>,
    props: Rc<P>,
    value: Bindable,
    part: Part,
    hooks: Rc<RefCell<Vec<HookCell>>>,
    slot: Option<SlotHandle>,
    scope: Option<Rc<Scope>>,
    parent_scope: Option<Rc<Scope>>,
    pending_lanes: Cell<Lanes>,
    self_weak: Option<WeakCoroutine>,
    connected: bool,
}

impl<P: 'static> ComponentBinding<P> {
    fn self_coroutine(&self) -> WeakCoroutine {
        self.self_weak
            .clone()
            .expect("set right after construction")
    }

    fn resume_inner(
        &mut self,
        session: &mut RenderSession,
        hydrating: bool,
    ) -> Result<(), RenderError> {
        let parent = self
            .parent_scope
            .clone()
            .unwrap_or_else(|| session.scope());
        let scope = match &self.scope {
            Some(scope) => scope.clone(),
            None => {
                let scope = Scope::child(&parent);
                scope.set_owner(self.self_coroutine());
                self.scope = Some(scope.clone());
                scope
            }
        };

        let rendered = {
            let mut ctx = RenderContext {
                hooks: self.hooks.clone(),
                cursor: 0,
                coroutine: self.self_coroutine(),
                scope: scope.clone(),
                session,
            };
            match (self.component.render)(&self.props, &mut ctx) {
                Ok(value) => {
                    ctx.finish()?;
                    value
                }
                Err(error @ RenderError::Custom(_)) => {
                    return Err(RenderError::UserRender {
                        name: self.component.name.to_string(),
                        source: Rc::new(error),
                    })
                }
                Err(error) => return Err(error),
            }
        };

        // children created while reconciling nest under this scope
        session.scope = scope;
        match &self.slot {
            None => {
                let slot = Slot::resolve(rendered, self.part.clone(), session)?;
                if hydrating {
                    Slot::hydrate(&slot, session)?;
                } else {
                    Slot::connect(&slot, session)?;
                }
                self.slot = Some(slot);
            }
            Some(slot) => Slot::reconcile(slot, rendered, session)?,
        }

        self.pending_lanes
            .set(self.pending_lanes.get() - session.lanes());
        Ok(())
    }
}

impl<P: 'static> Binding for ComponentBinding<P> {
    fn directive(&self) -> Rc<dyn Directive> {
        self.component.clone()
    }

    fn part(&self) -> &Part {
        &self.part
    }

    fn value(&self) -> &Bindable {
        &self.value
    }

    fn should_bind(&self, new: &Bindable) -> bool {
        if !self.connected {
            return true;
        }
        let Ok(next) = downcast_props::<P>(new, self.component.name) else {
            return true;
        };
        match self.component.props_equal {
            Some(props_equal) => !props_equal(&self.props, &next),
            // default comparator: reference equality
            None => !Rc::ptr_eq(&self.props, &next),
        }
    }

    fn bind(&mut self, value: Bindable, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.props = downcast_props::<P>(&value, self.component.name)?;
        self.value = value;
        // re-render in this same frame
        self.pending_lanes
            .set(self.pending_lanes.get() | session.lanes());
        if let Some(coroutine) = self.self_coroutine().upgrade() {
            session.enqueue_coroutine(&coroutine, session.lanes());
        }
        Ok(false)
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.parent_scope = Some(session.scope());
        self.connected = true;
        if session.hydrating() {
            self.resume_inner(session, true)?;
        } else {
            self.pending_lanes
                .set(self.pending_lanes.get() | session.lanes());
            if let Some(coroutine) = self.self_coroutine().upgrade() {
                session.enqueue_coroutine(&coroutine, session.lanes());
            }
        }
        Ok(false)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.parent_scope = Some(session.scope());
        self.connected = true;
        self.resume_inner(session, true)?;
        Ok(false)
    }

    fn disconnect(&mut self, session: &mut RenderSession) {
        self.connected = false;
        // child slot first, so cleanups commit child-before-parent
        if let Some(slot) = &self.slot {
            Slot::disconnect(slot, session);
        }
        let cells: Vec<HookCell> = self.hooks.borrow().iter().rev().cloned().collect();
        for cell in cells {
            if let HookCell::Effect(cell) = cell {
                let epoch = cell.current_epoch();
                session.enqueue(cell.queue(), Effect::HookCleanup { cell, epoch });
            }
        }
        // dropping the cells tears down store subscriptions
        self.hooks.borrow_mut().clear();
        self.pending_lanes.set(Lanes::empty());
    }

    fn commit(&mut self) {}

    fn rollback(&mut self) {}

    fn content_nodes(&self) -> Vec<Node> {
        match &self.slot {
            Some(slot) => slot.borrow().content_nodes(),
            None => Vec::new(),
        }
    }
}

impl<P: 'static> Coroutine for ComponentBinding<P> {
    fn scope(&self) -> Rc<Scope> {
        // errors bubble from the parent scope: a boundary never catches
        // its own render failure
        self.parent_scope
            .clone()
            .unwrap_or_else(Scope::root)
    }

    fn pending_lanes(&self) -> Lanes {
        self.pending_lanes.get()
    }

    fn add_lanes(&self, lanes: Lanes) {
        self.pending_lanes.set(self.pending_lanes.get() | lanes);
    }

    fn clear_lanes(&self, lanes: Lanes) {
        self.pending_lanes.set(self.pending_lanes.get() - lanes);
    }

    fn resume(&mut self, session: &mut RenderSession) -> Result<(), RenderError> {
        if !self.connected {
            // disconnected before this frame drained; nothing to do
            self.pending_lanes.set(Lanes::empty());
            return Ok(());
        }
        tracing::trace!(component = self.component.name, "resuming");
        let hydrating = session.hydrating();
        self.resume_inner(session, hydrating)
    }
}
