//! Rendering a signal directly as child content.
//!
//! The binding is its own coroutine: it subscribes to the signal during
//! the passive phase and re-renders its slot at background priority when
//! notified. The memoised version makes notifications cheap to coalesce -
//! a resume that finds the version unchanged does nothing.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use weft_core::{
    Bindable, Binding, BindingHandle, CommitPhase, Coroutine, Directive, Lanes, Part, Priority,
    RenderError, RenderSession, Scope, Slot, SlotHandle, UpdateEngine, UpdateOptions,
    WeakCoroutine,
};
use weft_dom::Node;

use crate::signal::{Signal, SignalInner, Subscription};

/// Bind a signal's value as child content. The subtree re-renders on its
/// own whenever the signal changes; the surrounding template does not.
/// Every call for the same signal yields the same directive identity, so
/// re-rendering parents leave the binding in place.
pub fn bind_signal<T>(signal: &Signal<T>) -> Bindable
where
    T: Clone + Into<Bindable> + 'static,
{
    let directive = {
        let mut cached = signal.inner.directive.borrow_mut();
        match cached.as_ref() {
            Some(directive) => directive.clone(),
            None => {
                let directive: Rc<dyn Directive> = Rc::new(SignalDirective {
                    inner: Rc::downgrade(&signal.inner),
                });
                *cached = Some(directive.clone());
                directive
            }
        }
    };
    Bindable::directive(directive, Bindable::Null)
}

struct SignalDirective<T: 'static> {
    inner: Weak<SignalInner<T>>,
}

impl<T> SignalDirective<T>
where
    T: Clone + Into<Bindable> + 'static,
{
    fn signal(&self) -> Option<Signal<T>> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

impl<T> Directive for SignalDirective<T>
where
    T: Clone + Into<Bindable> + 'static,
{
    fn name(&self) -> &str {
        "signal"
    }

    fn resolve_binding(
        self: Rc<Self>,
        _value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        let signal = self.signal().ok_or_else(|| {
            RenderError::custom("the signal behind this binding no longer exists")
        })?;
        let binding = Rc::new(RefCell::new(SignalBinding {
            directive: self,
            signal,
            part,
            value: Bindable::Null,
            slot: None,
            seen_version: Cell::new(0),
            subscription: None,
            scope: None,
            pending_lanes: Cell::new(Lanes::empty()),
            self_weak: None,
            self_typed: None,
            engine: Weak::new(),
        }));
        let typed = Rc::downgrade(&binding);
        let weak: WeakCoroutine = typed.clone();
        {
            let mut inner = binding.borrow_mut();
            inner.self_typed = Some(typed);
            inner.self_weak = Some(weak);
        }
        Ok(binding)
    }
}

struct SignalBinding<T: 'static> {
    directive: Rc<SignalDirective<T>>,
    signal: Signal<T>,
    part: Part,
    value: Bindable,
    slot: Option<SlotHandle>,
    seen_version: Cell<u64>,
    subscription: Option<Subscription>,
    scope: Option<Rc<Scope>>,
    pending_lanes: Cell<Lanes>,
    self_weak: Option<WeakCoroutine>,
    self_typed: Option<Weak<RefCell<SignalBinding<T>>>>,
    engine: Weak<UpdateEngine>,
}

impl<T> SignalBinding<T>
where
    T: Clone + Into<Bindable> + 'static,
{
    /// Register with the signal; one subscription per binding lifetime.
    fn subscribe(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        let engine = self.engine.clone();
        let coroutine = self
            .self_weak
            .clone()
            .expect("set right after construction");
        let subscriber: Rc<dyn Fn()> = Rc::new(move || {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            let Some(coroutine) = coroutine.upgrade() else {
                return;
            };
            engine.schedule_update(
                &coroutine,
                &UpdateOptions::with_priority(Priority::Background),
            );
        });
        self.subscription = Some(self.signal.subscribe(subscriber));
    }

    fn render_slot(&mut self, session: &mut RenderSession) -> Result<(), RenderError> {
        let content: Bindable = self.signal.value().into();
        self.seen_version.set(self.signal.version());
        match &self.slot {
            None => {
                let slot = Slot::resolve(content, self.part.clone(), session)?;
                if session.hydrating() {
                    Slot::hydrate(&slot, session)?;
                } else {
                    Slot::connect(&slot, session)?;
                }
                self.slot = Some(slot);
            }
            Some(slot) => Slot::reconcile(slot, content, session)?,
        }
        Ok(())
    }
}

impl<T> Binding for SignalBinding<T>
where
    T: Clone + Into<Bindable> + 'static,
{
    fn directive(&self) -> Rc<dyn Directive> {
        self.directive.clone()
    }

    fn part(&self) -> &Part {
        &self.part
    }

    fn value(&self) -> &Bindable {
        &self.value
    }

    fn should_bind(&self, _new: &Bindable) -> bool {
        // the signal drives this binding; parent rebinds carry nothing new
        false
    }

    fn bind(&mut self, _value: Bindable, _session: &mut RenderSession) -> Result<bool, RenderError> {
        Ok(false)
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.engine = Rc::downgrade(&session.engine());
        self.scope = Some(session.scope());
        self.render_slot(session)?;

        // subscription registration belongs to the passive phase; the
        // version check at resume covers anything that fired in between
        let typed = self
            .self_typed
            .clone()
            .expect("set right after construction");
        session.enqueue_task(CommitPhase::Passive, move || {
            if let Some(binding) = typed.upgrade() {
                binding.borrow_mut().subscribe();
            }
        });
        Ok(false)
    }

    fn disconnect(&mut self, session: &mut RenderSession) {
        self.subscription = None;
        if let Some(slot) = &self.slot {
            Slot::disconnect(slot, session);
        }
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

impl<T> Coroutine for SignalBinding<T>
where
    T: Clone + Into<Bindable> + 'static,
{
    fn scope(&self) -> Rc<Scope> {
        self.scope.clone().unwrap_or_else(Scope::root)
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
        self.pending_lanes
            .set(self.pending_lanes.get() - session.lanes());
        if self.signal.version() == self.seen_version.get() {
            // unchanged version means unchanged value: no re-render
            return Ok(());
        }
        self.render_slot(session)
    }
}
