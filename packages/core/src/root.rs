//! The root: attach point for a value to a container element.
//!
//! A root is a coroutine like any other; mount, hydrate, update and
//! unmount all schedule it and settle through the same two-phase pipeline.
//! The root's marker comment leads its content (pre-rendered output starts
//! with the marker), so the root part anchors content *after* the marker
//! rather than before it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft_dom::{Namespace, Node};

use crate::bindable::Bindable;
use crate::error::RenderError;
use crate::host::{RenderHost, StandardHost};
use crate::hydration::TreeWalker;
use crate::part::Part;
use crate::scheduler::{
    CommitPhase, Coroutine, CoroutineHandle, Effect, Lanes, ObserverHandle, RenderSession,
    RuntimeEvent, UpdateEngine, UpdateHandle, UpdateOptions, WeakCoroutine,
};
use crate::scope::Scope;
use crate::slot::{Slot, SlotHandle};

enum RootOp {
    Idle,
    Mount,
    Hydrate,
    Unmount,
}

pub(crate) struct RootCoroutine {
    value: Bindable,
    container: Node,
    part: Option<Part>,
    slot: Option<SlotHandle>,
    scope: Rc<Scope>,
    pending_lanes: Cell<Lanes>,
    op: RootOp,
    self_weak: Option<WeakCoroutine>,
}

impl Coroutine for RootCoroutine {
    fn scope(&self) -> Rc<Scope> {
        self.scope.clone()
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
        match std::mem::replace(&mut self.op, RootOp::Idle) {
            RootOp::Mount => {
                let marker = Node::comment("");
                {
                    let container = self.container.clone();
                    let marker = marker.clone();
                    session.enqueue(
                        CommitPhase::Mutation,
                        Effect::Task(Box::new(move || {
                            container.insert_before(&marker, container.first_child().as_ref());
                        })),
                    );
                }
                let part = Part::ChildNode {
                    node: marker.clone(),
                    anchor: Some(marker),
                    namespace: Namespace::Html,
                };
                let slot = Slot::resolve(self.value.clone(), part.clone(), session)?;
                Slot::connect(&slot, session)?;
                self.part = Some(part);
                self.slot = Some(slot);
            }
            RootOp::Hydrate => {
                let marker = Node::comment("");
                session.walker()?.adopt_marker(&marker)?;
                let part = Part::ChildNode {
                    node: marker.clone(),
                    anchor: Some(marker),
                    namespace: Namespace::Html,
                };
                let slot = Slot::resolve(self.value.clone(), part.clone(), session)?;
                Slot::hydrate(&slot, session)?;
                self.part = Some(part);
                self.slot = Some(slot);
            }
            RootOp::Unmount => {
                if let Some(slot) = self.slot.take() {
                    Slot::disconnect(&slot, session);
                }
                if let Some(Part::ChildNode { node, .. }) = self.part.take() {
                    session.enqueue(
                        CommitPhase::Mutation,
                        Effect::Task(Box::new(move || node.detach())),
                    );
                }
            }
            RootOp::Idle => {
                if let Some(slot) = &self.slot {
                    Slot::reconcile(slot, self.value.clone(), session)?;
                }
            }
        }
        self.pending_lanes
            .set(self.pending_lanes.get() - session.lanes());
        Ok(())
    }
}

/// Attaches a [`Bindable`] to a container element.
pub struct Root {
    engine: Rc<UpdateEngine>,
    coroutine: Rc<RefCell<RootCoroutine>>,
    container: Node,
}

impl Root {
    /// A root backed by a fresh [`StandardHost`].
    pub fn new(value: impl Into<Bindable>, container: &Node) -> Root {
        Root::with_host(value, container, StandardHost::new())
    }

    pub fn with_host(
        value: impl Into<Bindable>,
        container: &Node,
        host: Rc<dyn RenderHost>,
    ) -> Root {
        let engine = UpdateEngine::new(host);
        let coroutine = Rc::new(RefCell::new(RootCoroutine {
            value: value.into(),
            container: container.clone(),
            part: None,
            slot: None,
            scope: Scope::root(),
            pending_lanes: Cell::new(Lanes::empty()),
            op: RootOp::Idle,
            self_weak: None,
        }));
        let weak: WeakCoroutine = Rc::downgrade(&(coroutine.clone() as Rc<RefCell<dyn Coroutine>>));
        coroutine.borrow_mut().self_weak = Some(weak.clone());
        coroutine.borrow().scope.set_owner(weak);
        Root {
            engine,
            coroutine,
            container: container.clone(),
        }
    }

    fn schedule(&self, options: &UpdateOptions) -> UpdateHandle {
        let handle: CoroutineHandle = self.coroutine.clone();
        self.engine.schedule_update(&handle, options)
    }

    /// Initial attach from scratch.
    pub fn mount(&self, options: &UpdateOptions) -> UpdateHandle {
        self.coroutine.borrow_mut().op = RootOp::Mount;
        self.schedule(options)
    }

    /// Attach to pre-existing DOM. Rejects with a hydration mismatch when
    /// the container's content does not match the value's shape.
    pub fn hydrate(&self, options: &UpdateOptions) -> UpdateHandle {
        self.coroutine.borrow_mut().op = RootOp::Hydrate;
        self.engine.with_next_frame(|frame| {
            frame.begin_hydration(TreeWalker::new(&self.container));
        });
        self.schedule(options)
    }

    /// Replace the root value.
    pub fn update(&self, value: impl Into<Bindable>, options: &UpdateOptions) -> UpdateHandle {
        self.coroutine.borrow_mut().value = value.into();
        self.schedule(options)
    }

    /// Disconnect and remove everything this root mounted.
    pub fn unmount(&self, options: &UpdateOptions) -> UpdateHandle {
        self.coroutine.borrow_mut().op = RootOp::Unmount;
        self.schedule(options)
    }

    /// Subscribe to engine lifecycle events.
    pub fn observe(&self, observer: impl Fn(&RuntimeEvent) + 'static) -> ObserverHandle {
        self.engine.observe(Rc::new(observer))
    }

    pub fn container(&self) -> &Node {
        &self.container
    }

    pub fn host(&self) -> Rc<dyn RenderHost> {
        self.engine.host()
    }

    pub fn engine(&self) -> Rc<UpdateEngine> {
        self.engine.clone()
    }

    /// Drain all pending work through the host.
    pub fn flush(&self) {
        self.engine.host().flush();
    }
}
