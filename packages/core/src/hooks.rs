//! Hook cells: ordered per-coroutine local state.
//!
//! Cells are created on the first render and addressed positionally on
//! every render after that; the trailing `Finalizer` sentinel catches
//! renders that finish at a different index. Reaching a cell of a
//! different kind raises [`crate::RenderError::HookOrderViolation`] before
//! any DOM effect is produced.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::scheduler::{
    CommitPhase, Lanes, UpdateEngine, UpdateOptions, WeakCoroutine,
};

/// One positional cell of a coroutine's hook list.
#[derive(Clone)]
pub(crate) enum HookCell {
    State(Rc<StateCell>),
    Memo(Rc<MemoCell>),
    Ref(Rc<dyn Any>),
    Identifier(Rc<str>),
    Effect(Rc<EffectCell>),
    Finalizer,
}

impl HookCell {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            HookCell::State(_) => "state",
            HookCell::Memo(_) => "memo",
            HookCell::Ref(_) => "ref",
            HookCell::Identifier(_) => "identifier",
            HookCell::Effect(cell) => cell.kind(),
            HookCell::Finalizer => "finalizer",
        }
    }
}

/// Reducer-style state storage. `use_state` is the degenerate reducer
/// whose operation replaces the value outright.
pub(crate) struct StateCell {
    value: RefCell<Rc<dyn Any>>,
    pending: RefCell<Option<Rc<dyn Any>>>,
    pending_lanes: Cell<Lanes>,
}

impl StateCell {
    pub(crate) fn new(initial: Rc<dyn Any>) -> StateCell {
        StateCell {
            value: RefCell::new(initial),
            pending: RefCell::new(None),
            pending_lanes: Cell::new(Lanes::empty()),
        }
    }

    /// The value the next render should observe: staged if present.
    pub(crate) fn latest(&self) -> Rc<dyn Any> {
        self.pending
            .borrow()
            .clone()
            .unwrap_or_else(|| self.value.borrow().clone())
    }

    pub(crate) fn current(&self) -> Rc<dyn Any> {
        self.value.borrow().clone()
    }

    pub(crate) fn pending(&self) -> Option<Rc<dyn Any>> {
        self.pending.borrow().clone()
    }

    pub(crate) fn stage(&self, next: Rc<dyn Any>, lanes: Lanes) {
        *self.pending.borrow_mut() = Some(next);
        self.pending_lanes.set(self.pending_lanes.get() | lanes);
    }

    /// Promote the staged value when this frame's lanes overlap the lanes
    /// it was staged under.
    pub(crate) fn reconcile(&self, frame_lanes: Lanes) {
        if !(self.pending_lanes.get() & frame_lanes).is_empty() {
            if let Some(next) = self.pending.borrow_mut().take() {
                *self.value.borrow_mut() = next;
            }
            self.pending_lanes
                .set(self.pending_lanes.get() - frame_lanes);
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        !self.pending_lanes.get().is_empty()
    }
}

pub(crate) struct MemoCell {
    pub(crate) value: RefCell<Rc<dyn Any>>,
    pub(crate) deps: RefCell<Rc<dyn Any>>,
}

/// The phase an effect hook registers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectPhase {
    Insertion,
    Layout,
    Passive,
}

impl EffectPhase {
    pub(crate) fn queue(self) -> CommitPhase {
        match self {
            EffectPhase::Insertion => CommitPhase::Mutation,
            EffectPhase::Layout => CommitPhase::Layout,
            EffectPhase::Passive => CommitPhase::Passive,
        }
    }
}

/// Cleanup returned by an effect callback.
pub type EffectCleanup = Box<dyn FnOnce()>;

type EffectFn = Box<dyn FnOnce() -> Option<EffectCleanup>>;

/// An effect registration. The epoch guards queued work: a commit only
/// runs for the registration that enqueued it, never for a superseded one.
pub struct EffectCell {
    phase: EffectPhase,
    callback: RefCell<Option<EffectFn>>,
    cleanup: RefCell<Option<EffectCleanup>>,
    deps: RefCell<Option<Rc<dyn Any>>>,
    epoch: Cell<u64>,
}

impl EffectCell {
    pub(crate) fn new(phase: EffectPhase) -> EffectCell {
        EffectCell {
            phase,
            callback: RefCell::new(None),
            cleanup: RefCell::new(None),
            deps: RefCell::new(None),
            epoch: Cell::new(0),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self.phase {
            EffectPhase::Insertion => "insertion-effect",
            EffectPhase::Layout => "layout-effect",
            EffectPhase::Passive => "passive-effect",
        }
    }

    pub(crate) fn queue(&self) -> CommitPhase {
        self.phase.queue()
    }

    pub(crate) fn is_fresh(&self) -> bool {
        self.epoch.get() == 0
    }

    pub(crate) fn deps(&self) -> Option<Rc<dyn Any>> {
        self.deps.borrow().clone()
    }

    /// Install a new registration, superseding any queued one.
    pub(crate) fn register(&self, callback: EffectFn, deps: Option<Rc<dyn Any>>) -> u64 {
        let epoch = self.epoch.get() + 1;
        self.epoch.set(epoch);
        *self.callback.borrow_mut() = Some(callback);
        *self.deps.borrow_mut() = deps;
        epoch
    }

    pub(crate) fn current_epoch(&self) -> u64 {
        self.epoch.get()
    }

    /// Commit one registration: the previous cleanup strictly before the
    /// new callback.
    pub(crate) fn run(&self, epoch: u64) {
        if self.epoch.get() != epoch {
            return;
        }
        if let Some(cleanup) = self.cleanup.borrow_mut().take() {
            cleanup();
        }
        let callback = self.callback.borrow_mut().take();
        if let Some(callback) = callback {
            *self.cleanup.borrow_mut() = callback();
        }
    }

    /// Commit a teardown-only registration (disconnect path).
    pub(crate) fn run_cleanup(&self, epoch: u64) {
        if self.epoch.get() != epoch {
            return;
        }
        if let Some(cleanup) = self.cleanup.borrow_mut().take() {
            cleanup();
        }
    }
}

/// Dependency list compared between renders. Implemented for tuples of
/// comparable values; the unit tuple never changes, so `ONCE` runs a hook
/// body exactly once.
pub trait Deps: 'static {
    fn changed(&self, previous: &Self) -> bool;
}

/// Dependency value for "run once".
pub const ONCE: Option<()> = Some(());

/// Dependency value for "run every render".
pub const ALWAYS: Option<()> = None;

macro_rules! impl_deps {
    ($($name:ident)*) => {
        impl<$($name: PartialEq + 'static),*> Deps for ($($name,)*) {
            fn changed(&self, previous: &Self) -> bool {
                self != previous
            }
        }
    };
}

impl Deps for () {
    fn changed(&self, _previous: &Self) -> bool {
        false
    }
}

impl_deps!(A);
impl_deps!(A B);
impl_deps!(A B C);
impl_deps!(A B C D);
impl_deps!(A B C D E);
impl_deps!(A B C D E F);
impl_deps!(A B C D E F G);
impl_deps!(A B C D E F G H);

/// Schedules an update of the owning coroutine with a staged value.
pub struct StateSetter<T: 'static> {
    pub(crate) cell: Rc<StateCell>,
    pub(crate) coroutine: WeakCoroutine,
    pub(crate) engine: Weak<UpdateEngine>,
    pub(crate) _value: PhantomData<fn(T)>,
}

impl<T: 'static> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        StateSetter {
            cell: self.cell.clone(),
            coroutine: self.coroutine.clone(),
            engine: self.engine.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: 'static> StateSetter<T> {
    pub fn set(&self, next: T) {
        self.set_with(next, &UpdateOptions::default());
    }

    /// Stage `next` and schedule the owning coroutine; the write becomes
    /// observable on the frame whose lanes cover it.
    pub fn set_with(&self, next: T, options: &UpdateOptions) {
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        let lanes = Lanes::from_options(options, engine.host().current_priority());
        self.cell.stage(Rc::new(next), lanes);
        engine.schedule_deferred(self.coroutine.clone(), lanes);
        if options.immediate {
            engine.host().flush();
        }
    }
}

/// Schedules an update computed by a reducer.
pub struct Dispatch<A: 'static> {
    pub(crate) cell: Rc<StateCell>,
    pub(crate) reduce: Rc<dyn Fn(Rc<dyn Any>, A) -> Rc<dyn Any>>,
    pub(crate) coroutine: WeakCoroutine,
    pub(crate) engine: Weak<UpdateEngine>,
}

impl<A: 'static> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Dispatch {
            cell: self.cell.clone(),
            reduce: self.reduce.clone(),
            coroutine: self.coroutine.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<A: 'static> Dispatch<A> {
    pub fn dispatch(&self, action: A) {
        self.dispatch_with(action, &UpdateOptions::default());
    }

    pub fn dispatch_with(&self, action: A, options: &UpdateOptions) {
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        let lanes = Lanes::from_options(options, engine.host().current_priority());
        let next = (self.reduce)(self.cell.latest(), action);
        self.cell.stage(next, lanes);
        engine.schedule_deferred(self.coroutine.clone(), lanes);
        if options.immediate {
            engine.host().flush();
        }
    }
}

/// Unsubscribe callback returned by an external store's subscribe.
pub type Unsubscribe = Box<dyn FnOnce()>;

/// The subscribe half of the external-store contract.
pub type SubscribeFn = Rc<dyn Fn(Rc<dyn Fn()>) -> Unsubscribe>;

/// Cell state behind `use_sync_external_store`.
pub(crate) struct StoreCell<T> {
    pub(crate) snapshot: RefCell<T>,
    pub(crate) subscribe_ptr: Cell<usize>,
    pub(crate) guard: RefCell<Option<StoreGuard>>,
}

/// Unsubscribes when replaced or dropped.
pub(crate) struct StoreGuard(pub(crate) Option<Unsubscribe>);

impl Drop for StoreGuard {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.0.take() {
            unsubscribe();
        }
    }
}
