//! The cooperative, priority-lane update engine.
//!
//! Work arrives as scheduled coroutines, accumulates into the next frame,
//! and drains in two phases: an interruptible render phase that resumes
//! coroutines in enqueue order, then a posted commit callback that applies
//! mutation and layout effects back-to-back and hands passive effects to a
//! background callback. Re-entrant scheduling during a resume lands in the
//! next frame; scheduling from hooks travels over a message channel so a
//! coroutine can schedule itself while the engine still holds its borrow.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_channel::oneshot;

use crate::binding::BindingHandle;
use crate::error::RenderError;
use crate::hooks::EffectCell;
use crate::host::RenderHost;
use crate::hydration::TreeWalker;
use crate::linked_list::{LinkedList, ListHandle};
use crate::scope::Scope;
use crate::slot::SlotHandle;

bitflags! {
    /// Priority lanes. Lanes merge by OR; a frame's lanes are the union of
    /// the lanes contributed by its coroutines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lanes: u8 {
        const DEFAULT = 1 << 0;
        const USER_BLOCKING = 1 << 1;
        const USER_VISIBLE = 1 << 2;
        const BACKGROUND = 1 << 3;
        const VIEW_TRANSITION = 1 << 4;
    }
}

/// Task priorities, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Background,
    UserVisible,
    UserBlocking,
}

impl Priority {
    pub(crate) fn lane(self) -> Lanes {
        match self {
            Priority::UserBlocking => Lanes::USER_BLOCKING,
            Priority::UserVisible => Lanes::USER_VISIBLE,
            Priority::Background => Lanes::BACKGROUND,
        }
    }
}

impl Lanes {
    pub(crate) fn from_options(options: &UpdateOptions, fallback: Priority) -> Lanes {
        let mut lanes = options.priority.unwrap_or(fallback).lane();
        if options.view_transition {
            lanes |= Lanes::VIEW_TRANSITION;
        }
        lanes
    }

    /// The highest priority among the set lanes, if any priority lane is
    /// set at all.
    pub fn highest_priority(self) -> Option<Priority> {
        if self.contains(Lanes::USER_BLOCKING) {
            Some(Priority::UserBlocking)
        } else if self.contains(Lanes::USER_VISIBLE) {
            Some(Priority::UserVisible)
        } else if self.contains(Lanes::BACKGROUND) {
            Some(Priority::Background)
        } else {
            None
        }
    }
}

/// Options accepted by every scheduling surface.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Task priority; defaults to the host's current priority.
    pub priority: Option<Priority>,
    /// Wrap this update's mutation and layout commit in a view transition.
    pub view_transition: bool,
    /// Drain the host synchronously once scheduled.
    pub immediate: bool,
}

impl UpdateOptions {
    pub fn with_priority(priority: Priority) -> UpdateOptions {
        UpdateOptions {
            priority: Some(priority),
            ..Default::default()
        }
    }

    pub fn immediate() -> UpdateOptions {
        UpdateOptions {
            immediate: true,
            ..Default::default()
        }
    }
}

/// A resumable unit of work: a component instance, a signal subscription,
/// or a root.
pub trait Coroutine {
    /// The scope errors bubble from and children nest under.
    fn scope(&self) -> Rc<Scope>;

    fn pending_lanes(&self) -> Lanes;

    fn add_lanes(&self, lanes: Lanes);

    fn clear_lanes(&self, lanes: Lanes);

    /// Run one update. The coroutine clears `pending & frame.lanes` itself.
    fn resume(&mut self, session: &mut RenderSession) -> Result<(), RenderError>;
}

pub type CoroutineHandle = Rc<RefCell<dyn Coroutine>>;
pub type WeakCoroutine = Weak<RefCell<dyn Coroutine>>;

/// Which commit queue an effect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    Mutation,
    Layout,
    Passive,
}

/// A unit of deferred work accumulated during the render phase.
pub(crate) enum Effect {
    SlotCommit(SlotHandle),
    SlotRollback(SlotHandle),
    BindingCommit(BindingHandle),
    BindingRollback(BindingHandle),
    HookRun { cell: Rc<EffectCell>, epoch: u64 },
    HookCleanup { cell: Rc<EffectCell>, epoch: u64 },
    Task(Box<dyn FnOnce()>),
}

impl Effect {
    fn run(self) {
        match self {
            Effect::SlotCommit(slot) => slot.borrow_mut().commit(),
            Effect::SlotRollback(slot) => slot.borrow_mut().rollback(),
            Effect::BindingCommit(binding) => binding.borrow_mut().commit(),
            Effect::BindingRollback(binding) => binding.borrow_mut().rollback(),
            Effect::HookRun { cell, epoch } => cell.run(epoch),
            Effect::HookCleanup { cell, epoch } => cell.run_cleanup(epoch),
            Effect::Task(task) => task(),
        }
    }
}

/// One scheduling unit: a cohort of coroutines plus three FIFO effect
/// queues.
pub(crate) struct Frame {
    pub(crate) lanes: Lanes,
    pub(crate) pending: VecDeque<CoroutineHandle>,
    pub(crate) mutation_effects: Vec<Effect>,
    pub(crate) layout_effects: Vec<Effect>,
    pub(crate) passive_effects: Vec<Effect>,
    pub(crate) completions: Vec<oneshot::Sender<Result<(), RenderError>>>,
    pub(crate) hydrating: bool,
    pub(crate) walker: Option<TreeWalker>,
}

impl Frame {
    fn new() -> Frame {
        Frame {
            lanes: Lanes::empty(),
            pending: VecDeque::new(),
            mutation_effects: Vec::new(),
            layout_effects: Vec::new(),
            passive_effects: Vec::new(),
            completions: Vec::new(),
            hydrating: false,
            walker: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.completions.is_empty()
    }

    /// Insert a coroutine at most once per frame; re-entrant schedules OR
    /// lane bits without duplicating the entry.
    fn enqueue_coroutine(&mut self, coroutine: &CoroutineHandle) {
        let present = self
            .pending
            .iter()
            .any(|c| Rc::ptr_eq(c, coroutine));
        if !present {
            self.pending.push_back(coroutine.clone());
        }
    }

    fn push_effect(&mut self, phase: CommitPhase, effect: Effect) {
        match phase {
            CommitPhase::Mutation => self.mutation_effects.push(effect),
            CommitPhase::Layout => self.layout_effects.push(effect),
            CommitPhase::Passive => self.passive_effects.push(effect),
        }
    }
}

/// Render-phase access handed to every `resume`, `connect` and
/// `reconcile`: the engine, the frame being assembled, and the current
/// scope.
pub struct RenderSession<'a> {
    pub(crate) engine: Rc<UpdateEngine>,
    pub(crate) frame: &'a mut Frame,
    pub(crate) scope: Rc<Scope>,
    pub(crate) lanes: Lanes,
}

impl RenderSession<'_> {
    pub fn host(&self) -> Rc<dyn RenderHost> {
        self.engine.host.clone()
    }

    pub fn engine(&self) -> Rc<UpdateEngine> {
        self.engine.clone()
    }

    pub fn lanes(&self) -> Lanes {
        self.lanes
    }

    pub fn scope(&self) -> Rc<Scope> {
        self.scope.clone()
    }

    pub(crate) fn enqueue(&mut self, phase: CommitPhase, effect: Effect) {
        self.frame.push_effect(phase, effect);
    }

    /// Enqueue an arbitrary commit-phase task. Custom directives use this
    /// for work that must wait for the commit (subscriptions, adoptions).
    pub fn enqueue_task(&mut self, phase: CommitPhase, task: impl FnOnce() + 'static) {
        self.frame.push_effect(phase, Effect::Task(Box::new(task)));
    }

    /// Enqueue a coroutine into the *current* frame. Used when a resume
    /// discovers nested coroutines (child components) that must render in
    /// the same frame. The caller maintains the coroutine's pending lanes
    /// itself - this never borrows the handle, so a binding may enqueue
    /// its own coroutine while the engine holds its borrow.
    pub(crate) fn enqueue_coroutine(&mut self, coroutine: &CoroutineHandle, lanes: Lanes) {
        self.frame.lanes |= lanes;
        self.frame.enqueue_coroutine(coroutine);
    }

    /// Whether this frame re-associates pre-rendered DOM instead of
    /// building fresh nodes.
    pub fn hydrating(&self) -> bool {
        self.frame.hydrating
    }

    pub(crate) fn walker(&mut self) -> Result<&mut TreeWalker, RenderError> {
        self.frame.walker.as_mut().ok_or_else(|| {
            RenderError::HydrationMismatch {
                path: "<root>".to_string(),
                expected: "an active hydration walk".to_string(),
                found: "none".to_string(),
            }
        })
    }
}

/// Lifecycle events surfaced to observers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    UpdateScheduled { lanes: Lanes },
    RenderStarted { lanes: Lanes },
    RenderFinished { lanes: Lanes },
    CommitFinished { lanes: Lanes },
    FrameFailed { error: RenderError },
}

pub(crate) enum SchedulerMsg {
    Schedule {
        coroutine: WeakCoroutine,
        lanes: Lanes,
    },
}

/// A handle to one scheduled update.
pub struct UpdateHandle {
    priority: Priority,
    lanes: Lanes,
    coroutine: WeakCoroutine,
    done: oneshot::Receiver<Result<(), RenderError>>,
}

impl UpdateHandle {
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Cancel this update if its resume has not run yet: the coroutine's
    /// lane bits are cleared, and a coroutine with no pending lanes is
    /// skipped by the render phase.
    pub fn abort(&self) {
        if let Some(coroutine) = self.coroutine.upgrade() {
            coroutine.borrow().clear_lanes(self.lanes);
        }
    }

    /// Wait for the frame that carried this update to commit or reject.
    pub async fn wait(self) -> Result<(), RenderError> {
        match self.done.await {
            Ok(result) => result,
            // the engine disappeared before the frame settled
            Err(oneshot::Canceled) => Ok(()),
        }
    }
}

pub struct UpdateEngine {
    host: Rc<dyn RenderHost>,
    tx: UnboundedSender<SchedulerMsg>,
    rx: RefCell<UnboundedReceiver<SchedulerMsg>>,
    next_frame: RefCell<Frame>,
    callback_requested: Cell<Lanes>,
    observers: RefCell<LinkedList<Rc<dyn Fn(&RuntimeEvent)>>>,
}

impl UpdateEngine {
    pub fn new(host: Rc<dyn RenderHost>) -> Rc<UpdateEngine> {
        let (tx, rx) = unbounded();
        Rc::new(UpdateEngine {
            host,
            tx,
            rx: RefCell::new(rx),
            next_frame: RefCell::new(Frame::new()),
            callback_requested: Cell::new(Lanes::empty()),
            observers: RefCell::new(LinkedList::new()),
        })
    }

    pub fn host(&self) -> Rc<dyn RenderHost> {
        self.host.clone()
    }

    /// Subscribe to engine lifecycle events; the returned handle
    /// unsubscribes in O(1).
    pub fn observe(self: &Rc<Self>, observer: Rc<dyn Fn(&RuntimeEvent)>) -> ObserverHandle {
        let handle = self.observers.borrow_mut().push_back(observer);
        ObserverHandle {
            engine: Rc::downgrade(self),
            handle,
        }
    }

    fn notify(&self, event: &RuntimeEvent) {
        // observers may unsubscribe mid-notification; snapshot first
        let observers: Vec<_> = self.observers.borrow().iter().cloned().collect();
        for observer in observers {
            observer(event);
        }
    }

    /// Schedule an update of `coroutine`. Must not be called while the
    /// engine is resuming that coroutine; hook setters use the message
    /// channel instead.
    pub fn schedule_update(
        self: &Rc<Self>,
        coroutine: &CoroutineHandle,
        options: &UpdateOptions,
    ) -> UpdateHandle {
        let fallback = self.host.current_priority();
        let lanes = Lanes::from_options(options, fallback);
        let priority = lanes.highest_priority().unwrap_or(fallback);

        coroutine.borrow().add_lanes(lanes);
        let (sender, receiver) = oneshot::channel();
        {
            let mut frame = self.next_frame.borrow_mut();
            frame.lanes |= lanes;
            frame.enqueue_coroutine(coroutine);
            frame.completions.push(sender);
        }
        self.notify(&RuntimeEvent::UpdateScheduled { lanes });
        self.request_frame_callback(priority);

        let handle = UpdateHandle {
            priority,
            lanes,
            coroutine: Rc::downgrade(coroutine),
            done: receiver,
        };
        if options.immediate {
            self.host.flush();
        }
        handle
    }

    /// Schedule from inside a render: travels over the message channel so
    /// no coroutine borrow is touched until the next callback fires.
    pub(crate) fn schedule_deferred(self: &Rc<Self>, coroutine: WeakCoroutine, lanes: Lanes) {
        let priority = lanes
            .highest_priority()
            .unwrap_or_else(|| self.host.current_priority());
        let _ = self.tx.unbounded_send(SchedulerMsg::Schedule { coroutine, lanes });
        self.notify(&RuntimeEvent::UpdateScheduled { lanes });
        self.request_frame_callback(priority);
    }

    fn drain_messages(&self) {
        let mut frame = self.next_frame.borrow_mut();
        while let Ok(Some(msg)) = self.rx.borrow_mut().try_next() {
            match msg {
                SchedulerMsg::Schedule { coroutine, lanes } => {
                    if let Some(coroutine) = coroutine.upgrade() {
                        coroutine.borrow().add_lanes(lanes);
                        frame.lanes |= lanes;
                        frame.enqueue_coroutine(&coroutine);
                    }
                }
            }
        }
    }

    fn request_frame_callback(self: &Rc<Self>, priority: Priority) {
        let bit = priority.lane();
        if self.callback_requested.get().contains(bit) {
            return;
        }
        self.callback_requested.set(self.callback_requested.get() | bit);
        let engine = self.clone();
        self.host
            .request_callback(Box::new(move || engine.drive(priority)), priority);
    }

    fn drive(self: Rc<Self>, priority: Priority) {
        self.callback_requested
            .set(self.callback_requested.get() - priority.lane());
        self.drain_messages();
        let frame = self.next_frame.replace(Frame::new());
        if frame.is_empty() {
            return;
        }
        tracing::trace!(lanes = ?frame.lanes, "rendering frame");
        let engine = self.clone();
        self.host
            .spawn_local(Box::pin(async move { engine.render_frame(frame).await }));
    }

    /// Take a pre-assembled frame (hydration seeds the walker this way)
    /// and run it through the normal pipeline.
    pub(crate) fn with_next_frame(&self, configure: impl FnOnce(&mut FrameConfig)) {
        let mut frame = self.next_frame.borrow_mut();
        let mut config = FrameConfig { frame: &mut frame };
        configure(&mut config);
    }

    async fn render_frame(self: Rc<Self>, mut frame: Frame) {
        self.notify(&RuntimeEvent::RenderStarted { lanes: frame.lanes });
        while let Some(coroutine) = frame.pending.pop_front() {
            let pending = coroutine.borrow().pending_lanes();
            if (pending & frame.lanes).is_empty() {
                // cancelled, or a no-op entry
                continue;
            }
            let scope = coroutine.borrow().scope();
            let lanes = frame.lanes;
            let result = {
                let mut session = RenderSession {
                    engine: self.clone(),
                    frame: &mut frame,
                    scope: scope.clone(),
                    lanes,
                };
                coroutine.borrow_mut().resume(&mut session)
            };
            if let Err(error) = result {
                coroutine.borrow().clear_lanes(Lanes::all());
                if !self.recover(&scope, &error, frame.lanes) {
                    self.reject_frame(frame, error);
                    return;
                }
            }
            if self.host.should_yield() {
                self.host.yield_to_main().await;
            }
        }
        self.notify(&RuntimeEvent::RenderFinished { lanes: frame.lanes });

        let priority = frame
            .lanes
            .highest_priority()
            .unwrap_or_else(|| self.host.current_priority());
        let engine = self.clone();
        self.host.request_callback(
            Box::new(move || engine.commit_frame(frame)),
            priority,
        );
    }

    /// Route an error to the nearest boundary up the scope chain. Returns
    /// `false` when no boundary exists and the frame must be rejected.
    fn recover(self: &Rc<Self>, scope: &Rc<Scope>, error: &RenderError, lanes: Lanes) -> bool {
        match scope.find_boundary() {
            Some((cell, owner)) => {
                tracing::trace!(%error, "error caught by boundary");
                cell.catch(error.clone());
                let lanes = lanes
                    .highest_priority()
                    .map(Priority::lane)
                    .unwrap_or(Lanes::USER_VISIBLE);
                self.schedule_deferred(Rc::downgrade(&owner), lanes);
                true
            }
            None => false,
        }
    }

    fn reject_frame(&self, mut frame: Frame, error: RenderError) {
        tracing::trace!(%error, "frame rejected");
        self.notify(&RuntimeEvent::FrameFailed {
            error: error.clone(),
        });
        for sender in frame.completions.drain(..) {
            let _ = sender.send(Err(error.clone()));
        }
        // effects of a rejected frame never commit
    }

    fn commit_frame(self: Rc<Self>, mut frame: Frame) {
        let mutations = std::mem::take(&mut frame.mutation_effects);
        let layouts = std::mem::take(&mut frame.layout_effects);
        let apply = move || {
            for effect in mutations {
                effect.run();
            }
            for effect in layouts {
                effect.run();
            }
        };
        if frame.lanes.contains(Lanes::VIEW_TRANSITION) {
            self.host.start_view_transition(Box::new(apply));
        } else {
            apply();
        }
        self.notify(&RuntimeEvent::CommitFinished { lanes: frame.lanes });
        for sender in frame.completions.drain(..) {
            let _ = sender.send(Ok(()));
        }

        let passive = std::mem::take(&mut frame.passive_effects);
        if !passive.is_empty() {
            self.host.request_callback(
                Box::new(move || {
                    for effect in passive {
                        effect.run();
                    }
                }),
                Priority::Background,
            );
        }
    }
}

/// Mutable access to the frame being assembled, used by roots to seed
/// hydration state.
pub(crate) struct FrameConfig<'a> {
    frame: &'a mut Frame,
}

impl FrameConfig<'_> {
    pub(crate) fn begin_hydration(&mut self, walker: TreeWalker) {
        self.frame.hydrating = true;
        self.frame.walker = Some(walker);
    }
}

/// Unsubscribes its observer when invoked or dropped.
pub struct ObserverHandle {
    engine: Weak<UpdateEngine>,
    handle: ListHandle,
}

impl ObserverHandle {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.upgrade() {
            engine.observers.borrow_mut().remove(self.handle);
        }
    }
}
