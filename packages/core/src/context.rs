//! The render context: everything a component render function may do.
//!
//! Hands out template builders (`html`/`svg`/`mathml`), the hook table,
//! shared context access, and error boundaries. Hooks advance a positional
//! cursor over the coroutine's cell list and validate the expected cell
//! kind at every step.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::bindable::{Bindable, EventHandler};
use crate::error::RenderError;
use crate::hooks::{
    Deps, EffectCell, EffectCleanup, EffectPhase, HookCell, MemoCell, StateCell, StateSetter,
    StoreCell, StoreGuard, SubscribeFn, Dispatch,
};
use crate::scheduler::{Effect, Lanes, RenderSession, UpdateOptions, WeakCoroutine};
use crate::scope::{ErrorBoundary, ErrorBoundaryCell, Scope};
use crate::template::{TemplateMode, TemplateStrings};

/// A reusable hook object installed with [`RenderContext::use_custom`].
pub trait CustomHook {
    type Output;

    fn install(&self, ctx: &mut RenderContext) -> Result<Self::Output, RenderError>;
}

pub struct RenderContext<'a, 'f> {
    pub(crate) hooks: Rc<RefCell<Vec<HookCell>>>,
    pub(crate) cursor: usize,
    pub(crate) coroutine: WeakCoroutine,
    pub(crate) scope: Rc<Scope>,
    pub(crate) session: &'a mut RenderSession<'f>,
}

impl RenderContext<'_, '_> {
    // -- templates ----------------------------------------------------------

    /// Build an HTML tagged-template value.
    pub fn html(
        &mut self,
        strings: impl Into<TemplateStrings>,
        binds: Vec<Bindable>,
    ) -> Result<Bindable, RenderError> {
        self.template(strings.into(), binds, TemplateMode::Html)
    }

    /// Build an SVG tagged-template value.
    pub fn svg(
        &mut self,
        strings: impl Into<TemplateStrings>,
        binds: Vec<Bindable>,
    ) -> Result<Bindable, RenderError> {
        self.template(strings.into(), binds, TemplateMode::Svg)
    }

    /// Build a MathML tagged-template value.
    pub fn mathml(
        &mut self,
        strings: impl Into<TemplateStrings>,
        binds: Vec<Bindable>,
    ) -> Result<Bindable, RenderError> {
        self.template(strings.into(), binds, TemplateMode::MathMl)
    }

    fn template(
        &mut self,
        strings: TemplateStrings,
        binds: Vec<Bindable>,
        mode: TemplateMode,
    ) -> Result<Bindable, RenderError> {
        let host = self.session.host();
        crate::template::build(host.as_ref(), mode, strings, binds)
    }

    // -- hook plumbing ------------------------------------------------------

    fn acquire(
        &mut self,
        expected: &'static str,
        create: impl FnOnce(&mut Self) -> Result<HookCell, RenderError>,
    ) -> Result<(HookCell, bool), RenderError> {
        let index = self.cursor;
        self.cursor += 1;
        let existing = self.hooks.borrow().get(index).cloned();
        match existing {
            None => {
                let cell = create(self)?;
                self.hooks.borrow_mut().push(cell.clone());
                Ok((cell, true))
            }
            Some(cell) => {
                if cell.kind() != expected {
                    Err(RenderError::HookOrderViolation {
                        index,
                        expected,
                        found: cell.kind(),
                    })
                } else {
                    Ok((cell, false))
                }
            }
        }
    }

    /// Trailing check: the render finished at the same cell index as every
    /// render before it.
    pub(crate) fn finish(&mut self) -> Result<(), RenderError> {
        let index = self.cursor;
        self.cursor += 1;
        let mut hooks = self.hooks.borrow_mut();
        if index == hooks.len() {
            hooks.push(HookCell::Finalizer);
            return Ok(());
        }
        match hooks.get(index) {
            Some(HookCell::Finalizer) if index + 1 == hooks.len() => Ok(()),
            Some(other) => Err(RenderError::HookOrderViolation {
                index,
                expected: "finalizer",
                found: other.kind(),
            }),
            None => Err(RenderError::HookOrderViolation {
                index,
                expected: "finalizer",
                found: "end of hooks",
            }),
        }
    }

    fn state_cell<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(Rc<StateCell>, T, bool), RenderError> {
        let (cell, _) = self.acquire("state", |_| {
            Ok(HookCell::State(Rc::new(StateCell::new(Rc::new(init())))))
        })?;
        let HookCell::State(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        cell.reconcile(self.session.lanes());
        let value = cell
            .current()
            .downcast::<T>()
            .map_err(|_| RenderError::custom("state cell changed type between renders"))?;
        let pending = cell.is_pending();
        Ok((cell, (*value).clone(), pending))
    }

    // -- hooks --------------------------------------------------------------

    /// Local state: returns the current value, a setter that schedules the
    /// owning coroutine, and whether a staged update is still pending.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, StateSetter<T>, bool), RenderError> {
        let (cell, value, pending) = self.state_cell(init)?;
        let setter = StateSetter {
            cell,
            coroutine: self.coroutine.clone(),
            engine: Rc::downgrade(&self.session.engine),
            _value: PhantomData,
        };
        Ok((value, setter, pending))
    }

    /// Reducer state: like `use_state` with an explicit reducer.
    pub fn use_reducer<S, A, R>(
        &mut self,
        reducer: R,
        init: impl FnOnce() -> S,
    ) -> Result<(S, Dispatch<A>, bool), RenderError>
    where
        S: Clone + 'static,
        A: 'static,
        R: Fn(&S, A) -> S + 'static,
    {
        let (cell, value, pending) = self.state_cell(init)?;
        let reduce: Rc<dyn Fn(Rc<dyn Any>, A) -> Rc<dyn Any>> =
            Rc::new(move |current, action| match current.downcast::<S>() {
                Ok(state) => Rc::new(reducer(&state, action)),
                Err(same) => same,
            });
        let dispatch = Dispatch {
            cell,
            reduce,
            coroutine: self.coroutine.clone(),
            engine: Rc::downgrade(&self.session.engine),
        };
        Ok((value, dispatch, pending))
    }

    /// Recompute `factory` only when `deps` change.
    pub fn use_memo<T: Clone + 'static, D: Deps>(
        &mut self,
        deps: D,
        factory: impl FnOnce() -> T,
    ) -> Result<T, RenderError> {
        let mut factory = Some(factory);
        let (cell, fresh) = self.acquire("memo", |_| {
            let value = factory.take().expect("first use")();
            Ok(HookCell::Memo(Rc::new(MemoCell {
                value: RefCell::new(Rc::new(value)),
                deps: RefCell::new(Rc::new(())),
            })))
        })?;
        let HookCell::Memo(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        if fresh {
            *cell.deps.borrow_mut() = Rc::new(deps);
        } else {
            let stale = {
                let stored = cell.deps.borrow();
                match stored.downcast_ref::<D>() {
                    Some(previous) => deps.changed(previous),
                    None => true,
                }
            };
            if stale {
                let value = factory.take().expect("factory consumed twice")();
                *cell.value.borrow_mut() = Rc::new(value);
                *cell.deps.borrow_mut() = Rc::new(deps);
            }
        }
        let value = cell
            .value
            .borrow()
            .clone()
            .downcast::<T>()
            .map_err(|_| RenderError::custom("memo cell changed type between renders"))?;
        Ok((*value).clone())
    }

    /// Memoised event handler; sugar over [`RenderContext::use_memo`].
    pub fn use_callback<D: Deps>(
        &mut self,
        deps: D,
        factory: impl FnOnce() -> EventHandler,
    ) -> Result<EventHandler, RenderError> {
        self.use_memo(deps, factory)
    }

    /// A stable mutable container surviving re-renders.
    pub fn use_ref<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<Rc<RefCell<T>>, RenderError> {
        let (cell, _) = self.acquire("ref", |_| {
            Ok(HookCell::Ref(Rc::new(RefCell::new(init()))))
        })?;
        let HookCell::Ref(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        cell.downcast::<RefCell<T>>()
            .map_err(|_| RenderError::custom("ref cell changed type between renders"))
    }

    /// A stable per-cell identifier derived from the render host.
    pub fn use_id(&mut self) -> Result<Rc<str>, RenderError> {
        let (cell, _) = self.acquire("identifier", |ctx| {
            let id = ctx.session.host().next_identifier();
            Ok(HookCell::Identifier(format!("w-{id}").into()))
        })?;
        let HookCell::Identifier(id) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        Ok(id)
    }

    /// Passive effect: committed after mutation and layout, at background
    /// priority.
    pub fn use_effect<D: Deps>(
        &mut self,
        deps: Option<D>,
        callback: impl FnOnce() -> Option<EffectCleanup> + 'static,
    ) -> Result<(), RenderError> {
        self.register_effect(EffectPhase::Passive, deps, Box::new(callback))
    }

    /// Layout effect: committed synchronously after the mutation phase.
    pub fn use_layout_effect<D: Deps>(
        &mut self,
        deps: Option<D>,
        callback: impl FnOnce() -> Option<EffectCleanup> + 'static,
    ) -> Result<(), RenderError> {
        self.register_effect(EffectPhase::Layout, deps, Box::new(callback))
    }

    /// Insertion effect: committed in the mutation phase itself.
    pub fn use_insertion_effect<D: Deps>(
        &mut self,
        deps: Option<D>,
        callback: impl FnOnce() -> Option<EffectCleanup> + 'static,
    ) -> Result<(), RenderError> {
        self.register_effect(EffectPhase::Insertion, deps, Box::new(callback))
    }

    fn register_effect<D: Deps>(
        &mut self,
        phase: EffectPhase,
        deps: Option<D>,
        callback: Box<dyn FnOnce() -> Option<EffectCleanup>>,
    ) -> Result<(), RenderError> {
        let kind = match phase {
            EffectPhase::Insertion => "insertion-effect",
            EffectPhase::Layout => "layout-effect",
            EffectPhase::Passive => "passive-effect",
        };
        let (cell, _) = self.acquire(kind, |_| {
            Ok(HookCell::Effect(Rc::new(EffectCell::new(phase))))
        })?;
        let HookCell::Effect(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        let changed = cell.is_fresh()
            || match &deps {
                None => true,
                Some(next) => match cell.deps() {
                    Some(stored) => match stored.downcast_ref::<D>() {
                        Some(previous) => next.changed(previous),
                        None => true,
                    },
                    None => true,
                },
            };
        if changed {
            let deps_any = deps.map(|d| Rc::new(d) as Rc<dyn Any>);
            let epoch = cell.register(callback, deps_any);
            self.session.enqueue(
                cell.queue(),
                Effect::HookRun {
                    cell: cell.clone(),
                    epoch,
                },
            );
        }
        Ok(())
    }

    /// A snapshot that lags the argument by one background-priority
    /// update.
    pub fn use_deferred_value<T: Clone + PartialEq + 'static>(
        &mut self,
        value: T,
    ) -> Result<T, RenderError> {
        let initial = value.clone();
        let (cell, current, _) = self.state_cell(move || initial)?;
        if current != value {
            let already_staged = cell
                .pending()
                .and_then(|staged| staged.downcast::<T>().ok())
                .is_some_and(|staged| *staged == value);
            if !already_staged {
                cell.stage(Rc::new(value), Lanes::BACKGROUND);
                self.session
                    .engine
                    .schedule_deferred(self.coroutine.clone(), Lanes::BACKGROUND);
            }
        }
        Ok(current)
    }

    /// Subscribe to an external store, re-rendering when its snapshot
    /// moves. The subscription is replaced when `subscribe` changes
    /// identity and dropped with the coroutine.
    pub fn use_sync_external_store<T: Clone + PartialEq + 'static>(
        &mut self,
        subscribe: &SubscribeFn,
        get_snapshot: impl Fn() -> T + 'static,
    ) -> Result<T, RenderError> {
        let get_snapshot = Rc::new(get_snapshot);
        let (cell, fresh) = self.acquire("ref", |_| {
            Ok(HookCell::Ref(Rc::new(StoreCell {
                snapshot: RefCell::new(get_snapshot()),
                subscribe_ptr: Cell::new(0),
                guard: RefCell::new(None),
            })))
        })?;
        let HookCell::Ref(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        let store = cell
            .downcast::<StoreCell<T>>()
            .map_err(|_| RenderError::custom("store cell changed type between renders"))?;

        let subscribe_ptr = Rc::as_ptr(subscribe) as *const () as usize;
        if fresh || store.subscribe_ptr.get() != subscribe_ptr {
            store.subscribe_ptr.set(subscribe_ptr);
            let weak_store = Rc::downgrade(&store);
            let engine = Rc::downgrade(&self.session.engine);
            let coroutine = self.coroutine.clone();
            let get = get_snapshot.clone();
            let on_change: Rc<dyn Fn()> = Rc::new(move || {
                let Some(store) = weak_store.upgrade() else {
                    return;
                };
                let Some(engine) = engine.upgrade() else {
                    return;
                };
                if get() != *store.snapshot.borrow() {
                    let lanes = engine.host().current_priority().lane();
                    engine.schedule_deferred(coroutine.clone(), lanes);
                }
            });
            *store.guard.borrow_mut() = Some(StoreGuard(Some(subscribe(on_change))));
        }

        let snapshot = get_snapshot();
        if snapshot != *store.snapshot.borrow() {
            *store.snapshot.borrow_mut() = snapshot.clone();
        }
        Ok(snapshot)
    }

    /// Schedule a re-render of the owning coroutine.
    pub fn force_update(&mut self, options: &UpdateOptions) {
        let lanes = Lanes::from_options(options, self.session.host().current_priority());
        self.session
            .engine
            .schedule_deferred(self.coroutine.clone(), lanes);
    }

    /// Install an error boundary on this coroutine's scope: errors from
    /// descendants land here, and the component re-renders to show its
    /// fallback.
    pub fn use_error_boundary(&mut self) -> Result<ErrorBoundary, RenderError> {
        let (cell, _) = self.acquire("ref", |_| {
            Ok(HookCell::Ref(Rc::new(ErrorBoundaryCell::default())))
        })?;
        let HookCell::Ref(cell) = cell else {
            unreachable!("acquire validated the cell kind");
        };
        let boundary = cell
            .downcast::<ErrorBoundaryCell>()
            .map_err(|_| RenderError::custom("boundary cell changed type between renders"))?;
        self.scope.install_boundary(boundary.clone());
        Ok(ErrorBoundary { cell: boundary })
    }

    /// Run a custom hook object.
    pub fn use_custom<H: CustomHook>(&mut self, hook: &H) -> Result<H::Output, RenderError> {
        hook.install(self)
    }

    // -- shared context -----------------------------------------------------

    /// Provide a value to this coroutine and everything below it.
    pub fn set_shared_context<T: 'static>(&self, value: T) {
        self.scope.set_shared(value);
    }

    /// Look a value up through the scope chain.
    pub fn get_shared_context<T: 'static>(&self) -> Option<Rc<T>> {
        self.scope.get_shared::<T>()
    }

    /// The scope this render runs under.
    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }
}
