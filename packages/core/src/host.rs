//! The render host: pluggable platform primitives.
//!
//! The engine never posts tasks, parses markup, or picks primitives on its
//! own; it asks the host. The crate ships [`StandardHost`], a deterministic
//! single-threaded host with three priority callback queues and a local
//! executor for the cooperative render phase. An embedder integrating a
//! real event loop (animation frames, input priorities, view transitions)
//! implements the same trait.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use futures_util::future::LocalBoxFuture;
use rustc_hash::FxHashMap;

use crate::bindable::Bindable;
use crate::binding::Directive;
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::Priority;
use crate::slot::SlotKind;
use crate::template::{LiteralTable, Template, TemplateIdentity, TemplateMode, TemplateStrings};

pub trait RenderHost {
    /// Compile (or fetch from cache) the template for `strings` in `mode`.
    fn parse_template(
        &self,
        strings: &TemplateStrings,
        mode: TemplateMode,
    ) -> Result<Rc<Template>, RenderError>;

    /// The literal preprocessor table backing this host's template cache.
    fn literals(&self) -> &LiteralTable;

    /// Post a callback at the given priority.
    fn request_callback(&self, callback: Box<dyn FnOnce()>, priority: Priority);

    /// Drive a render-phase future to completion alongside callbacks.
    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>);

    /// Whether the render phase should yield to the main loop between
    /// coroutines.
    fn should_yield(&self) -> bool {
        false
    }

    /// The awaited suspension point between coroutines.
    fn yield_to_main(&self) -> LocalBoxFuture<'static, ()> {
        Box::pin(futures_util::future::ready(()))
    }

    /// Wrap a mutation+layout commit in a view transition.
    fn start_view_transition(&self, commit: Box<dyn FnOnce()>) {
        commit();
    }

    /// The priority scheduling falls back to when options name none.
    fn current_priority(&self) -> Priority;

    /// Monotone counter behind stable per-cell identifiers.
    fn next_identifier(&self) -> u64;

    /// Choose the default directive for a value at a part.
    fn resolve_primitive(
        &self,
        value: &Bindable,
        part: &Part,
    ) -> Result<Rc<dyn Directive>, RenderError> {
        crate::primitives::resolve(value, part)
    }

    /// Choose the slot discipline for a part: flexible where the directive
    /// may legitimately change between renders (child content), strict
    /// elsewhere.
    fn resolve_slot_kind(&self, _value: &Bindable, part: &Part) -> SlotKind {
        match part {
            Part::ChildNode { .. } => SlotKind::Flexible,
            _ => SlotKind::Strict,
        }
    }

    /// Drain all posted work synchronously. Hosts driven by an external
    /// event loop leave this a no-op.
    fn flush(&self) {}
}

/// Deterministic host: callbacks queue per priority and run
/// highest-priority-first when [`StandardHost::flush`] drains them.
pub struct StandardHost {
    queues: [RefCell<VecDeque<Box<dyn FnOnce()>>>; 3],
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    flushing: Cell<bool>,
    current: Cell<Priority>,
    identifiers: Cell<u64>,
    templates: RefCell<FxHashMap<TemplateIdentity, Rc<Template>>>,
    literals: LiteralTable,
}

impl StandardHost {
    pub fn new() -> Rc<StandardHost> {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Rc::new(StandardHost {
            queues: [
                RefCell::new(VecDeque::new()),
                RefCell::new(VecDeque::new()),
                RefCell::new(VecDeque::new()),
            ],
            pool: RefCell::new(pool),
            spawner,
            flushing: Cell::new(false),
            current: Cell::new(Priority::UserVisible),
            identifiers: Cell::new(0),
            templates: RefCell::new(FxHashMap::default()),
            literals: LiteralTable::new(),
        })
    }

    fn queue_index(priority: Priority) -> usize {
        match priority {
            Priority::UserBlocking => 0,
            Priority::UserVisible => 1,
            Priority::Background => 2,
        }
    }

    fn pop_highest(&self) -> Option<(Box<dyn FnOnce()>, Priority)> {
        const ORDER: [Priority; 3] = [
            Priority::UserBlocking,
            Priority::UserVisible,
            Priority::Background,
        ];
        for priority in ORDER {
            let callback = self.queues[Self::queue_index(priority)]
                .borrow_mut()
                .pop_front();
            if let Some(callback) = callback {
                return Some((callback, priority));
            }
        }
        None
    }

    fn has_callbacks(&self) -> bool {
        self.queues.iter().any(|q| !q.borrow().is_empty())
    }
}

impl RenderHost for StandardHost {
    fn parse_template(
        &self,
        strings: &TemplateStrings,
        mode: TemplateMode,
    ) -> Result<Rc<Template>, RenderError> {
        let identity = strings.identity(mode);
        if let Some(hit) = self.templates.borrow().get(&identity) {
            return Ok(hit.clone());
        }
        let template = Rc::new(Template::parse(strings, mode)?);
        self.templates.borrow_mut().insert(identity, template.clone());
        Ok(template)
    }

    fn literals(&self) -> &LiteralTable {
        &self.literals
    }

    fn request_callback(&self, callback: Box<dyn FnOnce()>, priority: Priority) {
        self.queues[Self::queue_index(priority)]
            .borrow_mut()
            .push_back(callback);
    }

    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>) {
        // failure means the executor is gone, which only happens at teardown
        let _ = self.spawner.spawn_local(future);
    }

    fn current_priority(&self) -> Priority {
        self.current.get()
    }

    fn next_identifier(&self) -> u64 {
        let id = self.identifiers.get();
        self.identifiers.set(id + 1);
        id
    }

    fn flush(&self) {
        if self.flushing.get() {
            return;
        }
        self.flushing.set(true);
        loop {
            self.pool.borrow_mut().run_until_stalled();
            match self.pop_highest() {
                Some((callback, priority)) => {
                    let previous = self.current.replace(priority);
                    callback();
                    self.current.set(previous);
                }
                None => {
                    self.pool.borrow_mut().run_until_stalled();
                    if !self.has_callbacks() {
                        break;
                    }
                }
            }
        }
        self.flushing.set(false);
    }
}
