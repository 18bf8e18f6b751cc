#![doc = include_str!("../README.md")]

pub(crate) mod bindable;
pub(crate) mod binding;
pub(crate) mod component;
pub(crate) mod context;
pub(crate) mod directives;
pub(crate) mod error;
pub(crate) mod hooks;
pub(crate) mod host;
pub(crate) mod hydration;
pub(crate) mod linked_list;
pub(crate) mod part;
pub(crate) mod primitives;
pub(crate) mod reconcile;
pub(crate) mod root;
pub(crate) mod scheduler;
pub(crate) mod scope;
pub(crate) mod slot;
pub(crate) mod template;

pub(crate) mod innerlude {
    pub use crate::bindable::*;
    pub use crate::binding::*;
    pub use crate::component::*;
    pub use crate::context::*;
    pub use crate::directives::*;
    pub use crate::error::*;
    pub use crate::hooks::{
        Deps, Dispatch, EffectCleanup, EffectPhase, StateSetter, SubscribeFn, Unsubscribe, ALWAYS,
        ONCE,
    };
    pub use crate::host::*;
    pub use crate::hydration::*;
    pub use crate::linked_list::*;
    pub use crate::part::*;
    pub use crate::reconcile::*;
    pub use crate::root::Root;
    pub use crate::scheduler::{
        CommitPhase, Coroutine, CoroutineHandle, Lanes, ObserverHandle, Priority, RenderSession,
        RuntimeEvent, UpdateEngine, UpdateHandle, UpdateOptions, WeakCoroutine,
    };
    pub use crate::scope::{ErrorBoundary, Scope};
    pub use crate::slot::{Slot, SlotHandle, SlotKind};
    pub use crate::template::{
        html, mathml, svg, LiteralTable, Template, TemplateIdentity, TemplateMode,
        TemplateStrings,
    };
}

pub use crate::innerlude::{
    html, mathml, repeat, svg, Bindable, Binding, BindingHandle, CommitPhase, Component,
    ComponentDef, Coroutine,
    CoroutineHandle, CustomHook, Deps, Directive, DirectiveElement, Dispatch, EffectCleanup,
    EffectPhase, ErrorBoundary, EventHandler, Key, Lanes, LinkedList, ListHandle, LiteralTable,
    MutationHandler, NodeRef, ObserverHandle, Part, Priority, RefCallback, RefCleanup,
    RenderContext, RenderError, RenderFn, RenderHost, RenderSession, Root, RuntimeEvent, Scope,
    Slot, SlotHandle, SlotKind, StandardHost, StateSetter, SubscribeFn, Template, TemplateIdentity, TemplateMode,
    TemplateStrings, TreeWalker, UpdateEngine, UpdateHandle, UpdateOptions, WeakCoroutine,
    Unsubscribe, ALWAYS, ONCE,
};

pub use crate::reconcile::reconcile;

pub mod prelude {
    pub use crate::bindable::{Bindable, EventHandler, Key, NodeRef};
    pub use crate::component::{Component, ComponentDef};
    pub use crate::context::{CustomHook, RenderContext};
    pub use crate::directives::repeat;
    pub use crate::error::RenderError;
    pub use crate::hooks::{ALWAYS, ONCE};
    pub use crate::host::StandardHost;
    pub use crate::root::Root;
    pub use crate::scheduler::{Priority, UpdateOptions};
}
