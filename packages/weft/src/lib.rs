#![doc = include_str!("../README.md")]

pub use weft_core::{
    self as core, reconcile, repeat, Bindable, Binding, BindingHandle, CommitPhase, Component,
    ComponentDef, Coroutine, CustomHook, Deps, Directive, DirectiveElement, Dispatch,
    EffectCleanup, EffectPhase, ErrorBoundary, EventHandler, Key, Lanes, MutationHandler, NodeRef,
    ObserverHandle, Part, Priority, RefCallback, RenderContext, RenderError, RenderFn, RenderHost,
    Root, RuntimeEvent, Scope, SlotKind, StandardHost, StateSetter, Template, TemplateMode,
    TemplateStrings, UpdateEngine, UpdateHandle, UpdateOptions, ALWAYS, ONCE,
};

pub use weft_dom::{
    self as dom, Event, EventListener, Namespace, Node, NodeType, PropertyValue,
};

pub use weft_signals::{self as signals, bind_signal, use_signal, Signal};

pub mod prelude {
    pub use weft_core::prelude::*;
    pub use weft_dom::{Event, Node};
    pub use weft_signals::{bind_signal, use_signal, Signal};
}
