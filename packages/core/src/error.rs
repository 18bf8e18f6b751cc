//! Engine error kinds and how they travel.
//!
//! Everything fallible in the engine funnels into [`RenderError`]. Render
//! and commit errors bubble up the coroutine scope chain looking for an
//! error boundary; an uncaught error rejects the frame, which completes
//! every update handle attached to it and suppresses the frame's commit.

use std::rc::Rc;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Template strings could not be interpreted in the requested mode.
    #[error("template parse failed{}: {message}", bind_label(.bind_index))]
    Parse {
        bind_index: Option<usize>,
        message: String,
    },

    /// A strict slot was asked to reconcile a value with a different
    /// directive.
    #[error("slot bound to `{expected}` cannot reconcile a `{found}` value")]
    DirectiveMismatch { expected: String, found: String },

    /// A re-render reached a hook cell of a different kind, or finished at
    /// a different index.
    #[error("hook {index} changed from {expected} to {found} between renders; hooks must run in the same order on every render")]
    HookOrderViolation {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The hydration walker met a node of unexpected kind, name or content.
    #[error("hydration mismatch at {path}: expected {expected}, found {found}")]
    HydrationMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A primitive rejected the value it was asked to bind.
    #[error("{part} binding rejected its value: {reason}")]
    BindingPrecondition { part: &'static str, reason: String },

    /// A component render function failed.
    #[error("component `{name}` failed to render: {source}")]
    UserRender {
        name: String,
        #[source]
        source: Rc<RenderError>,
    },

    /// An application-defined failure raised inside a render function.
    #[error("{0}")]
    Custom(String),
}

impl RenderError {
    pub fn custom(message: impl Into<String>) -> RenderError {
        RenderError::Custom(message.into())
    }

    pub(crate) fn parse(bind_index: Option<usize>, message: impl Into<String>) -> RenderError {
        RenderError::Parse {
            bind_index,
            message: message.into(),
        }
    }

    pub(crate) fn precondition(part: &'static str, reason: impl Into<String>) -> RenderError {
        RenderError::BindingPrecondition {
            part,
            reason: reason.into(),
        }
    }
}

fn bind_label(bind_index: &Option<usize>) -> String {
    match bind_index {
        Some(index) => format!(" at bind {index}"),
        None => String::new(),
    }
}
