//! Thread-local recording of tree mutations.
//!
//! The engine promises minimal-mutation commits ("setAttribute is invoked
//! once"); tests hold it to that by capturing the concrete edits performed
//! against the tree. Recording is off by default and costs one thread-local
//! check per mutation when off.

use std::cell::RefCell;

/// One concrete mutation performed against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    SetAttribute { name: String, value: String },
    ToggleAttribute { name: String, on: bool },
    RemoveAttribute { name: String },
    ToggleClass { name: String, on: bool },
    SetStyleProperty { name: String, value: String },
    RemoveStyleProperty { name: String },
    SetProperty { name: String },
    SetText { data: String },
    InsertNode { node: String },
    RemoveNode { node: String },
    AttachListener { event: String },
    DetachListener { event: String },
}

thread_local! {
    static RECORDER: RefCell<Option<Vec<Edit>>> = const { RefCell::new(None) };
}

/// Begin recording. Any previously captured edits are discarded.
pub fn start() {
    RECORDER.with(|r| *r.borrow_mut() = Some(Vec::new()));
}

/// Stop recording and return everything captured since [`start`].
pub fn stop() -> Vec<Edit> {
    RECORDER.with(|r| r.borrow_mut().take().unwrap_or_default())
}

/// Record the edits performed by `f`.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Edit>) {
    start();
    let result = f();
    (result, stop())
}

pub(crate) fn push(edit: impl FnOnce() -> Edit) {
    RECORDER.with(|r| {
        if let Some(edits) = r.borrow_mut().as_mut() {
            edits.push(edit());
        }
    });
}

/// Run `f` with recording suspended; used for pure construction work
/// (markup conversion, template compilation) that is not an observable
/// mutation of live content.
pub fn suspended<R>(f: impl FnOnce() -> R) -> R {
    let saved = RECORDER.with(|r| r.borrow_mut().take());
    let result = f();
    RECORDER.with(|r| *r.borrow_mut() = saved);
    result
}
