//! Reading signals inside components.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{CustomHook, Priority, RenderContext, RenderError, UpdateOptions};

use crate::signal::{Signal, Subscription};

struct SignalWatch {
    signal_id: usize,
    _subscription: Subscription,
}

/// Read a signal and subscribe the rendering coroutine to it: when the
/// signal's version moves past the one the last render saw, the coroutine
/// is scheduled at background priority. Notifications that leave the
/// version where this render already saw it cause no re-render, and
/// repeated notifications in one tick batch into a single re-render that
/// reads the latest value.
pub fn use_signal<T: Clone + 'static>(
    ctx: &mut RenderContext,
    signal: &Signal<T>,
) -> Result<T, RenderError> {
    let (_tracked, track_version, _) = ctx.use_state(|| signal.version())?;
    let seen: Rc<RefCell<u64>> = ctx.use_ref(|| signal.version())?;
    let watch: Rc<RefCell<Option<SignalWatch>>> = ctx.use_ref(|| None)?;

    let subscribed_to = watch.borrow().as_ref().map(|w| w.signal_id);
    if subscribed_to != Some(signal.id()) {
        let subscriber = {
            let signal = signal.clone();
            let track_version = track_version.clone();
            let seen = seen.clone();
            Rc::new(move || {
                let version = signal.version();
                if version != *seen.borrow() {
                    track_version.set_with(
                        version,
                        &UpdateOptions::with_priority(Priority::Background),
                    );
                }
            })
        };
        let subscription = signal.subscribe(subscriber);
        *watch.borrow_mut() = Some(SignalWatch {
            signal_id: signal.id(),
            _subscription: subscription,
        });
    }

    // this render observes the current version; only a later one may
    // schedule again
    *seen.borrow_mut() = signal.version();
    Ok(signal.value())
}

impl<T: Clone + 'static> CustomHook for Signal<T> {
    type Output = T;

    fn install(&self, ctx: &mut RenderContext) -> Result<T, RenderError> {
        use_signal(ctx, self)
    }
}
