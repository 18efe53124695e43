//! Thread-confined stack of active session contexts.
//!
//! Pushing returns a [`ContextGuard`]; the context stays active until the
//! guard is dropped or popped, so every push is matched by a pop even when a
//! request handler unwinds.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::context::{ContextId, SessionContext};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<SessionContext>>> = const { RefCell::new(Vec::new()) };
}

/// Makes `context` the active context on this thread.
pub fn push_context(context: Arc<SessionContext>) -> ContextGuard {
    let context_id = context.id();
    let depth = CONTEXT_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        stack.push(context);
        stack.len()
    });
    trace!(context = context_id, depth, "context pushed");
    ContextGuard {
        context_id,
        depth,
        released: false,
        _not_send: PhantomData,
    }
}

/// The active context, if any.
pub fn current() -> Option<Arc<SessionContext>> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

pub fn depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}

/// Runs `block` with `context` active.
pub fn with_context<R>(context: Arc<SessionContext>, block: impl FnOnce() -> R) -> R {
    let _guard = push_context(context);
    block()
}

/// Restores the previous active context when released.
#[must_use = "the context is popped as soon as the guard is dropped"]
pub struct ContextGuard {
    context_id: ContextId,
    depth: usize,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn pop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.len() > self.depth {
                warn!(
                    context = self.context_id,
                    leaked = stack.len() - self.depth,
                    "context guard released with inner contexts still pushed"
                );
            }
            // Dropping to the depth below this guard also discards anything an
            // inner guard failed to pop.
            stack.truncate(self.depth.saturating_sub(1));
        });
        trace!(context = self.context_id, "context popped");
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.release();
    }
}
