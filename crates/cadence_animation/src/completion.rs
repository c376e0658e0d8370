//! Completion signal
//!
//! A set-once cell that an [`Animation`](crate::Animation) settles exactly
//! once: resolved with the final output value when it finishes, or rejected
//! with [`Cancelled`] when it is cancelled. Readers can poll it, register
//! listeners, or `.await` it.

use crate::error::Cancelled;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

/// Listener invoked once when the completion settles
pub type CompletionListener = Box<dyn FnOnce(Result<f64, Cancelled>) + Send>;

/// Lifecycle of a completion signal
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CompletionState {
    #[default]
    Pending,
    /// Finished with the final output value
    Resolved(f64),
    /// Cancelled before finishing
    Rejected(Cancelled),
}

impl CompletionState {
    fn as_result(self) -> Option<Result<f64, Cancelled>> {
        match self {
            CompletionState::Pending => None,
            CompletionState::Resolved(value) => Some(Ok(value)),
            CompletionState::Rejected(cancelled) => Some(Err(cancelled)),
        }
    }
}

#[derive(Default)]
struct CompletionInner {
    state: CompletionState,
    listeners: Vec<CompletionListener>,
    wakers: Vec<Waker>,
}

/// Shared handle to a completion signal
///
/// Clones observe the same cell. Only the owning animation can settle it.
#[derive(Clone, Default)]
pub struct Completion {
    inner: Arc<Mutex<CompletionInner>>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CompletionInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Resolve with the final value. Returns false if already settled.
    pub(crate) fn resolve(&self, value: f64) -> bool {
        self.settle(CompletionState::Resolved(value))
    }

    /// Reject with the cancellation marker. Returns false if already settled.
    pub(crate) fn reject(&self) -> bool {
        self.settle(CompletionState::Rejected(Cancelled))
    }

    fn settle(&self, state: CompletionState) -> bool {
        let (listeners, wakers) = {
            let mut inner = self.lock();
            if inner.state != CompletionState::Pending {
                return false;
            }
            inner.state = state;
            (
                std::mem::take(&mut inner.listeners),
                std::mem::take(&mut inner.wakers),
            )
        };

        tracing::trace!(?state, listeners = listeners.len(), "completion settled");

        if let Some(result) = state.as_result() {
            for listener in listeners {
                listener(result);
            }
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Current state
    pub fn state(&self) -> CompletionState {
        self.lock().state
    }

    /// The settled result, or `None` while pending
    pub fn result(&self) -> Option<Result<f64, Cancelled>> {
        self.state().as_result()
    }

    pub fn is_settled(&self) -> bool {
        self.state() != CompletionState::Pending
    }

    /// Register a listener
    ///
    /// Runs immediately on the calling thread if the completion has already
    /// settled, otherwise on whichever thread settles it.
    pub fn on_settled<F>(&self, listener: F)
    where
        F: FnOnce(Result<f64, Cancelled>) + Send + 'static,
    {
        let result = {
            let mut inner = self.lock();
            match inner.state.as_result() {
                Some(result) => result,
                None => {
                    inner.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        listener(result);
    }

    /// Future resolving to the settled result
    pub fn wait(&self) -> Finished {
        Finished {
            completion: self.clone(),
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state())
            .finish()
    }
}

/// Future returned by [`Completion::wait`]
#[derive(Debug)]
pub struct Finished {
    completion: Completion,
}

impl Future for Finished {
    type Output = Result<f64, Cancelled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.completion.lock();
        match inner.state.as_result() {
            Some(result) => Poll::Ready(result),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
