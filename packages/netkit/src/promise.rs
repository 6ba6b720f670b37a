//! Single-assignment async results.
//!
//! [`pending`] creates a connected [`Promise`] (write side) and
//! [`PromiseFuture`] (read side). The promise resolves at most once; later
//! calls are ignored. Continuations attached to the future run exactly once
//! each, in attachment order, on whichever thread resolves the promise, or
//! immediately on the caller's thread when the outcome is already settled.
//!
//! A promise dropped without being resolved fails its future with
//! [`BrokenPromise`], so nobody waits forever on a lost result. A panicking
//! continuation is caught and logged; the remaining continuations still run
//! and awaiting tasks are still woken.
//!
//! ```ignore
//! let (promise, future) = promise::pending::<u32, SessionError>();
//!
//! future.on_completion(|outcome| println!("first: {outcome:?}"));
//! promise.succeed(7);
//!
//! assert_eq!(future.await.unwrap(), 7);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::task::{Context, Poll, Waker};

use crate::error::BrokenPromise;

type Continuation<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

struct Listeners<T, E> {
    continuations: Vec<Continuation<T, E>>,
    wakers: Vec<Waker>,
    /// Set once every continuation attached before resolution has run.
    settled: bool,
}

struct Shared<T, E> {
    outcome: OnceLock<Result<T, E>>,
    listeners: Mutex<Listeners<T, E>>,
    broken: fn() -> E,
}

impl<T, E> Shared<T, E> {
    fn listeners(&self) -> MutexGuard<'_, Listeners<T, E>> {
        // Continuations never run under this lock, so a poisoned guard
        // still holds consistent state.
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn resolve(&self, outcome: Result<T, E>) -> bool {
        if self.outcome.set(outcome).is_err() {
            return false;
        }
        let Some(outcome) = self.outcome.get() else {
            return false;
        };

        // Continuations attached while we drain land in the next batch,
        // which keeps attachment order intact.
        let wakers = loop {
            let batch = {
                let mut listeners = self.listeners();
                if listeners.continuations.is_empty() {
                    listeners.settled = true;
                    break std::mem::take(&mut listeners.wakers);
                }
                std::mem::take(&mut listeners.continuations)
            };

            for continuation in batch {
                // One failing continuation must not starve the rest or the
                // waiting tasks.
                if panic::catch_unwind(AssertUnwindSafe(|| continuation(outcome))).is_err() {
                    tracing::debug!("completion continuation panicked");
                }
            }
        };

        for waker in wakers {
            waker.wake();
        }
        true
    }
}

fn broken_promise<E: From<BrokenPromise>>() -> E {
    BrokenPromise.into()
}

/// Create a pending promise and the future it resolves.
pub fn pending<T, E>() -> (Promise<T, E>, PromiseFuture<T, E>)
where
    E: From<BrokenPromise>,
{
    let shared = Arc::new(Shared {
        outcome: OnceLock::new(),
        listeners: Mutex::new(Listeners {
            continuations: Vec::new(),
            wakers: Vec::new(),
            settled: false,
        }),
        broken: broken_promise::<E>,
    });

    (
        Promise {
            shared: shared.clone(),
        },
        PromiseFuture { shared },
    )
}

/// Write side of a single-assignment result.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Promise<T, E> {
    /// Resolve with a value. Returns `false` if already resolved.
    pub fn succeed(&self, value: T) -> bool {
        self.shared.resolve(Ok(value))
    }

    /// Resolve with an error. Returns `false` if already resolved.
    pub fn fail(&self, error: E) -> bool {
        self.shared.resolve(Err(error))
    }

    pub fn resolve(&self, outcome: Result<T, E>) -> bool {
        self.shared.resolve(outcome)
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.outcome.get().is_some()
    }

    pub fn future(&self) -> PromiseFuture<T, E> {
        PromiseFuture {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Drop for Promise<T, E> {
    fn drop(&mut self) {
        if !self.is_resolved() {
            self.shared.resolve(Err((self.shared.broken)()));
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Read side of a single-assignment result.
///
/// Cheap to clone; every clone observes the same outcome. Awaiting it
/// yields a clone of the outcome.
pub struct PromiseFuture<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for PromiseFuture<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> PromiseFuture<T, E> {
    /// A future that is already resolved.
    pub fn resolved(outcome: Result<T, E>) -> Self
    where
        E: From<BrokenPromise>,
    {
        let (promise, future) = pending();
        promise.resolve(outcome);
        future
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.outcome.get().is_some()
    }

    /// The outcome, if the promise has been resolved.
    pub fn peek(&self) -> Option<&Result<T, E>> {
        self.shared.outcome.get()
    }

    /// Run `continuation` exactly once with the outcome.
    pub fn on_completion<F>(&self, continuation: F)
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let mut listeners = self.shared.listeners();
        if !listeners.settled {
            listeners.continuations.push(Box::new(continuation));
            return;
        }
        drop(listeners);

        if let Some(outcome) = self.shared.outcome.get() {
            continuation(outcome);
        }
    }

    /// Derive a future holding a projection of the success value.
    ///
    /// Failures propagate untouched.
    pub fn map_value<U, F>(&self, transform: F) -> PromiseFuture<U, E>
    where
        F: FnOnce(&T) -> U + Send + 'static,
        U: Send + Sync + 'static,
        E: From<BrokenPromise> + Clone + Send + Sync + 'static,
    {
        let (promise, future) = pending();
        self.on_completion(move |outcome| {
            match outcome {
                Ok(value) => promise.succeed(transform(value)),
                Err(error) => promise.fail(error.clone()),
            };
        });
        future
    }
}

impl<T: Clone, E: Clone> std::future::Future for PromiseFuture<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.shared.outcome.get() {
            return Poll::Ready(outcome.clone());
        }

        let mut listeners = self.shared.listeners();
        if let Some(outcome) = self.shared.outcome.get() {
            return Poll::Ready(outcome.clone());
        }
        if !listeners.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            listeners.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T, E> fmt::Debug for PromiseFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseFuture")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
