// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-value async results with executor-bound continuations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::executor::Executor;

enum Slot<T> {
    Empty,
    Canceled,
    Value(T),
    /// The value was handed to the continuation.
    Taken,
}

enum Completion<T> {
    Value(T),
    Canceled,
}

type Continuation<T> = Box<dyn FnOnce(Completion<T>) + Send>;

struct Inner<T> {
    slot: Slot<T>,
    continuation: Option<Continuation<T>>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    ready: Condvar,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner { slot: Slot::Empty, continuation: None }),
            ready: Condvar::new(),
        }
    }

    fn is_ready(&self) -> bool {
        !matches!(self.inner.lock().slot, Slot::Empty)
    }

    fn wait_ready(&self) {
        let mut inner = self.inner.lock();
        while matches!(inner.slot, Slot::Empty) {
            self.ready.wait(&mut inner);
        }
    }

    /// Transition Empty → Value and dispatch the continuation, if any.
    fn resolve(&self, value: T) {
        let run = {
            let mut inner = self.inner.lock();
            debug_assert!(matches!(inner.slot, Slot::Empty), "future resolved twice");
            match inner.continuation.take() {
                Some(continuation) => {
                    inner.slot = Slot::Taken;
                    Some((continuation, Completion::Value(value)))
                }
                None => {
                    inner.slot = Slot::Value(value);
                    None
                }
            }
        };
        self.ready.notify_all();
        if let Some((continuation, completion)) = run {
            continuation(completion);
        }
    }

    /// Transition Empty → Canceled and propagate downstream.
    fn cancel(&self) {
        let run = {
            let mut inner = self.inner.lock();
            debug_assert!(matches!(inner.slot, Slot::Empty), "future canceled after completion");
            inner.slot = Slot::Canceled;
            inner.continuation.take()
        };
        self.ready.notify_all();
        if let Some(continuation) = run {
            continuation(Completion::Canceled);
        }
    }

    /// Attach a continuation, dispatching immediately if already completed.
    fn attach(&self, continuation: Continuation<T>) {
        let run = {
            let mut inner = self.inner.lock();
            debug_assert!(inner.continuation.is_none(), "future already chained");
            match std::mem::replace(&mut inner.slot, Slot::Taken) {
                Slot::Value(value) => Some((continuation, Completion::Value(value))),
                Slot::Canceled => {
                    inner.slot = Slot::Canceled;
                    Some((continuation, Completion::Canceled))
                }
                Slot::Empty => {
                    inner.slot = Slot::Empty;
                    inner.continuation = Some(continuation);
                    None
                }
                Slot::Taken => unreachable!("future value taken with no continuation attached"),
            }
        };
        if let Some((continuation, completion)) = run {
            continuation(completion);
        }
    }

    #[allow(clippy::panic)]
    fn take_value(&self) -> T {
        let mut inner = self.inner.lock();
        match std::mem::replace(&mut inner.slot, Slot::Taken) {
            Slot::Value(value) => value,
            Slot::Canceled => {
                inner.slot = Slot::Canceled;
                panic!("future chain was canceled");
            }
            Slot::Empty | Slot::Taken => unreachable!("future value taken while not ready"),
        }
    }
}

/// A value which will become available in the future.
///
/// Similar to `std::future`, but continuation chaining is explicit via
/// [`then`](Future::then) and the whole chain shares one cancellation flag:
/// dropping (or [`reset`](Future::reset)ting) any handle in a chain prevents
/// every continuation that has not started yet from running its user function.
pub struct Future<T> {
    state: Option<Arc<Shared<T>>>,
    canceled: Option<Arc<AtomicBool>>,
}

impl<T> Future<T> {
    pub fn is_ready(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.is_ready())
    }

    /// Block until the future is resolved or canceled.
    pub fn wait(&self) {
        if let Some(state) = &self.state {
            state.wait_ready();
        }
    }

    /// Block until resolved and return the value.
    ///
    /// # Panics
    ///
    /// Panics if the chain was canceled. Cancellation is always initiated by
    /// the holder of a chain handle, so this never fires spontaneously.
    pub fn get(mut self) -> T {
        let state = match self.state.take() {
            Some(state) => state,
            None => unreachable!("future already consumed"),
        };
        // Consuming the value is not a cancellation; leave the flag unset.
        self.canceled.take();
        state.wait_ready();
        state.take_value()
    }

    /// Drop the future, implicitly canceling any pending continuations.
    ///
    /// Continuations which have not yet started executing are guaranteed not
    /// to run their user function.
    pub fn reset(self) {}

    /// Chain a continuation that runs `map` on `executor` once this future
    /// resolves, producing a new future for the mapped value.
    ///
    /// The cancellation flag is shared by the entire chain: the returned
    /// future threads this future's flag through to its own handle.
    pub fn then<U, E, F>(mut self, executor: E, map: F) -> Future<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: Executor,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let (state, canceled) = match (self.state.take(), self.canceled.take()) {
            (Some(state), Some(canceled)) => (state, canceled),
            _ => unreachable!("future already consumed"),
        };

        let next = Arc::new(Shared::<U>::new());
        let link = {
            let next = Arc::clone(&next);
            let canceled = Arc::clone(&canceled);
            Box::new(move |completion: Completion<T>| match completion {
                Completion::Canceled => next.cancel(),
                Completion::Value(value) => {
                    // Checked both at dispatch and at execution time: the
                    // chain may be reset while the job sits in a queue.
                    if canceled.load(Ordering::SeqCst) {
                        next.cancel();
                        return;
                    }
                    let flag = Arc::clone(&canceled);
                    let target = Arc::clone(&next);
                    executor.spawn(move || {
                        if flag.load(Ordering::SeqCst) {
                            target.cancel();
                        } else {
                            target.resolve(map(value));
                        }
                    });
                }
            })
        };
        state.attach(link);

        Future { state: Some(next), canceled: Some(canceled) }
    }
}

impl<T> Drop for Future<T> {
    fn drop(&mut self) {
        if let Some(flag) = self.canceled.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Producing end of a [`Future`]/[`Promise`] pair.
pub struct Promise<T> {
    state: Arc<Shared<T>>,
}

impl<T> Promise<T> {
    /// Resolve the future, dispatching its continuation if one is attached.
    pub fn resolve(self, value: T) {
        self.state.resolve(value);
    }
}

/// Creates a connected [`Future`]/[`Promise`] pair.
pub fn make_promise<T>() -> (Future<T>, Promise<T>) {
    let state = Arc::new(Shared::new());
    let future = Future { state: Some(Arc::clone(&state)), canceled: Some(Arc::new(AtomicBool::new(false))) };
    (future, Promise { state })
}

#[cfg(test)]
#[path = "future_tests.rs"]
mod tests;
