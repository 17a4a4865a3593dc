// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Explicit cancellation: a shared flag with subscribe-on-cancel callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::executor::Executor;

type Callback = Box<dyn FnOnce() + Send>;

struct CancellationState {
    canceled: AtomicBool,
    callbacks: Mutex<Vec<Callback>>,
}

impl CancellationState {
    fn cancel(&self) {
        if !self.canceled.swap(true, Ordering::SeqCst) {
            let callbacks = std::mem::take(&mut *self.callbacks.lock());
            for callback in callbacks {
                callback();
            }
        }
    }

    fn subscribe(&self, callback: Callback) {
        let mut callbacks = self.callbacks.lock();
        if self.canceled.load(Ordering::SeqCst) {
            // Registered after cancellation: fire immediately.
            drop(callbacks);
            callback();
        } else {
            callbacks.push(callback);
        }
    }
}

/// Consuming side of a cancellation flag.
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<CancellationState>,
}

impl CancellationToken {
    pub fn is_canceled(&self) -> bool {
        self.state.canceled.load(Ordering::SeqCst)
    }

    /// Register a callback to run on `executor` when the source is canceled.
    ///
    /// Callbacks registered after cancellation are dispatched immediately.
    pub fn subscribe<E, F>(&self, executor: E, callback: F)
    where
        E: Executor,
        F: FnOnce() + Send + 'static,
    {
        self.state.subscribe(Box::new(move || executor.spawn(callback)));
    }
}

/// Producing side of a cancellation flag.
#[derive(Clone)]
pub struct CancellationSource {
    state: Arc<CancellationState>,
}

impl CancellationSource {
    /// Flip the flag and fire all previously subscribed callbacks, each on
    /// its own executor. Idempotent.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken { state: Arc::clone(&self.state) }
    }
}

/// Creates a fresh, uncanceled [`CancellationSource`].
pub fn make_cancellation_source() -> CancellationSource {
    CancellationSource {
        state: Arc::new(CancellationState {
            canceled: AtomicBool::new(false),
            callbacks: Mutex::new(Vec::new()),
        }),
    }
}

#[cfg(test)]
#[path = "cancellation_tests.rs"]
mod tests;
