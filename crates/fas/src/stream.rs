// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-value async sequences with in-order delivery.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::executor::Executor;

trait StreamContinuation<T>: Send + Sync {
    fn continue_with(self: Arc<Self>, state: Arc<StreamShared<T>>);
}

struct StreamInner<T> {
    /// `None` is the end-of-stream sentinel, pushed exactly once by `close`.
    queue: VecDeque<Option<T>>,
    finished: bool,
    /// Set while a popped value is being processed by the continuation.
    ///
    /// This is the ordering mechanism: at most one continuation invocation is
    /// in flight per stream, so items surface in production order even when
    /// the bound executor runs jobs on arbitrary threads. After processing an
    /// item the continuation clears the flag and, if more items are queued,
    /// re-submits itself.
    processing_popped: bool,
    continuation: Option<Arc<dyn StreamContinuation<T>>>,
}

struct StreamShared<T> {
    inner: Mutex<StreamInner<T>>,
    ready: Condvar,
}

impl<T> StreamShared<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(StreamInner {
                queue: VecDeque::new(),
                finished: false,
                processing_popped: false,
                continuation: None,
            }),
            ready: Condvar::new(),
        }
    }

    fn is_ready(&self) -> bool {
        let inner = self.inner.lock();
        inner.finished || !inner.queue.is_empty()
    }

    fn is_finished(&self) -> bool {
        let inner = self.inner.lock();
        inner.finished && matches!(inner.queue.front(), None | Some(None))
    }

    fn wait_ready(&self) {
        let mut inner = self.inner.lock();
        while !inner.finished && inner.queue.is_empty() {
            self.ready.wait(&mut inner);
        }
    }

    /// Returns true if the caller has to execute the continuation.
    fn push_value(&self, value: T) -> bool {
        let run = {
            let mut inner = self.inner.lock();
            debug_assert!(!inner.finished, "value pushed to a closed stream");
            let run =
                inner.queue.is_empty() && !inner.processing_popped && inner.continuation.is_some();
            inner.queue.push_back(Some(value));
            run
        };
        self.ready.notify_all();
        run
    }

    /// Returns true if the caller has to execute the continuation.
    fn close(&self) -> bool {
        let run = {
            let mut inner = self.inner.lock();
            debug_assert!(!inner.finished, "stream closed twice");
            inner.finished = true;
            let run =
                inner.queue.is_empty() && !inner.processing_popped && inner.continuation.is_some();
            inner.queue.push_back(None);
            run
        };
        self.ready.notify_all();
        run
    }

    /// Outer `None` means the queue is empty; inner `None` is the sentinel.
    fn pop_value(&self) -> Option<Option<T>> {
        let mut inner = self.inner.lock();
        debug_assert!(!inner.processing_popped, "concurrent pop on a stream");
        let value = inner.queue.pop_front()?;
        inner.processing_popped = true;
        Some(value)
    }

    /// Returns true if the caller has to execute the continuation.
    fn finished_processing(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.processing_popped = false;
        !inner.queue.is_empty() && inner.continuation.is_some()
    }

    /// Returns true if the caller has to execute the continuation.
    fn chain(&self, continuation: Arc<dyn StreamContinuation<T>>) -> bool {
        let mut inner = self.inner.lock();
        debug_assert!(inner.continuation.is_none(), "stream already chained");
        debug_assert!(!inner.processing_popped);
        inner.continuation = Some(continuation);
        !inner.queue.is_empty()
    }

    fn continuation(&self) -> Option<Arc<dyn StreamContinuation<T>>> {
        self.inner.lock().continuation.clone()
    }

    fn reset_continuation(&self) {
        self.inner.lock().continuation = None;
    }
}

fn dispatch<T>(state: &Arc<StreamShared<T>>) {
    if let Some(continuation) = state.continuation() {
        continuation.continue_with(Arc::clone(state));
    }
}

struct ThenLink<E, F, U> {
    executor: E,
    map: F,
    next: Arc<StreamShared<U>>,
}

impl<T, U, E, F> StreamContinuation<T> for ThenLink<E, F, U>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Executor,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    fn continue_with(self: Arc<Self>, state: Arc<StreamShared<T>>) {
        let popped = match state.pop_value() {
            Some(popped) => popped,
            None => {
                debug_assert!(false, "stream continuation dispatched with an empty queue");
                return;
            }
        };

        match popped {
            // Stream has ended: propagate the sentinel and detach.
            None => {
                if self.next.close() {
                    dispatch(&self.next);
                }
                state.reset_continuation();
            }
            Some(value) => {
                let link = Arc::clone(&self);
                self.executor.spawn(move || {
                    if link.next.push_value((link.map)(value)) {
                        dispatch(&link.next);
                    }
                    // Reschedule for the next queued item, if any.
                    if state.finished_processing() {
                        Arc::clone(&link).continue_with(state);
                    }
                });
            }
        }
    }
}

/// Consuming end of an in-order async sequence.
pub struct Stream<T> {
    state: Arc<StreamShared<T>>,
}

impl<T> Stream<T> {
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Block until an item or the end of the stream, returning `None` at the
    /// end.
    pub fn get(&mut self) -> Option<T> {
        self.state.wait_ready();
        let value = self.state.pop_value();
        let _ = self.state.finished_processing();
        value.flatten()
    }

    /// Chain a continuation that maps every item on `executor`, preserving
    /// production order.
    pub fn then<U, E, F>(self, executor: E, map: F) -> Stream<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        E: Executor,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let next = Arc::new(StreamShared::new());
        let link: Arc<dyn StreamContinuation<T>> =
            Arc::new(ThenLink { executor, map, next: Arc::clone(&next) });
        if self.state.chain(Arc::clone(&link)) {
            link.continue_with(Arc::clone(&self.state));
        }
        Stream { state: next }
    }
}

/// Producing end of a [`Stream`]. Dropping it closes the stream.
pub struct StreamProducer<T> {
    state: Option<Arc<StreamShared<T>>>,
}

impl<T> StreamProducer<T> {
    /// Enqueue a value, dispatching the consumer-side continuation if idle.
    pub fn send(&self, value: T) {
        let state = match &self.state {
            Some(state) => state,
            None => unreachable!("producer already reset"),
        };
        if state.push_value(value) {
            dispatch(state);
        }
    }

    /// Close the stream. Equivalent to dropping the producer.
    pub fn reset(self) {}
}

impl<T> Drop for StreamProducer<T> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            if state.close() {
                dispatch(&state);
            }
        }
    }
}

/// Creates a connected [`Stream`]/[`StreamProducer`] pair.
pub fn make_stream<T>() -> (Stream<T>, StreamProducer<T>) {
    let state = Arc::new(StreamShared::new());
    (Stream { state: Arc::clone(&state) }, StreamProducer { state: Some(state) })
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
