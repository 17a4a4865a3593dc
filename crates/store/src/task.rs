// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks: queued operation batches exposing completion to one observer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use lodge_core::TaskResult;
use lodge_fas::Future;

/// Receives a task's results once the batch has executed. Invoked from the
/// thread draining the change queue.
pub trait TaskObserver: Send {
    fn results_available(&mut self, results: &[TaskResult]);
}

/// Shared state of a queued operation batch. Completion is one-shot.
pub struct Task {
    task_id: u64,
    completed: AtomicBool,
    observer: Mutex<Option<Weak<Mutex<dyn TaskObserver>>>>,
}

impl Task {
    pub fn new(task_id: u64) -> Self {
        Self { task_id, completed: AtomicBool::new(false), observer: Mutex::new(None) }
    }

    pub fn connect(&self, observer: &Arc<Mutex<dyn TaskObserver>>) {
        let mut slot = self.observer.lock();
        debug_assert!(slot.is_none(), "task connected twice");
        *slot = Some(Arc::downgrade(observer));
    }

    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// True while an observer is attached.
    pub fn is_valid(&self) -> bool {
        self.observer.lock().as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Dissociate the task from its observer.
    pub fn disconnect(&self) {
        *self.observer.lock() = None;
    }

    /// Deliver the results to the observer, at most once.
    pub fn set_results(&self, results: &[TaskResult]) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        let observer = self.observer.lock().as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            observer.lock().results_available(results);
        }
    }
}

/// Owning handle for a queued batch.
///
/// Keep it alive for as long as the observer wants notifications; dropping it
/// detaches the observer. [`results`](TaskHandle::results) blocks on the
/// backend worker, independent of any change-queue draining.
pub struct TaskHandle {
    task: Arc<Task>,
    future: Option<Future<Vec<TaskResult>>>,
    _observer: Option<Arc<Mutex<dyn TaskObserver>>>,
}

impl TaskHandle {
    pub fn new(
        task: Arc<Task>,
        future: Future<Vec<TaskResult>>,
        observer: Option<Arc<Mutex<dyn TaskObserver>>>,
    ) -> Self {
        Self { task, future: Some(future), _observer: observer }
    }

    pub fn task_id(&self) -> u64 {
        self.task.task_id()
    }

    pub fn is_completed(&self) -> bool {
        self.task.is_completed()
    }

    /// Block until the batch has executed.
    pub fn wait(&self) {
        if let Some(future) = &self.future {
            future.wait();
        }
    }

    /// Block until the batch has executed and return the per-operation
    /// results.
    pub fn results(mut self) -> Vec<TaskResult> {
        match self.future.take() {
            Some(future) => future.get(),
            None => Vec::new(),
        }
    }

    /// Take the underlying future, e.g. to chain continuations onto it.
    pub fn take_future(&mut self) -> Option<Future<Vec<TaskResult>>> {
        self.future.take()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.task.disconnect();
    }
}
