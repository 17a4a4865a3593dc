// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe buffer between backend workers and the main thread.

use std::sync::Arc;

use parking_lot::Mutex;

use lodge_core::TaskResult;

use crate::stream::{DataStream, StreamDelta};
use crate::task::Task;

type ChangesAvailableHandler = Box<dyn Fn() + Send + Sync>;

/// Collects per-stream deltas and task completions produced on backend worker
/// threads and hands them to the draining thread.
///
/// Ordering guarantee: for a given stream, deltas reach the observer in the
/// exact order the backend enqueued them. There is no cross-stream ordering.
#[derive(Default)]
pub struct ChangeQueue {
    streams: Mutex<Vec<Arc<DataStream>>>,
    tasks: Mutex<Vec<Arc<Task>>>,
    stream_changes: Mutex<Vec<(u64, StreamDelta)>>,
    completed_tasks: Mutex<Vec<(u64, Vec<TaskResult>)>>,
    changes_available: Mutex<Option<ChangesAvailableHandler>>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream. Deltas referencing an unregistered stream id are
    /// dropped.
    pub fn add_stream(&self, stream: Arc<DataStream>) {
        self.streams.lock().push(stream);
    }

    /// Register a task awaiting completion delivery.
    pub fn add_task(&self, task: Arc<Task>) {
        self.tasks.lock().push(task);
    }

    /// True while at least one live stream has not yet received its initial
    /// data.
    pub fn has_uninitialized_streams(&self) -> bool {
        self.streams
            .lock()
            .iter()
            .any(|stream| stream.is_valid() && !stream.is_initialized())
    }

    /// Snapshot of the currently registered streams, for backend fan-out.
    pub fn streams(&self) -> Vec<Arc<DataStream>> {
        self.streams.lock().clone()
    }

    /// Worker-side append of one delta; fires the changes-available signal.
    pub fn add_stream_change(&self, stream_id: u64, delta: StreamDelta) {
        self.stream_changes.lock().push((stream_id, delta));
        self.signal();
    }

    /// Worker-side completion of a task; fires the changes-available signal.
    pub fn task_completed(&self, task_id: u64, results: Vec<TaskResult>) {
        self.completed_tasks.lock().push((task_id, results));
        self.signal();
    }

    /// Main-thread drain of pending stream deltas.
    ///
    /// Evicts invalid streams first, then routes a snapshot of the pending
    /// deltas to their streams and integrates each stream's buffer into its
    /// observer. The mutexes are only held while snapshotting.
    pub fn apply_stream_changes(&self) {
        let streams = {
            let mut streams = self.streams.lock();
            streams.retain(|stream| stream.is_valid());
            streams.clone()
        };

        let changes = std::mem::take(&mut *self.stream_changes.lock());
        for (stream_id, delta) in changes {
            // A missing stream just means its handle dropped in the meantime.
            if let Some(stream) = streams.iter().find(|stream| stream.stream_id() == stream_id) {
                stream.apply_change(delta);
            }
        }

        for stream in &streams {
            stream.integrate_changes();
        }
    }

    /// Main-thread drain of completed tasks.
    pub fn notify_completed_tasks(&self) {
        let tasks = self.tasks.lock().clone();

        let completed = std::mem::take(&mut *self.completed_tasks.lock());
        for (task_id, results) in completed {
            if let Some(task) = tasks.iter().find(|task| task.task_id() == task_id) {
                task.set_results(&results);
            }
        }

        self.tasks.lock().retain(|task| !task.is_completed() && task.is_valid());
    }

    /// Drain both stream deltas and task completions.
    pub fn apply_all_changes(&self) {
        self.apply_stream_changes();
        self.notify_completed_tasks();
    }

    /// Install the handler fired whenever either queue becomes non-empty.
    ///
    /// The handler runs on the worker thread that produced the change; it is
    /// expected to re-post the drain to the main loop, not to drain inline.
    pub fn set_changes_available_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        *self.changes_available.lock() = Some(Box::new(handler));
    }

    fn signal(&self) {
        if let Some(handler) = &*self.changes_available.lock() {
            handler();
        }
    }
}

#[cfg(test)]
#[path = "change_queue_tests.rs"]
mod tests;
