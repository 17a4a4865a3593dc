// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executors: where continuations and jobs run.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A cheaply cloneable handle to something that can run jobs.
///
/// Handle clones enqueue to the same underlying queue. Continuations created
/// by [`Future::then`](crate::Future::then) and
/// [`Stream::then`](crate::Stream::then) store the executor handle they were
/// given and dispatch themselves to it when their predecessor completes.
pub trait Executor: Clone + Send + Sync + 'static {
    /// Submit a job. Never blocks beyond a brief mutex hold.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

struct JobQueue {
    jobs: VecDeque<Job>,
    quit: bool,
}

struct WorkerState {
    queue: Mutex<JobQueue>,
    available: Condvar,
}

impl WorkerState {
    fn run(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock();
                while !queue.quit && queue.jobs.is_empty() {
                    self.available.wait(&mut queue);
                }
                if queue.quit {
                    return;
                }
                queue.jobs.pop_front()
            };
            if let Some(job) = job {
                job();
            }
        }
    }
}

struct ThreadedInner {
    state: Arc<WorkerState>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadedInner {
    fn stop_and_join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            {
                let mut queue = self.state.queue.lock();
                queue.quit = true;
            }
            self.state.available.notify_one();
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadedInner {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Sequential executor running in its own thread.
///
/// Jobs are drained from an unbounded FIFO queue and executed strictly one at
/// a time, in submission order. The worker thread is not launched until
/// [`start`](ThreadedExecutor::start) is called; [`stop`](ThreadedExecutor::stop)
/// signals it and joins. Dropping the last handle also stops the worker.
#[derive(Clone)]
pub struct ThreadedExecutor {
    inner: Arc<ThreadedInner>,
}

impl ThreadedExecutor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedInner {
                state: Arc::new(WorkerState {
                    queue: Mutex::new(JobQueue { jobs: VecDeque::new(), quit: false }),
                    available: Condvar::new(),
                }),
                thread: Mutex::new(None),
            }),
        }
    }

    /// Launch the worker thread.
    pub fn start(&self) {
        let mut slot = self.inner.thread.lock();
        debug_assert!(slot.is_none(), "executor already started");
        self.inner.state.queue.lock().quit = false;
        let state = Arc::clone(&self.inner.state);
        *slot = Some(std::thread::spawn(move || state.run()));
    }

    /// Signal the worker to quit and join it. Jobs still queued are dropped.
    pub fn stop(&self) {
        self.inner.stop_and_join();
    }
}

impl Default for ThreadedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ThreadedExecutor {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let wake = {
            let mut queue = self.inner.state.queue.lock();
            let wake = queue.jobs.is_empty();
            queue.jobs.push_back(Box::new(job));
            wake
        };
        if wake {
            self.inner.state.available.notify_one();
        }
    }
}

/// Executor which buffers jobs until drained.
///
/// [`run`](QueueExecutor::run) synchronously executes queued jobs in FIFO
/// order until the queue is empty; jobs spawned while draining are executed in
/// the same call. Used by the main thread and by tests.
#[derive(Clone, Default)]
pub struct QueueExecutor {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl QueueExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute queued jobs until the queue is empty.
    pub fn run(&self) {
        loop {
            let job = self.jobs.lock().pop_front();
            match job {
                Some(job) => job(),
                None => return,
            }
        }
    }

    /// Drain jobs in reverse submission order.
    ///
    /// An adversarial scheduler for tests exercising the stream ordering
    /// guarantee; real executors are free to run jobs in any order.
    pub fn run_reversed(&self) {
        loop {
            let job = self.jobs.lock().pop_back();
            match job {
                Some(job) => job(),
                None => return,
            }
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }
}

impl Executor for QueueExecutor {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.jobs.lock().push_back(Box::new(job));
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
