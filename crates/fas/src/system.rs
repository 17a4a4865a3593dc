// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide system executor.
//!
//! A single [`ThreadedExecutor`] shared by everything that does not want to
//! manage its own. Lifecycle is [`init`]/[`shutdown`] at process edges;
//! prefer passing executors explicitly and reserve this for tests and
//! tooling.

use parking_lot::Mutex;

use crate::executor::{Executor, ThreadedExecutor};

static SYSTEM: Mutex<Option<ThreadedExecutor>> = Mutex::new(None);

/// Initializes the system executor. Must be called before any
/// [`SystemExecutor`] handle is used.
pub fn init() {
    let mut system = SYSTEM.lock();
    debug_assert!(system.is_none(), "system executor initialized twice");
    let executor = ThreadedExecutor::new();
    executor.start();
    *system = Some(executor);
}

/// Stops the system executor. All executors must have drained by the time
/// this is called.
pub fn shutdown() {
    let executor = SYSTEM.lock().take();
    debug_assert!(executor.is_some(), "system executor shut down twice");
    if let Some(executor) = executor {
        executor.stop();
    }
}

/// Copyable handle to the process-wide executor.
#[derive(Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        SystemExecutor
    }
}

impl Executor for SystemExecutor {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let executor = SYSTEM.lock().clone();
        debug_assert!(executor.is_some(), "system executor used before init");
        if let Some(executor) = executor {
            executor.spawn(job);
        }
    }
}
