// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor tests: FIFO draining and worker-thread serialization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::*;

#[test]
fn queue_executor_drains_in_fifo_order() {
    let executor = QueueExecutor::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..5 {
        let order = Arc::clone(&order);
        executor.spawn(move || order.lock().push(i));
    }
    assert_eq!(5, executor.job_count());

    executor.run();
    assert_eq!(0, executor.job_count());
    assert_eq!(vec![0, 1, 2, 3, 4], *order.lock());
}

#[test]
fn queue_executor_runs_jobs_spawned_while_draining() {
    let executor = QueueExecutor::new();
    let count = Arc::new(AtomicUsize::new(0));

    let inner_count = Arc::clone(&count);
    let inner_executor = executor.clone();
    executor.spawn(move || {
        inner_count.fetch_add(1, Ordering::SeqCst);
        let count = Arc::clone(&inner_count);
        inner_executor.spawn(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    });

    executor.run();
    assert_eq!(2, count.load(Ordering::SeqCst));
}

#[test]
fn queue_executor_clones_share_the_queue() {
    let executor = QueueExecutor::new();
    let clone = executor.clone();
    let count = Arc::new(AtomicUsize::new(0));

    let job_count = Arc::clone(&count);
    clone.spawn(move || {
        job_count.fetch_add(1, Ordering::SeqCst);
    });

    executor.run();
    assert_eq!(1, count.load(Ordering::SeqCst));
}

#[test]
fn threaded_executor_runs_jobs_sequentially() {
    let executor = ThreadedExecutor::new();
    executor.start();

    let order = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    for i in 0..100 {
        let order = Arc::clone(&order);
        let done = done_tx.clone();
        executor.spawn(move || {
            order.lock().push(i);
            if i == 99 {
                let _ = done.send(());
            }
        });
    }

    done_rx.recv().unwrap();
    executor.stop();
    assert_eq!((0..100).collect::<Vec<_>>(), *order.lock());
}

#[test]
fn threaded_executor_stops_on_last_handle_drop() {
    let executor = ThreadedExecutor::new();
    executor.start();

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    executor.spawn(move || {
        let _ = done_tx.send(());
    });
    done_rx.recv().unwrap();

    // No explicit stop: dropping the handle joins the worker.
    drop(executor);
}
