// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Future/Promise tests: chaining, dispatch, implicit cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serial_test::serial;

use super::*;
use crate::executor::{QueueExecutor, ThreadedExecutor};
use crate::system::{self, SystemExecutor};

#[test]
fn promise_resolves_future() {
    let (future, promise) = make_promise::<i32>();
    assert!(!future.is_ready());

    promise.resolve(10);
    assert!(future.is_ready());
    assert_eq!(10, future.get());
}

#[test]
fn implicit_cancellation_skips_pending_continuations() {
    let executor = QueueExecutor::new();

    let executed1 = Arc::new(AtomicBool::new(false));
    let executed2 = Arc::new(AtomicBool::new(false));

    let (future, promise) = make_promise::<i32>();
    let flag1 = Arc::clone(&executed1);
    let future = future.then(executor.clone(), move |i| {
        flag1.store(true, Ordering::SeqCst);
        i
    });
    let flag2 = Arc::clone(&executed2);
    let future = future.then(executor.clone(), move |i| {
        flag2.store(true, Ordering::SeqCst);
        i
    });
    promise.resolve(10);

    future.reset();
    executor.run();
    assert!(!executed1.load(Ordering::SeqCst));
    assert!(!executed2.load(Ordering::SeqCst));
}

#[test]
fn continuation_on_resolved_future_dispatches_immediately() {
    let executor = QueueExecutor::new();

    let (future, promise) = make_promise::<i32>();
    promise.resolve(10);

    let future2 = future.then(executor.clone(), |i| (i, i * i));
    assert!(!future2.is_ready());
    assert_eq!(1, executor.job_count());

    executor.run();
    assert!(future2.is_ready());
    assert_eq!((10, 100), future2.get());
}

#[test]
fn long_chain_on_threaded_executor() {
    let executor = ThreadedExecutor::new();
    executor.start();

    let (future, promise) = make_promise::<i32>();
    promise.resolve(10);

    let mut future = future;
    for _ in 0..100 {
        future = future.then(executor.clone(), |i| i + 2).then(executor.clone(), |i| i - 1);
    }

    assert_eq!(110, future.get());
}

#[test]
#[serial]
fn chain_on_system_executor() {
    system::init();
    let executor = SystemExecutor::new();

    let (future, promise) = make_promise::<i32>();
    promise.resolve(10);

    let mut future = future;
    for _ in 0..100 {
        future = future.then(executor, |i| i + 2).then(executor, |i| i - 1);
    }

    assert_eq!(110, future.get());
    system::shutdown();
}

#[test]
fn continuations_hop_between_executors() {
    let executor1 = QueueExecutor::new();
    let executor2 = QueueExecutor::new();

    let (future, promise) = make_promise::<i32>();
    let future2 = future.then(executor1.clone(), |i| i * 2);
    let future3 = future2.then(executor2.clone(), |i| i * 3);
    let future4 = future3.then(executor1.clone(), |i| i * 4);

    promise.resolve(10);

    assert_eq!(1, executor1.job_count());
    assert_eq!(0, executor2.job_count());

    executor1.run();
    assert_eq!(0, executor1.job_count());
    assert_eq!(1, executor2.job_count());

    executor2.run();
    assert_eq!(1, executor1.job_count());
    assert_eq!(0, executor2.job_count());

    executor1.run();
    assert_eq!(0, executor1.job_count());
    assert_eq!(0, executor2.job_count());

    assert!(future4.is_ready());
    assert_eq!(10 * 2 * 3 * 4, future4.get());
}

#[test]
fn get_blocks_until_resolved_on_another_thread() {
    let (future, promise) = make_promise::<&'static str>();

    let resolver = std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(10));
        promise.resolve("done");
    });

    assert_eq!("done", future.get());
    resolver.join().unwrap();
}

#[test]
fn dropping_a_chain_handle_cancels_downstream() {
    let executor = QueueExecutor::new();
    let executed = Arc::new(AtomicBool::new(false));

    let (future, promise) = make_promise::<i32>();
    let flag = Arc::clone(&executed);
    let chained = future.then(executor.clone(), move |i| {
        flag.store(true, Ordering::SeqCst);
        i
    });
    drop(chained);

    promise.resolve(1);
    executor.run();
    assert!(!executed.load(Ordering::SeqCst));
}
