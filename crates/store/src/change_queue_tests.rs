// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use lodge_core::{Hotel, StreamItems, StreamKind, TaskResult};

use super::*;
use crate::observer::VecObserver;
use crate::stream::{StreamHandle, StreamObserver};
use crate::task::TaskObserver;

fn hotel(id: i64, name: &str) -> Hotel {
    let mut hotel = Hotel::new(name);
    hotel.id = id;
    hotel.revision = 1;
    hotel
}

fn open_stream(
    queue: &ChangeQueue,
    stream_id: u64,
) -> (Arc<Mutex<VecObserver<Hotel>>>, StreamHandle) {
    let observer = VecObserver::<Hotel>::shared();
    let erased: Arc<Mutex<dyn StreamObserver>> = observer.clone();
    let stream = Arc::new(DataStream::new(stream_id, StreamKind::Hotel, "", Value::Null));
    stream.connect(&erased);
    queue.add_stream(Arc::clone(&stream));
    (observer, StreamHandle::new(stream, erased, None))
}

#[test]
fn deltas_are_routed_by_stream_id_in_order() {
    let queue = ChangeQueue::new();
    let (observer1, _handle1) = open_stream(&queue, 1);
    let (observer2, _handle2) = open_stream(&queue, 2);

    queue.add_stream_change(1, StreamDelta::ItemsAdded(StreamItems::Hotels(vec![hotel(1, "A")])));
    queue.add_stream_change(2, StreamDelta::ItemsAdded(StreamItems::Hotels(vec![hotel(2, "B")])));
    queue.add_stream_change(1, StreamDelta::ItemsUpdated(StreamItems::Hotels(vec![hotel(1, "A2")])));
    queue.apply_stream_changes();

    assert_eq!("A2", observer1.lock().items()[0].name);
    assert_eq!("B", observer2.lock().items()[0].name);
}

#[test]
fn deltas_for_unknown_streams_are_dropped() {
    let queue = ChangeQueue::new();
    let (observer, _handle) = open_stream(&queue, 1);

    queue.add_stream_change(99, StreamDelta::ItemsAdded(StreamItems::Hotels(vec![hotel(9, "X")])));
    queue.apply_stream_changes();

    assert!(observer.lock().items().is_empty());
}

#[test]
fn invalid_streams_are_evicted_on_drain() {
    let queue = ChangeQueue::new();
    let (_observer, handle) = open_stream(&queue, 1);

    assert!(queue.has_uninitialized_streams());
    drop(handle);

    queue.apply_stream_changes();
    assert!(queue.streams().is_empty());
    assert!(!queue.has_uninitialized_streams());
}

#[test]
fn signal_fires_on_stream_changes_and_task_completions() {
    let queue = ChangeQueue::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    queue.set_changes_available_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    queue.add_stream_change(1, StreamDelta::Cleared);
    queue.task_completed(1, Vec::new());
    assert_eq!(2, fired.load(Ordering::SeqCst));
}

struct RecordingTaskObserver {
    received: Vec<Vec<TaskResult>>,
}

impl TaskObserver for RecordingTaskObserver {
    fn results_available(&mut self, results: &[TaskResult]) {
        self.received.push(results.to_vec());
    }
}

#[test]
fn completed_tasks_notify_their_observer_once() {
    let queue = ChangeQueue::new();
    let observer = Arc::new(Mutex::new(RecordingTaskObserver { received: Vec::new() }));
    let erased: Arc<Mutex<dyn TaskObserver>> = observer.clone();

    let task = Arc::new(Task::new(7));
    task.connect(&erased);
    queue.add_task(Arc::clone(&task));

    queue.task_completed(7, vec![TaskResult::success(Value::Null)]);
    queue.notify_completed_tasks();
    // A second drain must not re-deliver.
    queue.task_completed(7, vec![TaskResult::success(Value::Null)]);
    queue.notify_completed_tasks();

    assert_eq!(1, observer.lock().received.len());
    assert!(task.is_completed());
}
