// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use lodge_core::{Hotel, StreamItems, StreamKind};

use super::*;
use crate::observer::VecObserver;

fn hotel(id: i64, name: &str) -> Hotel {
    let mut hotel = Hotel::new(name);
    hotel.id = id;
    hotel.revision = 1;
    hotel
}

fn shared_observer() -> (Arc<Mutex<VecObserver<Hotel>>>, Arc<Mutex<dyn StreamObserver>>) {
    let observer = VecObserver::<Hotel>::shared();
    let erased: Arc<Mutex<dyn StreamObserver>> = observer.clone();
    (observer, erased)
}

#[test]
fn deltas_integrate_in_enqueue_order() {
    let (observer, erased) = shared_observer();
    let stream = DataStream::new(1, StreamKind::Hotel, "", serde_json::Value::Null);
    stream.connect(&erased);

    stream.apply_change(StreamDelta::ItemsAdded(StreamItems::Hotels(vec![
        hotel(1, "One"),
        hotel(2, "Two"),
    ])));
    stream.apply_change(StreamDelta::ItemsRemoved(vec![1]));
    stream.apply_change(StreamDelta::ItemsUpdated(StreamItems::Hotels(vec![hotel(2, "Two B")])));
    stream.apply_change(StreamDelta::Initialized);

    assert!(!stream.is_initialized());
    stream.integrate_changes();

    let observer = observer.lock();
    assert_eq!(1, observer.items().len());
    assert_eq!("Two B", observer.items()[0].name);
    assert!(observer.is_initialized());
    assert!(stream.is_initialized());
}

#[test]
fn single_id_filter_only_passes_the_requested_id() {
    let (observer, erased) = shared_observer();
    let stream = DataStream::new(1, StreamKind::Hotel, "hotel.by_id", json!({ "id": 2 }));
    stream.connect(&erased);
    assert_eq!(ServiceFilter::ById(2), stream.filter());

    stream.apply_change(StreamDelta::ItemsAdded(StreamItems::Hotels(vec![
        hotel(1, "One"),
        hotel(2, "Two"),
        hotel(3, "Three"),
    ])));
    // Neither of these mention id 2, so the observer must not hear about them.
    stream.apply_change(StreamDelta::ItemsUpdated(StreamItems::Hotels(vec![hotel(3, "Three B")])));
    stream.apply_change(StreamDelta::ItemsRemoved(vec![1, 3]));
    stream.integrate_changes();

    {
        let observer = observer.lock();
        assert_eq!(1, observer.items().len());
        assert_eq!(2, observer.items()[0].id);
    }

    // Removal of the filtered id passes through, reduced to just that id.
    stream.apply_change(StreamDelta::ItemsRemoved(vec![1, 2, 3]));
    stream.integrate_changes();
    assert!(observer.lock().items().is_empty());
}

#[test]
fn cleared_always_passes_the_filter() {
    let (observer, erased) = shared_observer();
    let stream = DataStream::new(1, StreamKind::Hotel, "hotel.by_id", json!({ "id": 7 }));
    stream.connect(&erased);

    stream.apply_change(StreamDelta::ItemsAdded(StreamItems::Hotels(vec![hotel(7, "Seven")])));
    stream.apply_change(StreamDelta::Cleared);
    stream.integrate_changes();

    assert!(observer.lock().items().is_empty());
}

#[test]
fn unknown_service_serves_unfiltered() {
    let stream = DataStream::new(1, StreamKind::Hotel, "hotel.by_name", json!({ "name": "x" }));
    assert_eq!(ServiceFilter::All, stream.filter());
}

#[test]
fn dropping_the_handle_invalidates_the_stream() {
    let (observer, erased) = shared_observer();
    let stream = Arc::new(DataStream::new(1, StreamKind::Hotel, "", serde_json::Value::Null));
    stream.connect(&erased);

    let handle = StreamHandle::new(Arc::clone(&stream), erased, None);
    assert!(stream.is_valid());

    drop(handle);
    // The test still holds an observer Arc, but detaching wins.
    assert!(!stream.is_valid());
    drop(observer);
}

#[test]
fn deltas_after_detach_are_dropped() {
    let (observer, erased) = shared_observer();
    let stream = DataStream::new(1, StreamKind::Hotel, "", serde_json::Value::Null);
    stream.connect(&erased);
    stream.disconnect();

    stream.apply_change(StreamDelta::ItemsAdded(StreamItems::Hotels(vec![hotel(1, "One")])));
    stream.integrate_changes();
    assert!(observer.lock().items().is_empty());
}
