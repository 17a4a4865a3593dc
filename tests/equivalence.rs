// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-vs-network equivalence: the same operation sequence against the
//! SQLite backend directly and through NetClient → NetServer must leave
//! observers in pointwise-equal end states.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;

use lodge_core::{
    Entity, Hotel, Operation, Reservation, ReservationStatus, StreamKind, TaskResultStatus,
};
use lodge_net::{NetClientBackend, NetServer};
use lodge_store::{Backend, BackendExt, SqliteBackend, StreamHandle, StreamObserver, VecObserver};

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn make_hotel(name: &str, rooms: usize) -> Hotel {
    let mut hotel = Hotel::new(name).with_category("std", "Standard");
    for i in 0..rooms {
        hotel = hotel.with_room(&format!("Room {}", i + 1), "std");
    }
    hotel
}

fn drain_until(backend: &dyn Backend, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        backend.change_queue().apply_all_changes();
        assert!(Instant::now() < deadline, "timed out waiting for the backend");
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Run one batch, record its statuses, and drain the change queue.
fn exec(
    backend: &dyn Backend,
    operations: Vec<Operation>,
    statuses: &mut Vec<Vec<TaskResultStatus>>,
) {
    let results = backend.queue_operations(operations, None).results();
    statuses.push(results.iter().map(|result| result.status).collect());
    backend.change_queue().apply_all_changes();
}

struct ScenarioOutcome {
    hotels: Vec<Hotel>,
    reservations: Vec<Reservation>,
    statuses: Vec<Vec<TaskResultStatus>>,
}

/// A mixed workload: stores, updates, a conflicting update, a delete.
fn run_scenario(backend: &dyn Backend) -> ScenarioOutcome {
    let hotels = VecObserver::<Hotel>::shared();
    let hotel_handle = backend.create_stream_typed::<Hotel>(hotels.clone());
    let reservations = VecObserver::<Reservation>::shared();
    let reservation_handle = backend.create_stream_typed::<Reservation>(reservations.clone());
    drain_until(backend, || hotel_handle.is_initialized() && reservation_handle.is_initialized());

    let mut statuses = Vec::new();

    exec(backend, vec![Operation::StoreNew(Entity::Hotel(make_hotel("Grand Hotel", 3)))], &mut statuses);
    exec(backend, vec![Operation::StoreNew(Entity::Hotel(make_hotel("Pension Alpenblick", 2)))], &mut statuses);

    let (room_a, room_b) = {
        let hotels = hotels.lock();
        (hotels.items()[0].rooms[0].id, hotels.items()[1].rooms[0].id)
    };
    exec(
        backend,
        vec![
            Operation::StoreNew(Entity::Reservation(
                Reservation::new("Alvarez", room_a, date(2017, 5, 1), date(2017, 5, 8))
                    .with_status(ReservationStatus::Confirmed)
                    .with_occupancy(2, 0),
            )),
            Operation::StoreNew(Entity::Reservation(
                Reservation::new("Brand", room_b, date(2017, 5, 3), date(2017, 5, 6))
                    .with_status(ReservationStatus::New)
                    .with_occupancy(1, 2),
            )),
        ],
        &mut statuses,
    );

    // Rename the first hotel at the current revision.
    let mut renamed = hotels.lock().items()[0].clone();
    renamed.name = "Grand Hotel Royal".to_string();
    exec(backend, vec![Operation::Update(Entity::Hotel(renamed))], &mut statuses);

    // Check the first guest in.
    let mut checked_in = reservations.lock().items()[0].clone();
    checked_in.status = ReservationStatus::CheckedIn;
    exec(backend, vec![Operation::Update(Entity::Reservation(checked_in))], &mut statuses);

    // A stale update must fail identically on both transports.
    let mut stale = hotels.lock().items()[0].clone();
    stale.revision = 1;
    stale.name = "Should Not Happen".to_string();
    exec(backend, vec![Operation::Update(Entity::Hotel(stale))], &mut statuses);

    // Drop the second reservation.
    let second_id = reservations.lock().items()[1].id;
    exec(backend, vec![Operation::Delete(lodge_core::EntityKind::Reservation, second_id)], &mut statuses);

    let outcome = ScenarioOutcome {
        hotels: hotels.lock().items().to_vec(),
        reservations: reservations.lock().items().to_vec(),
        statuses,
    };
    drop(hotel_handle);
    drop(reservation_handle);
    outcome
}

#[test]
fn local_and_network_backends_are_indistinguishable() {
    let dir = tempfile::tempdir().unwrap();

    // (a) straight to the SQLite backend
    let local = SqliteBackend::open(dir.path().join("local.db")).unwrap();
    let local_outcome = run_scenario(&local);

    // (b) through NetClient → NetServer → an identical SQLite backend
    let remote_backend = Arc::new(SqliteBackend::open(dir.path().join("remote.db")).unwrap());
    let server = NetServer::start(remote_backend, "127.0.0.1:0".parse().unwrap()).unwrap();
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());
    let remote_outcome = run_scenario(&client);

    assert_eq!(local_outcome.statuses, remote_outcome.statuses);
    assert_eq!(local_outcome.hotels, remote_outcome.hotels);
    assert_eq!(local_outcome.reservations, remote_outcome.reservations);

    // Sanity: the scenario actually exercised both the happy and error paths.
    assert_eq!(1, local_outcome.reservations.len());
    assert_eq!("Grand Hotel Royal", local_outcome.hotels[0].name);
    assert!(local_outcome
        .statuses
        .iter()
        .any(|batch| batch.contains(&TaskResultStatus::Error)));
}

#[test]
fn single_id_streams_match_across_transports() {
    let dir = tempfile::tempdir().unwrap();

    let observe = |backend: &dyn Backend| -> (Vec<Hotel>, StreamHandle) {
        let all = VecObserver::<Hotel>::shared();
        let all_handle = backend.create_stream_typed::<Hotel>(all.clone());
        backend
            .queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("One", 1))), None)
            .results();
        backend
            .queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Two", 1))), None)
            .results();
        drain_until(backend, || all.lock().items().len() == 2);
        let target = all.lock().items()[1].id;

        let filtered = VecObserver::<Hotel>::shared();
        let erased: Arc<Mutex<dyn StreamObserver>> = filtered.clone();
        let handle =
            backend.create_stream(erased, StreamKind::Hotel, "hotel.by_id", json!({ "id": target }));
        drain_until(backend, || handle.is_initialized());
        drop(all_handle);
        let items = filtered.lock().items().to_vec();
        (items, handle)
    };

    let local = SqliteBackend::open(dir.path().join("local.db")).unwrap();
    let (local_items, _local_handle) = observe(&local);

    let remote_backend = Arc::new(SqliteBackend::open(dir.path().join("remote.db")).unwrap());
    let server = NetServer::start(remote_backend, "127.0.0.1:0".parse().unwrap()).unwrap();
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());
    let (remote_items, _remote_handle) = observe(&client);

    assert_eq!(local_items, remote_items);
    assert_eq!(1, local_items.len());
    assert_eq!("Two", local_items[0].name);
}
