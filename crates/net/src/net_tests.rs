// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loopback tests: a client backend talking to a server-hosted SQLite
//! backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::json;

use lodge_core::{
    Entity, Hotel, Operation, Reservation, ReservationStatus, StreamKind, TaskResultStatus,
};
use lodge_store::{Backend, BackendExt, SqliteBackend, StreamObserver, VecObserver};

use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn start_server(dir: &tempfile::TempDir) -> NetServer {
    let backend = Arc::new(SqliteBackend::open(dir.path().join("server.db")).unwrap());
    NetServer::start(backend, "127.0.0.1:0".parse().unwrap()).unwrap()
}

fn drain_until(client: &NetClientBackend, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        client.change_queue().apply_all_changes();
        assert!(Instant::now() < deadline, "timed out waiting for the server");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn make_hotel(name: &str) -> Hotel {
    Hotel::new(name)
        .with_category("std", "Standard")
        .with_room("101", "std")
        .with_room("102", "std")
}

#[test]
fn streams_and_tasks_work_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir);
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());

    let hotels = VecObserver::<Hotel>::shared();
    let handle = client.create_stream_typed::<Hotel>(hotels.clone());
    drain_until(&client, || handle.is_initialized());
    assert!(hotels.lock().items().is_empty());

    // Store through the socket; the future resolves from the task_results
    // message.
    let results = client
        .queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Remote Hotel"))), None)
        .results();
    assert_eq!(1, results.len());
    assert_eq!(TaskResultStatus::Successful, results[0].status);

    drain_until(&client, || !hotels.lock().items().is_empty());
    let stored = hotels.lock().items()[0].clone();
    assert_ne!(0, stored.id);
    assert_eq!(1, stored.revision);
    assert_eq!("Remote Hotel", stored.name);
    assert_eq!(2, stored.rooms.len());
}

#[test]
fn reservations_round_trip_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir);
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());

    let hotels = VecObserver::<Hotel>::shared();
    let _hotel_handle = client.create_stream_typed::<Hotel>(hotels.clone());
    client
        .queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Hotel"))), None)
        .results();
    drain_until(&client, || !hotels.lock().items().is_empty());
    let room_id = hotels.lock().items()[0].rooms[0].id;

    let reservations = VecObserver::<Reservation>::shared();
    let _reservation_handle = client.create_stream_typed::<Reservation>(reservations.clone());
    let reservation = Reservation::new("Smith", room_id, date(2017, 1, 1), date(2017, 1, 8))
        .with_status(ReservationStatus::Confirmed)
        .with_occupancy(2, 1);
    let results = client
        .queue_operation(Operation::StoreNew(Entity::Reservation(reservation)), None)
        .results();
    assert_eq!(TaskResultStatus::Successful, results[0].status);

    drain_until(&client, || !reservations.lock().items().is_empty());
    let stored = reservations.lock().items()[0].clone();
    assert_eq!("Smith", stored.description);
    assert_eq!(ReservationStatus::Confirmed, stored.status);
    assert_eq!(room_id, stored.atoms[0].room_id);
}

#[test]
fn single_id_stream_filters_remotely() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir);
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());

    let hotels = VecObserver::<Hotel>::shared();
    let _all_handle = client.create_stream_typed::<Hotel>(hotels.clone());
    client.queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("One"))), None).results();
    client.queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Two"))), None).results();
    drain_until(&client, || hotels.lock().items().len() == 2);
    let second = hotels.lock().items()[1].clone();

    let filtered = VecObserver::<Hotel>::shared();
    let erased: Arc<Mutex<dyn StreamObserver>> = filtered.clone();
    let filtered_handle =
        client.create_stream(erased, StreamKind::Hotel, "hotel.by_id", json!({ "id": second.id }));
    drain_until(&client, || filtered_handle.is_initialized());

    assert_eq!(vec![second.clone()], filtered.lock().items().to_vec());

    client.queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Three"))), None).results();
    drain_until(&client, || hotels.lock().items().len() == 3);
    assert_eq!(vec![second], filtered.lock().items().to_vec());
}

#[test]
fn failed_operations_report_errors_over_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir);
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());

    let hotels = VecObserver::<Hotel>::shared();
    let _handle = client.create_stream_typed::<Hotel>(hotels.clone());
    client.queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Hotel"))), None).results();
    drain_until(&client, || !hotels.lock().items().is_empty());

    let mut stale = hotels.lock().items()[0].clone();
    stale.revision = 41;
    stale.name = "Stale".to_string();
    let results =
        client.queue_operation(Operation::Update(Entity::Hotel(stale)), None).results();
    assert_eq!(TaskResultStatus::Error, results[0].status);
    assert_eq!("version conflict", results[0].payload["message"]);
}

#[test]
fn removing_a_stream_stops_its_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(&dir);
    let client = NetClientBackend::connect("127.0.0.1", server.local_addr().port());

    let hotels = VecObserver::<Hotel>::shared();
    let handle = client.create_stream_typed::<Hotel>(hotels.clone());
    drain_until(&client, || handle.is_initialized());
    drop(handle);

    client.queue_operation(Operation::StoreNew(Entity::Hotel(make_hotel("Hotel"))), None).results();
    // Give any stray delta a chance to arrive, then confirm silence.
    std::thread::sleep(Duration::from_millis(50));
    client.change_queue().apply_all_changes();
    assert!(hotels.lock().items().is_empty());
}
