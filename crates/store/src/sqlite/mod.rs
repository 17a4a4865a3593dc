// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local, SQLite-backed [`Backend`].
//!
//! One worker thread owns the database connection and drains a FIFO of
//! operation batches and stream-open requests. Each batch runs inside a
//! transaction: on the first failing operation the whole batch rolls back, no
//! delta is published, and the results list is truncated at the error.

mod storage;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use lodge_core::{
    Entity, EntityKind, HotelError, Operation, Reservation, ReservationError, ReservationStatus,
    StreamItems, StreamKind, TaskResult,
};
use lodge_fas::{make_promise, Promise};

use crate::backend::Backend;
use crate::change_queue::ChangeQueue;
use crate::error::StoreError;
use crate::stream::{DataStream, ServiceFilter, StreamDelta, StreamHandle, StreamObserver};
use crate::task::{Task, TaskHandle, TaskObserver};

use storage::SqliteStorage;

/// Per-operation failure inside a batch. Surfaced to the client as a
/// `TaskResult` with an error payload, never as a panic.
#[derive(Debug, Error)]
enum OpError {
    #[error("version conflict")]
    VersionConflict,

    #[error("{0}")]
    InvalidHotel(#[from] HotelError),

    #[error("{0}")]
    InvalidReservation(#[from] ReservationError),

    #[error("room {0} does not exist")]
    UnknownRoom(i64),

    #[error("room {room} is already booked in [{from}, {to})")]
    DoubleBooked { room: i64, from: chrono::NaiveDate, to: chrono::NaiveDate },

    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Row-level outcome of one operation, fanned out to matching streams after
/// commit.
enum Effect {
    Added(StreamItems),
    Updated(StreamItems),
    Removed(StreamKind, Vec<i64>),
    Cleared,
}

struct Batch {
    operations: Vec<Operation>,
    task: Arc<Task>,
    promise: Promise<Vec<TaskResult>>,
}

enum WorkItem {
    Batch(Batch),
    OpenStream(Arc<DataStream>),
}

struct WorkQueue {
    items: VecDeque<WorkItem>,
    quit: bool,
}

struct WorkerShared {
    queue: Mutex<WorkQueue>,
    work_available: Condvar,
}

impl WorkerShared {
    fn push(&self, item: WorkItem) {
        {
            let mut queue = self.queue.lock();
            queue.items.push_back(item);
        }
        self.work_available.notify_one();
    }
}

/// SQLite-backed implementation of the [`Backend`] contract.
pub struct SqliteBackend {
    change_queue: Arc<ChangeQueue>,
    shared: Arc<WorkerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    next_stream_id: AtomicU64,
    next_task_id: AtomicU64,
}

impl SqliteBackend {
    /// Open (creating if absent) the database at `path` and start the worker.
    ///
    /// The connection is opened on the worker thread and stays confined to
    /// it; open failures are reported here synchronously.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let change_queue = Arc::new(ChangeQueue::new());
        let shared = Arc::new(WorkerShared {
            queue: Mutex::new(WorkQueue { items: VecDeque::new(), quit: false }),
            work_available: Condvar::new(),
        });

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let worker_queue = Arc::clone(&change_queue);
        let worker = std::thread::spawn(move || {
            let storage = match SqliteStorage::open(&path) {
                Ok(storage) => {
                    let _ = ready_tx.send(Ok(()));
                    storage
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            worker_loop(&storage, &worker_shared, &worker_queue);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                change_queue,
                shared,
                worker: Mutex::new(Some(worker)),
                next_stream_id: AtomicU64::new(1),
                next_task_id: AtomicU64::new(1),
            }),
            Ok(Err(err)) => {
                let _ = worker.join();
                Err(StoreError::Sqlite(err))
            }
            Err(_) => Err(StoreError::WorkerUnavailable),
        }
    }

    /// Signal the worker to quit and join it.
    pub fn stop_and_join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            self.shared.queue.lock().quit = true;
            self.shared.work_available.notify_one();
            let _ = handle.join();
        }
    }
}

impl Drop for SqliteBackend {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl Backend for SqliteBackend {
    fn change_queue(&self) -> &ChangeQueue {
        &self.change_queue
    }

    fn queue_operations(
        &self,
        operations: Vec<Operation>,
        observer: Option<Arc<Mutex<dyn TaskObserver>>>,
    ) -> TaskHandle {
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let task = Arc::new(Task::new(task_id));
        if let Some(observer) = &observer {
            task.connect(observer);
        }
        self.change_queue.add_task(Arc::clone(&task));

        let (future, promise) = make_promise();
        self.shared.push(WorkItem::Batch(Batch { operations, task: Arc::clone(&task), promise }));

        TaskHandle::new(task, future, observer)
    }

    fn create_stream(
        &self,
        observer: Arc<Mutex<dyn StreamObserver>>,
        kind: StreamKind,
        service: &str,
        options: Value,
    ) -> StreamHandle {
        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let stream = Arc::new(DataStream::new(stream_id, kind, service, options));
        stream.connect(&observer);
        self.change_queue.add_stream(Arc::clone(&stream));

        self.shared.push(WorkItem::OpenStream(Arc::clone(&stream)));

        StreamHandle::new(stream, observer, None)
    }
}

fn worker_loop(storage: &SqliteStorage, shared: &WorkerShared, change_queue: &ChangeQueue) {
    loop {
        let item = {
            let mut queue = shared.queue.lock();
            while !queue.quit && queue.items.is_empty() {
                shared.work_available.wait(&mut queue);
            }
            if queue.quit {
                return;
            }
            queue.items.pop_front()
        };
        match item {
            Some(WorkItem::Batch(batch)) => run_batch(storage, change_queue, batch),
            Some(WorkItem::OpenStream(stream)) => initialize_stream(storage, change_queue, &stream),
            None => {}
        }
    }
}

/// Load the stream's initial dataset and emit it followed by `Initialized`.
fn initialize_stream(storage: &SqliteStorage, change_queue: &ChangeQueue, stream: &DataStream) {
    let items = match load_initial(storage, stream) {
        Ok(items) => items,
        Err(err) => {
            error!(stream_id = stream.stream_id(), error = %err, "initial stream load failed");
            StreamItems::empty(stream.kind())
        }
    };
    change_queue.add_stream_change(stream.stream_id(), StreamDelta::ItemsAdded(items));
    change_queue.add_stream_change(stream.stream_id(), StreamDelta::Initialized);
}

fn load_initial(storage: &SqliteStorage, stream: &DataStream) -> Result<StreamItems, rusqlite::Error> {
    Ok(match (stream.kind(), stream.filter()) {
        (StreamKind::Hotel, ServiceFilter::All) => StreamItems::Hotels(storage.load_hotels()?),
        (StreamKind::Hotel, ServiceFilter::ById(id)) => {
            StreamItems::Hotels(storage.load_hotel(id)?.into_iter().collect())
        }
        (StreamKind::Reservation, ServiceFilter::All) => {
            StreamItems::Reservations(storage.load_reservations()?)
        }
        (StreamKind::Reservation, ServiceFilter::ById(id)) => {
            StreamItems::Reservations(storage.load_reservation(id)?.into_iter().collect())
        }
    })
}

fn run_batch(storage: &SqliteStorage, change_queue: &ChangeQueue, batch: Batch) {
    let Batch { operations, task, promise } = batch;
    debug!(task_id = task.task_id(), operations = operations.len(), "executing batch");

    let mut results = Vec::with_capacity(operations.len());
    let mut effects = Vec::new();
    let committed = execute_batch(storage, &operations, &mut results, &mut effects);

    if committed {
        publish_effects(change_queue, effects);
    }

    // Completion is queued before the future resolves, so a caller that
    // blocks on the future and then drains sees the observer fire.
    change_queue.task_completed(task.task_id(), results.clone());
    promise.resolve(results);
}

/// Execute the batch inside one transaction. Returns whether it committed;
/// on the first failing operation the transaction rolls back and the results
/// list ends with that operation's error.
fn execute_batch(
    storage: &SqliteStorage,
    operations: &[Operation],
    results: &mut Vec<TaskResult>,
    effects: &mut Vec<Effect>,
) -> bool {
    let tx = match storage.transaction() {
        Ok(tx) => tx,
        Err(err) => {
            error!(error = %err, "failed to begin transaction");
            results.push(TaskResult::error(err));
            return false;
        }
    };

    for operation in operations {
        match execute_operation(storage, operation) {
            Ok((result, effect)) => {
                results.push(result);
                effects.extend(effect);
            }
            Err(err) => {
                debug!(error = %err, "operation failed, rolling back batch");
                results.push(TaskResult::error(err));
                effects.clear();
                // Dropping the transaction rolls it back.
                return false;
            }
        }
    }

    match tx.commit() {
        Ok(()) => true,
        Err(err) => {
            error!(error = %err, "commit failed, dropping batch effects");
            for result in results.iter_mut() {
                *result = TaskResult::error(&err);
            }
            effects.clear();
            false
        }
    }
}

fn execute_operation(
    storage: &SqliteStorage,
    operation: &Operation,
) -> Result<(TaskResult, Option<Effect>), OpError> {
    match operation {
        Operation::EraseAllData => {
            storage.delete_all()?;
            Ok((TaskResult::success(Value::Null), Some(Effect::Cleared)))
        }

        Operation::StoreNew(Entity::Hotel(hotel)) => {
            let mut hotel = hotel.clone();
            hotel.validate()?;
            storage.store_new_hotel(&mut hotel)?;
            let payload = serde_json::to_value(&hotel).unwrap_or(Value::Null);
            Ok((
                TaskResult::success(payload),
                Some(Effect::Added(StreamItems::Hotels(vec![hotel]))),
            ))
        }

        Operation::StoreNew(Entity::Reservation(reservation)) => {
            let mut reservation = reservation.clone();
            coerce_status(&mut reservation);
            check_reservation(storage, &reservation, None)?;
            storage.store_new_reservation(&mut reservation)?;
            let payload = serde_json::to_value(&reservation).unwrap_or(Value::Null);
            Ok((
                TaskResult::success(payload),
                Some(Effect::Added(StreamItems::Reservations(vec![reservation]))),
            ))
        }

        Operation::StoreNew(Entity::Person(_)) | Operation::Update(Entity::Person(_)) => {
            // Person is a reserved shape; accepted but not persisted yet.
            debug!("person operation accepted as a no-op");
            Ok((TaskResult::success(Value::Null), None))
        }

        Operation::Update(Entity::Hotel(hotel)) => {
            let mut hotel = hotel.clone();
            hotel.validate()?;
            if !storage.update_hotel(&mut hotel)? {
                return Err(OpError::VersionConflict);
            }
            let payload = serde_json::to_value(&hotel).unwrap_or(Value::Null);
            Ok((
                TaskResult::success(payload),
                Some(Effect::Updated(StreamItems::Hotels(vec![hotel]))),
            ))
        }

        Operation::Update(Entity::Reservation(reservation)) => {
            let mut reservation = reservation.clone();
            coerce_status(&mut reservation);
            check_reservation(storage, &reservation, Some(reservation.id))?;
            if !storage.update_reservation(&mut reservation)? {
                return Err(OpError::VersionConflict);
            }
            let payload = serde_json::to_value(&reservation).unwrap_or(Value::Null);
            Ok((
                TaskResult::success(payload),
                Some(Effect::Updated(StreamItems::Reservations(vec![reservation]))),
            ))
        }

        Operation::Delete(EntityKind::Hotel, id) => {
            storage.delete_hotel(*id)?;
            Ok((
                TaskResult::success(Value::from(*id)),
                Some(Effect::Removed(StreamKind::Hotel, vec![*id])),
            ))
        }

        Operation::Delete(EntityKind::Reservation, id) => {
            storage.delete_reservation(*id)?;
            Ok((
                TaskResult::success(Value::from(*id)),
                Some(Effect::Removed(StreamKind::Reservation, vec![*id])),
            ))
        }

        Operation::Delete(EntityKind::Person, _) => {
            debug!("person operation accepted as a no-op");
            Ok((TaskResult::success(Value::Null), None))
        }
    }
}

/// `Temporary` is a planning-board artifact and `Unknown` is unset; neither
/// is ever persisted.
fn coerce_status(reservation: &mut Reservation) {
    if matches!(reservation.status, ReservationStatus::Unknown | ReservationStatus::Temporary) {
        reservation.status = ReservationStatus::New;
    }
}

/// Domain preconditions checked at execution time: atoms valid and
/// contiguous, rooms exist, no double booking.
fn check_reservation(
    storage: &SqliteStorage,
    reservation: &Reservation,
    exclude_reservation: Option<i64>,
) -> Result<(), OpError> {
    reservation.validate()?;
    for atom in &reservation.atoms {
        if !storage.room_exists(atom.room_id)? {
            return Err(OpError::UnknownRoom(atom.room_id));
        }
        if storage.has_overlap(atom.room_id, atom.from, atom.to, exclude_reservation)? {
            return Err(OpError::DoubleBooked { room: atom.room_id, from: atom.from, to: atom.to });
        }
    }
    Ok(())
}

/// Enqueue each effect as a delta on every open stream of the matching type.
fn publish_effects(change_queue: &ChangeQueue, effects: Vec<Effect>) {
    if effects.is_empty() {
        return;
    }
    let streams = change_queue.streams();
    for effect in effects {
        match effect {
            Effect::Added(items) => {
                let kind = items.kind();
                for stream in streams.iter().filter(|stream| stream.kind() == kind) {
                    change_queue
                        .add_stream_change(stream.stream_id(), StreamDelta::ItemsAdded(items.clone()));
                }
            }
            Effect::Updated(items) => {
                let kind = items.kind();
                for stream in streams.iter().filter(|stream| stream.kind() == kind) {
                    change_queue.add_stream_change(
                        stream.stream_id(),
                        StreamDelta::ItemsUpdated(items.clone()),
                    );
                }
            }
            Effect::Removed(kind, ids) => {
                for stream in streams.iter().filter(|stream| stream.kind() == kind) {
                    change_queue
                        .add_stream_change(stream.stream_id(), StreamDelta::ItemsRemoved(ids.clone()));
                }
            }
            Effect::Cleared => {
                for stream in &streams {
                    change_queue.add_stream_change(stream.stream_id(), StreamDelta::Cleared);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
