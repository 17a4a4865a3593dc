// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network client backend: the `Backend` contract against a remote server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lodge_core::{EntityKind, Operation, StreamItems, StreamKind, TaskResult};
use lodge_fas::{make_promise, Promise};
use lodge_store::{
    Backend, ChangeQueue, DataStream, StreamDelta, StreamHandle, StreamObserver, Task, TaskHandle,
    TaskObserver,
};
use lodge_wire::{decode, read_frame, write_message, ClientMessage, ProtocolError, ServerMessage};

type PendingTasks = Arc<Mutex<HashMap<u64, Promise<Vec<TaskResult>>>>>;

/// A `Backend` whose storage lives behind a TCP connection.
///
/// One I/O thread runs the socket reactor. Stream and task ids are assigned
/// client-side and echoed back by the server; incoming messages feed the same
/// [`ChangeQueue`] the local backend uses. Outgoing messages are buffered
/// while the connection is still establishing and flushed on connect.
///
/// There is no reconnect: a dropped connection is fatal for the session and
/// in-flight tasks never resolve.
pub struct NetClientBackend {
    change_queue: Arc<ChangeQueue>,
    pending_tasks: PendingTasks,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    next_stream_id: AtomicU64,
    next_task_id: AtomicU64,
    shutdown: CancellationToken,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

impl NetClientBackend {
    /// Start the I/O thread and begin connecting to `host:port`.
    ///
    /// Returns immediately; operations and streams issued before the
    /// connection is up are buffered and flushed once it is.
    pub fn connect(host: &str, port: u16) -> Self {
        let change_queue = Arc::new(ChangeQueue::new());
        let pending_tasks: PendingTasks = Arc::new(Mutex::new(HashMap::new()));
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let io_thread = {
            let host = host.to_string();
            let change_queue = Arc::clone(&change_queue);
            let pending_tasks = Arc::clone(&pending_tasks);
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!(error = %err, "failed to build client I/O runtime");
                        return;
                    }
                };
                runtime.block_on(io_main(host, port, outgoing_rx, change_queue, pending_tasks, shutdown));
            })
        };

        Self {
            change_queue,
            pending_tasks,
            outgoing,
            next_stream_id: AtomicU64::new(1),
            next_task_id: AtomicU64::new(1),
            shutdown,
            io_thread: Mutex::new(Some(io_thread)),
        }
    }

    /// Close the connection and join the I/O thread.
    pub fn stop_and_join(&self) {
        self.shutdown.cancel();
        let handle = self.io_thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn send(&self, message: ClientMessage) {
        if self.outgoing.send(message).is_err() {
            error!("client I/O thread is gone, dropping message");
        }
    }
}

impl Drop for NetClientBackend {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl Backend for NetClientBackend {
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
        self.pending_tasks.lock().insert(task_id, promise);
        self.send(ClientMessage::ScheduleOperations { id: task_id, operations });

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
        let stream = Arc::new(DataStream::new(stream_id, kind, service, options.clone()));
        stream.connect(&observer);
        self.change_queue.add_stream(Arc::clone(&stream));

        self.send(ClientMessage::CreateStream {
            id: stream_id,
            stream_type: kind.to_wire(),
            service: service.to_string(),
            options,
        });

        let outgoing = self.outgoing.clone();
        let on_drop = Box::new(move |stream: &DataStream| {
            let _ = outgoing.send(ClientMessage::RemoveStream { id: stream.stream_id() });
        });
        StreamHandle::new(stream, observer, Some(on_drop))
    }
}

async fn io_main(
    host: String,
    port: u16,
    outgoing_rx: mpsc::UnboundedReceiver<ClientMessage>,
    change_queue: Arc<ChangeQueue>,
    pending_tasks: PendingTasks,
    shutdown: CancellationToken,
) {
    let stream = tokio::select! {
        _ = shutdown.cancelled() => return,
        connected = TcpStream::connect((host.as_str(), port)) => match connected {
            Ok(stream) => stream,
            Err(err) => {
                error!(host, port, error = %err, "failed to connect");
                return;
            }
        },
    };
    info!(host, port, "connected");

    let (mut reader, writer) = stream.into_split();

    // Writes and reads run as separate tasks so a half-read frame is never
    // abandoned mid-way.
    let writer_shutdown = shutdown.clone();
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        let mut outgoing_rx = outgoing_rx;
        loop {
            tokio::select! {
                _ = writer_shutdown.cancelled() => return,
                message = outgoing_rx.recv() => {
                    let Some(message) = message else { return };
                    if let Err(err) = write_message(&mut writer, &message).await {
                        error!(error = %err, "failed to submit message, closing connection");
                        return;
                    }
                }
            }
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = read_frame(&mut reader) => match frame {
                Ok(payload) => match decode::<ServerMessage>(&payload) {
                    Ok(message) => process_message(message, &change_queue, &pending_tasks),
                    Err(err) => warn!(error = %err, "ignoring malformed server message"),
                },
                Err(ProtocolError::ConnectionClosed) => {
                    info!("server closed the connection");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "read error, closing connection");
                    break;
                }
            }
        }
    }

    shutdown.cancel();
    let _ = writer_task.await;
}

fn process_message(
    message: ServerMessage,
    change_queue: &ChangeQueue,
    pending_tasks: &PendingTasks,
) {
    match message {
        ServerMessage::StreamInitialize { id } => {
            change_queue.add_stream_change(id, StreamDelta::Initialized);
        }
        ServerMessage::StreamAdd { id, kind, items } => {
            if let Some(items) = decode_items(kind, items) {
                change_queue.add_stream_change(id, StreamDelta::ItemsAdded(items));
            }
        }
        ServerMessage::StreamUpdate { id, kind, items } => {
            if let Some(items) = decode_items(kind, items) {
                change_queue.add_stream_change(id, StreamDelta::ItemsUpdated(items));
            }
        }
        ServerMessage::StreamRemove { id, items } => {
            change_queue.add_stream_change(id, StreamDelta::ItemsRemoved(items));
        }
        ServerMessage::StreamClear { id } => {
            change_queue.add_stream_change(id, StreamDelta::Cleared);
        }
        ServerMessage::TaskResults { id, results } => {
            let results: Vec<TaskResult> =
                results.into_iter().map(lodge_wire::WireTaskResult::into_task_result).collect();
            change_queue.task_completed(id, results.clone());
            if let Some(promise) = pending_tasks.lock().remove(&id) {
                promise.resolve(results);
            } else {
                debug!(task_id = id, "results for an unknown task, ignoring");
            }
        }
    }
}

fn decode_items(kind: EntityKind, items: Vec<Value>) -> Option<StreamItems> {
    let kind = match kind {
        EntityKind::Hotel => StreamKind::Hotel,
        EntityKind::Reservation => StreamKind::Reservation,
        EntityKind::Person => {
            warn!("person items cannot flow through streams, ignoring");
            return None;
        }
    };
    match StreamItems::from_values(kind, items) {
        Ok(items) => Some(items),
        Err(err) => {
            warn!(error = %err, "ignoring malformed stream items");
            None
        }
    }
}
