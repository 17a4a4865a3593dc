// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One server session per accepted client socket.
//!
//! The session translates wire messages into calls on the real backend and
//! forwards every stream delta and task completion back down the socket,
//! tagged with the client-supplied id. Session lifetime is socket lifetime:
//! on disconnect every stream and task the session owns is dropped.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use lodge_core::{StreamItems, StreamKind, TaskResult};
use lodge_store::{Backend, StreamHandle, StreamObserver, TaskHandle, TaskObserver};
use lodge_wire::{
    decode, read_frame, write_message, ClientMessage, ProtocolError, ServerMessage, WireTaskResult,
};

pub(crate) async fn run(socket: TcpStream, backend: Arc<dyn Backend>) {
    let peer = socket.peer_addr().map(|addr| addr.to_string()).unwrap_or_default();
    let (mut reader, writer) = socket.into_split();
    let (sender, receiver) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, receiver));

    let mut session = Session { backend, sender, streams: Vec::new(), tasks: Vec::new() };
    loop {
        match read_frame(&mut reader).await {
            Ok(payload) => match decode::<ClientMessage>(&payload) {
                Ok(message) => session.handle(message),
                Err(err) => warn!(peer, error = %err, "ignoring malformed client message"),
            },
            Err(ProtocolError::ConnectionClosed) => {
                info!(peer, "client disconnected");
                break;
            }
            Err(err) => {
                error!(peer, error = %err, "session read error");
                break;
            }
        }
    }

    // Dropping the session detaches its streams and tasks from the backend
    // and closes the last sender, letting the writer drain and exit.
    drop(session);
    let _ = writer_task.await;
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut receiver: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = receiver.recv().await {
        if let Err(err) = write_message(&mut writer, &message).await {
            error!(error = %err, "failed to send message to client");
            return;
        }
    }
}

struct Session {
    backend: Arc<dyn Backend>,
    sender: mpsc::UnboundedSender<ServerMessage>,
    /// client stream id → handle on the real backend
    streams: Vec<(u64, StreamHandle)>,
    tasks: Vec<TaskHandle>,
}

impl Session {
    fn handle(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CreateStream { id, stream_type, service, options } => {
                let Some(kind) = StreamKind::from_wire(stream_type) else {
                    warn!(stream_type, "unknown stream type, ignoring create_stream");
                    return;
                };
                let observer: Arc<Mutex<dyn StreamObserver>> = Arc::new(Mutex::new(
                    SessionStreamObserver { sender: self.sender.clone(), client_id: id, kind },
                ));
                let handle = self.backend.create_stream(observer, kind, &service, options);
                debug!(server_id = handle.stream_id(), client_id = id, "stream created");
                self.streams.push((id, handle));
            }

            ClientMessage::RemoveStream { id } => {
                match self.streams.iter().position(|(client_id, _)| *client_id == id) {
                    Some(index) => {
                        let (_, handle) = self.streams.remove(index);
                        debug!(server_id = handle.stream_id(), client_id = id, "stream removed");
                    }
                    None => debug!(client_id = id, "remove_stream for an unknown stream"),
                }
            }

            ClientMessage::ScheduleOperations { id, operations } => {
                debug!(client_id = id, operations = operations.len(), "scheduling operations");
                let observer: Arc<Mutex<dyn TaskObserver>> = Arc::new(Mutex::new(
                    SessionTaskObserver { sender: self.sender.clone(), client_id: id },
                ));
                let handle = self.backend.queue_operations(operations, Some(observer));
                self.tasks.retain(|task| !task.is_completed());
                self.tasks.push(handle);
            }
        }
    }
}

/// Forwards every delta of one backend stream to the client, tagged with the
/// client-supplied stream id.
struct SessionStreamObserver {
    sender: mpsc::UnboundedSender<ServerMessage>,
    client_id: u64,
    kind: StreamKind,
}

impl SessionStreamObserver {
    fn send(&self, message: ServerMessage) {
        // A send failure just means the socket is gone; the session cleanup
        // drops this observer shortly after.
        let _ = self.sender.send(message);
    }

    fn item_values(&self, items: &StreamItems) -> Vec<serde_json::Value> {
        items.to_values().unwrap_or_default()
    }
}

impl StreamObserver for SessionStreamObserver {
    fn items_added(&mut self, items: &StreamItems) {
        self.send(ServerMessage::StreamAdd {
            id: self.client_id,
            kind: self.kind.entity_kind(),
            items: self.item_values(items),
        });
    }

    fn items_updated(&mut self, items: &StreamItems) {
        self.send(ServerMessage::StreamUpdate {
            id: self.client_id,
            kind: self.kind.entity_kind(),
            items: self.item_values(items),
        });
    }

    fn items_removed(&mut self, ids: &[i64]) {
        self.send(ServerMessage::StreamRemove { id: self.client_id, items: ids.to_vec() });
    }

    fn cleared(&mut self) {
        self.send(ServerMessage::StreamClear { id: self.client_id });
    }

    fn initialized(&mut self) {
        self.send(ServerMessage::StreamInitialize { id: self.client_id });
    }
}

/// Sends a task's results to the client once the backend resolves it.
struct SessionTaskObserver {
    sender: mpsc::UnboundedSender<ServerMessage>,
    client_id: u64,
}

impl TaskObserver for SessionTaskObserver {
    fn results_available(&mut self, results: &[TaskResult]) {
        let _ = self.sender.send(ServerMessage::TaskResults {
            id: self.client_id,
            results: results.iter().map(WireTaskResult::from).collect(),
        });
    }
}
