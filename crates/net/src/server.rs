// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP server hosting a real backend for remote clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lodge_store::Backend;

use crate::session;

/// Accepts client connections and spawns one [`session`] per socket.
///
/// All sessions share the one real backend. A dedicated drain task,
/// subscribed to the backend's change-queue signal, applies stream changes
/// and task completions on the server loop. It is the only place observer
/// callbacks run, which keeps the main-thread-only callback rule intact
/// across the network boundary.
pub struct NetServer {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl NetServer {
    /// Bind `addr` and start serving `backend` on a dedicated thread.
    pub fn start(backend: Arc<dyn Backend>, addr: SocketAddr) -> std::io::Result<Self> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let thread = {
            let shutdown = shutdown.clone();
            std::thread::spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!(error = %err, "failed to build server runtime");
                        return;
                    }
                };
                runtime.block_on(serve(listener, backend, shutdown));
            })
        };

        info!(%local_addr, "server listening");
        Ok(Self { local_addr, shutdown, thread: Mutex::new(Some(thread)) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close the server loop, and join its thread. Existing
    /// sessions are dropped with the runtime.
    pub fn stop_and_join(&self) {
        self.shutdown.cancel();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for NetServer {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

async fn serve(
    listener: std::net::TcpListener,
    backend: Arc<dyn Backend>,
    shutdown: CancellationToken,
) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "failed to register listener");
            return;
        }
    };

    // Backend workers signal the change queue from their own threads; the
    // drain task re-posts the actual draining onto the server loop.
    let (drain_tx, mut drain_rx) = mpsc::unbounded_channel();
    backend.change_queue().set_changes_available_handler(move || {
        let _ = drain_tx.send(());
    });
    let drain_backend = Arc::clone(&backend);
    let drain_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = drain_shutdown.cancelled() => return,
                received = drain_rx.recv() => match received {
                    Some(()) => drain_backend.change_queue().apply_all_changes(),
                    None => return,
                },
            }
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => {
                    info!(%addr, "client connected");
                    tokio::spawn(session::run(socket, Arc::clone(&backend)));
                }
                Err(err) => error!(error = %err, "accept error"),
            },
        }
    }
}
