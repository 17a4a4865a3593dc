// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lodge-store: the authoritative store and its change-stream machinery.
//!
//! A [`Backend`] executes ordered batches of [`Operation`]s
//! (transactionally, on a worker thread) and publishes the row-level effects
//! as per-stream deltas. Deltas travel through the [`ChangeQueue`] so that
//! observer callbacks only ever run on the thread that drains it: the
//! application main thread, or a server's drain loop.
//!
//! [`SqliteBackend`] is the local implementation; the network client in
//! `lodge-net` implements the same contract against a remote server, and the
//! two are indistinguishable from an observer's point of view.
//!
//! [`Operation`]: lodge_core::Operation

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backend;
mod change_queue;
mod error;
mod observer;
mod sqlite;
mod stream;
mod task;

pub use backend::{Backend, BackendExt};
pub use change_queue::ChangeQueue;
pub use error::StoreError;
pub use observer::VecObserver;
pub use sqlite::SqliteBackend;
pub use stream::{DataStream, ServiceFilter, StreamDelta, StreamHandle, StreamObserver};
pub use task::{Task, TaskHandle, TaskObserver};
