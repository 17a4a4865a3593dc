// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The common backend contract shared by the local SQLite store and the
//! network client.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use lodge_core::{Operation, StreamKind, Streamable};

use crate::change_queue::ChangeQueue;
use crate::stream::{StreamHandle, StreamObserver};
use crate::task::{TaskHandle, TaskObserver};

/// Opaque provider of storage, change streams, and tasks.
///
/// `queue_operations` always returns a handle whose future eventually
/// resolves to one [`TaskResult`](lodge_core::TaskResult) per operation,
/// unless the batch aborted mid-way, in which case the list is truncated at
/// the first error. No failure mode crosses this boundary as a panic.
pub trait Backend: Send + Sync {
    /// The queue all of this backend's changes are pushed to.
    fn change_queue(&self) -> &ChangeQueue;

    /// Queue an ordered batch of operations to execute as one transaction.
    ///
    /// The handle can be dropped immediately if no observer is attached;
    /// otherwise keep it alive for as long as notifications are wanted.
    fn queue_operations(
        &self,
        operations: Vec<Operation>,
        observer: Option<Arc<Mutex<dyn TaskObserver>>>,
    ) -> TaskHandle;

    /// Create a stream connecting the observer to a service endpoint.
    ///
    /// The stream is open until the returned handle is dropped.
    fn create_stream(
        &self,
        observer: Arc<Mutex<dyn StreamObserver>>,
        kind: StreamKind,
        service: &str,
        options: Value,
    ) -> StreamHandle;
}

/// Convenience helpers over [`Backend`], usable through `dyn Backend`.
pub trait BackendExt: Backend {
    /// Queue a single operation as a one-element batch.
    fn queue_operation(
        &self,
        operation: Operation,
        observer: Option<Arc<Mutex<dyn TaskObserver>>>,
    ) -> TaskHandle {
        self.queue_operations(vec![operation], observer)
    }

    /// Create an unfiltered stream for the entity type `T`.
    fn create_stream_typed<T: Streamable>(
        &self,
        observer: Arc<Mutex<dyn StreamObserver>>,
    ) -> StreamHandle {
        self.create_stream(observer, T::KIND, "", Value::Null)
    }
}

impl<B: Backend + ?Sized> BackendExt for B {}
