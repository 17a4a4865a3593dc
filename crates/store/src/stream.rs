// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data streams: one observer's subscription to a typed, optionally filtered
//! feed of entity changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use lodge_core::{StreamItems, StreamKind};

/// One incremental change delivered to a stream.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    ItemsAdded(StreamItems),
    ItemsUpdated(StreamItems),
    ItemsRemoved(Vec<i64>),
    Cleared,
    Initialized,
}

/// Receives stream deltas. Callbacks are only ever invoked from the thread
/// draining the change queue.
pub trait StreamObserver: Send {
    fn items_added(&mut self, items: &StreamItems);
    fn items_updated(&mut self, items: &StreamItems);
    fn items_removed(&mut self, ids: &[i64]);
    fn cleared(&mut self);
    fn initialized(&mut self);
}

/// Which slice of the stream's entity type an observer receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFilter {
    /// The full dataset of the stream's type.
    All,
    /// Only the entity with the given id (`"<entity>.by_id"` service).
    ById(i64),
}

impl ServiceFilter {
    pub fn parse(kind: StreamKind, service: &str, options: &Value) -> Self {
        if service.is_empty() {
            return ServiceFilter::All;
        }
        if service == kind.by_id_service() {
            match options.get("id").and_then(Value::as_i64) {
                Some(id) => return ServiceFilter::ById(id),
                None => {
                    warn!(service, "stream service is missing an `id` option, serving unfiltered");
                    return ServiceFilter::All;
                }
            }
        }
        warn!(service, "unknown stream service, serving unfiltered");
        ServiceFilter::All
    }
}

/// Producing side of one observer's subscription.
///
/// Backends buffer deltas here from worker threads; `integrate_changes`
/// drains them on the main thread, invoking the observer's callbacks in
/// enqueue order. The stream holds only a weak reference to its observer: it
/// becomes invalid when the owning [`StreamHandle`] drops, and the backend
/// garbage-collects invalid streams on the next fan-out tick.
pub struct DataStream {
    stream_id: u64,
    kind: StreamKind,
    service: String,
    options: Value,
    filter: ServiceFilter,
    initialized: AtomicBool,
    observer: Mutex<Option<Weak<Mutex<dyn StreamObserver>>>>,
    pending: Mutex<Vec<StreamDelta>>,
}

impl DataStream {
    pub fn new(stream_id: u64, kind: StreamKind, service: &str, options: Value) -> Self {
        let filter = ServiceFilter::parse(kind, service, &options);
        Self {
            stream_id,
            kind,
            service: service.to_string(),
            options,
            filter,
            initialized: AtomicBool::new(false),
            observer: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn connect(&self, observer: &Arc<Mutex<dyn StreamObserver>>) {
        let mut slot = self.observer.lock();
        debug_assert!(slot.is_none(), "stream connected twice");
        *slot = Some(Arc::downgrade(observer));
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn filter(&self) -> ServiceFilter {
        self.filter
    }

    /// True while an observer is attached.
    pub fn is_valid(&self) -> bool {
        self.observer.lock().as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    /// True once the initial dataset has been delivered to the observer.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Dissociate the stream from its observer.
    pub fn disconnect(&self) {
        *self.observer.lock() = None;
    }

    /// Buffer a delta, applying the service filter. Called from the thread
    /// that drains the change queue.
    pub fn apply_change(&self, delta: StreamDelta) {
        if let Some(delta) = self.filter_delta(delta) {
            self.pending.lock().push(delta);
        }
    }

    fn filter_delta(&self, delta: StreamDelta) -> Option<StreamDelta> {
        let id = match self.filter {
            ServiceFilter::All => return Some(delta),
            ServiceFilter::ById(id) => id,
        };
        match delta {
            StreamDelta::ItemsAdded(mut items) => {
                items.retain_id(id);
                (!items.is_empty()).then_some(StreamDelta::ItemsAdded(items))
            }
            StreamDelta::ItemsUpdated(mut items) => {
                items.retain_id(id);
                (!items.is_empty()).then_some(StreamDelta::ItemsUpdated(items))
            }
            StreamDelta::ItemsRemoved(ids) => {
                ids.contains(&id).then_some(StreamDelta::ItemsRemoved(vec![id]))
            }
            StreamDelta::Cleared => Some(StreamDelta::Cleared),
            StreamDelta::Initialized => Some(StreamDelta::Initialized),
        }
    }

    /// Drain buffered deltas into the observer, in enqueue order.
    pub fn integrate_changes(&self) {
        let deltas = std::mem::take(&mut *self.pending.lock());
        if deltas.is_empty() {
            return;
        }
        let observer = self.observer.lock().as_ref().and_then(Weak::upgrade);
        let Some(observer) = observer else {
            return;
        };
        let mut observer = observer.lock();
        for delta in deltas {
            match delta {
                StreamDelta::ItemsAdded(items) => observer.items_added(&items),
                StreamDelta::ItemsUpdated(items) => observer.items_updated(&items),
                StreamDelta::ItemsRemoved(ids) => observer.items_removed(&ids),
                StreamDelta::Cleared => observer.cleared(),
                StreamDelta::Initialized => {
                    self.initialized.store(true, Ordering::SeqCst);
                    observer.initialized();
                }
            }
        }
    }
}

type DropHook = Box<dyn FnOnce(&DataStream) + Send>;

/// Owning handle for a stream subscription.
///
/// The stream stays open until the handle is dropped; dropping detaches the
/// observer and notifies the backend.
pub struct StreamHandle {
    stream: Arc<DataStream>,
    _observer: Arc<Mutex<dyn StreamObserver>>,
    on_drop: Option<DropHook>,
}

impl StreamHandle {
    pub fn new(
        stream: Arc<DataStream>,
        observer: Arc<Mutex<dyn StreamObserver>>,
        on_drop: Option<DropHook>,
    ) -> Self {
        Self { stream, _observer: observer, on_drop }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream.stream_id()
    }

    pub fn is_initialized(&self) -> bool {
        self.stream.is_initialized()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stream.disconnect();
        if let Some(on_drop) = self.on_drop.take() {
            on_drop(&self.stream);
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
