// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use parking_lot::Mutex;

use lodge_core::{StreamItems, Streamable};

use crate::stream::StreamObserver;

/// Simple typed observer that folds all deltas into an owned vector.
///
/// The workhorse of the test suite and of simple consumers: after draining
/// the change queue, [`items`](VecObserver::items) reflects the stream state.
#[derive(Default)]
pub struct VecObserver<T> {
    items: Vec<T>,
    initialized: bool,
}

impl<T: Streamable + Clone + Send> VecObserver<T> {
    pub fn new() -> Self {
        Self { items: Vec::new(), initialized: false }
    }

    /// A new observer behind the `Arc<Mutex<_>>` that backends expect.
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl<T: Streamable + Clone + Send> StreamObserver for VecObserver<T> {
    fn items_added(&mut self, items: &StreamItems) {
        if let Some(added) = T::from_items(items) {
            self.items.extend_from_slice(added);
        }
    }

    fn items_updated(&mut self, items: &StreamItems) {
        let Some(updated) = T::from_items(items) else {
            return;
        };
        for updated_item in updated {
            let id = updated_item.entity_id();
            if let Some(existing) = self.items.iter_mut().find(|item| item.entity_id() == id) {
                *existing = updated_item.clone();
            }
        }
    }

    fn items_removed(&mut self, ids: &[i64]) {
        self.items.retain(|item| !ids.contains(&item.entity_id()));
    }

    fn cleared(&mut self) {
        self.items.clear();
    }

    fn initialized(&mut self) {
        self.initialized = true;
    }
}
