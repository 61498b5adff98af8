//! # Unique Handler
//!
//! At most one request per unique key is in flight: starting a request
//! aborts the previous one under the same key. Requests without an explicit
//! key share a default one; `unique: false` opts out.

use naja_core::{
    AbortHandle, Complete, Event, Extension, Interaction, Naja, RequestId, Start,
    options::{DEFAULT_UNIQUE_KEY, UNIQUE},
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

/// Aborts superseded requests.
#[derive(Default)]
pub struct UniqueHandler {
    requests: Mutex<HashMap<String, (RequestId, AbortHandle)>>,
}

impl UniqueHandler {
    /// Create the handler.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (RequestId, AbortHandle)>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request under `key` is in flight.
    pub fn in_flight(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

impl Extension for UniqueHandler {
    fn name(&self) -> &'static str {
        "unique"
    }

    fn on_interaction(&self, _naja: &Naja, event: &mut Event<Interaction>) {
        let Some(unique) = event.detail.directives.unique.clone() else {
            return;
        };
        let value = match unique {
            None => Value::Bool(false),
            Some(key) if key == DEFAULT_UNIQUE_KEY => Value::Bool(true),
            Some(key) => Value::String(key),
        };
        event.detail.options.set_default(UNIQUE, value);
    }

    fn on_start(&self, _naja: &Naja, event: &mut Event<Start>) {
        let request = &event.detail.request;
        let Some(key) = request.options.unique() else {
            return;
        };
        let previous = self
            .lock()
            .insert(key.clone(), (request.id, event.detail.abort.clone()));
        if let Some((previous, handle)) = previous {
            debug!(%key, request_id = %previous, superseded_by = %request.id, "aborting superseded request");
            handle.abort();
        }
    }

    fn on_complete(&self, _naja: &Naja, event: &mut Event<Complete>) {
        let request = &event.detail.request;
        let Some(key) = request.options.unique() else {
            return;
        };
        let mut requests = self.lock();
        if requests.get(&key).is_some_and(|(id, _)| *id == request.id) {
            requests.remove(&key);
        }
    }
}
