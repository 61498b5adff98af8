//! # Abort Handler
//!
//! Lets the user cancel the latest abortable request by pressing Escape.
//! Requests opt out with the `abort: false` option or a
//! `data-naja-abort="off"` attribute.

use naja_core::{
    AbortHandle, Complete, Event, EventTarget, Extension, Init, Interaction, Modifiers, Naja,
    NativeEvent, NativeEventKind, NativeListener, RequestId, Start, options::ABORT,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Aborts the current request on Escape.
#[derive(Default)]
pub struct AbortHandler {
    current: Mutex<Option<(RequestId, AbortHandle)>>,
}

impl AbortHandler {
    /// Create the handler.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<(RequestId, AbortHandle)>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an abortable request is in flight.
    pub fn is_abortable(&self) -> bool {
        self.lock().is_some()
    }

    /// Abort the current request. Returns `false` if there was none.
    pub fn abort(&self) -> bool {
        let Some((id, handle)) = self.lock().take() else {
            return false;
        };
        debug!(request_id = %id, "aborting request");
        handle.abort();
        true
    }

    /// Native `keydown` listener body.
    pub fn handle_key(&self, key: &str, modifiers: Modifiers) {
        if key == "Escape" && !modifiers.any() {
            self.abort();
        }
    }
}

impl Extension for AbortHandler {
    fn name(&self) -> &'static str {
        "abort"
    }

    fn on_init(&self, naja: &Naja, _event: &mut Event<Init>) {
        let weak = naja.downgrade();
        let listener = NativeListener::new(move |event| {
            let NativeEvent::KeyDown { key, modifiers } = event else {
                return;
            };
            if let Some(handler) = weak.upgrade().and_then(|naja| naja.extension::<AbortHandler>()) {
                handler.handle_key(key, *modifiers);
            }
        });
        naja.dom()
            .add_event_listener(EventTarget::Window, NativeEventKind::KeyDown, &listener);
    }

    fn on_interaction(&self, _naja: &Naja, event: &mut Event<Interaction>) {
        if let Some(abort) = event.detail.directives.abort {
            event.detail.options.set_default(ABORT, abort);
        }
    }

    fn on_start(&self, _naja: &Naja, event: &mut Event<Start>) {
        if event.detail.request.options.abort() {
            *self.lock() = Some((event.detail.request.id, event.detail.abort.clone()));
        }
    }

    fn on_complete(&self, _naja: &Naja, event: &mut Event<Complete>) {
        let mut current = self.lock();
        if current
            .as_ref()
            .is_some_and(|(id, _)| *id == event.detail.request.id)
        {
            *current = None;
        }
    }
}
