//! Testing utilities for Naja.
//!
//! Everything needed to drive a [`Naja`] instance without a browser.
//!
//! # Features
//!
//! - [`MemoryDom`]: an in-memory document and session history that simulates
//!   clicks, submissions, key presses and back/forward navigation
//! - [`MockTransport`]: scripted responses per URL, with held replies for
//!   in-flight scenarios
//! - [`ManualSpawner`]: collects detached requests until the test drives them
//! - [`EventLog`]: records the order in which events fire

mod dom;
mod html;
mod selector;
mod transport;

pub use dom::MemoryDom;
pub use transport::{Gate, MockTransport, RecordedRequest};

use futures::future::{BoxFuture, join_all};
use naja_core::{
    Before, Complete, Event, EventDetail, Failure, Init, Interaction, Load, Naja, Spawn, Start,
    Success,
};
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// Manual Spawner
// ============================================================================

/// A [`Spawn`] implementation that only queues futures.
///
/// Detached requests make no progress until [`run_until_idle`] is awaited,
/// which keeps the order of effects deterministic.
///
/// [`run_until_idle`]: ManualSpawner::run_until_idle
#[derive(Default)]
pub struct ManualSpawner {
    queue: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl ManualSpawner {
    /// Create an empty spawner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued futures.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Run queued futures, including the ones they spawn, until none is left.
    ///
    /// Deadlocks if a queued future waits for something the caller has not
    /// provided yet, such as an unreleased [`Gate`].
    pub async fn run_until_idle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                break;
            }
            join_all(batch).await;
        }
    }
}

impl Spawn for ManualSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(future);
    }
}

// ============================================================================
// Event Log
// ============================================================================

/// Records event types in the order they fire.
///
/// # Example
///
/// ```rust,ignore
/// let log = EventLog::new();
/// log.attach(&naja);
/// naja.make_request("GET", "/", None, Options::new()).await?;
/// assert_eq!(log.events(), ["before", "start", "success", "complete", "load"]);
/// ```
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<&'static str>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every lifecycle event of `naja`.
    pub fn attach(&self, naja: &Naja) {
        naja.on::<Init, _>(self.record());
        naja.on::<Load, _>(self.record());
        naja.on::<Interaction, _>(self.record());
        naja.on::<Before, _>(self.record());
        naja.on::<Start, _>(self.record());
        naja.on::<Success, _>(self.record());
        naja.on::<Failure, _>(self.record());
        naja.on::<Complete, _>(self.record());
    }

    /// A listener recording events of type `D`, for any bus.
    pub fn record<D: EventDetail>(&self) -> impl Fn(&mut Event<D>) + Send + Sync + 'static {
        let events = self.events.clone();
        move |event: &mut Event<D>| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.event_type());
        }
    }

    /// Recorded event types.
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// How many times `event_type` fired.
    pub fn count(&self, event_type: &str) -> usize {
        self.events()
            .into_iter()
            .filter(|recorded| *recorded == event_type)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_manual_spawner_runs_nested_spawns() {
        let spawner = Arc::new(ManualSpawner::new());
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let inner_spawner = spawner.clone();
            let runs = runs.clone();
            spawner.spawn(Box::pin(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                let runs = runs.clone();
                inner_spawner.spawn(Box::pin(async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                }));
            }));
        }
        assert_eq!(spawner.pending(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        spawner.run_until_idle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(spawner.pending(), 0);
    }
}
