//! Tokio-backed scheduling.

use futures::future::BoxFuture;
use naja_core::Spawn;

/// Spawns detached requests onto the ambient Tokio runtime.
///
/// # Panics
///
/// Spawning panics outside a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

impl Spawn for TokioSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        tokio::spawn(future);
    }
}
