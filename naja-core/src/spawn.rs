//! Fire-and-forget scheduling.

use futures::future::BoxFuture;

/// Schedules detached futures on the host event loop.
///
/// Interactions triggered by native events are not awaited by anyone; their
/// request futures are handed to the spawner.
pub trait Spawn: Send + Sync + 'static {
    /// Run `future` to completion in the background.
    fn spawn(&self, future: BoxFuture<'static, ()>);
}
