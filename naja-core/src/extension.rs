//! # Extension Contract
//!
//! Extensions are registered once, in order, when [`Naja`] is built. For every
//! lifecycle event the dispatcher calls the matching hook on each extension
//! in registration order, then the listeners subscribed on the bus. A hook
//! that calls [`Event::stop_immediate_propagation`] hides the event from all
//! later extensions and listeners.
//!
//! Every hook receives the [`Naja`] context. Extensions that need it outside
//! a hook (e.g. from a native listener) should keep a [`WeakNaja`] to avoid a
//! reference cycle.
//!
//! [`WeakNaja`]: crate::WeakNaja

use crate::{
    bus::{Event, EventDetail},
    events::{Before, Complete, Failure, Init, Interaction, Load, Start, Success},
    naja::Naja,
};

/// A pluggable participant in the request lifecycle.
///
/// All hooks default to no-ops; implement only the ones you need.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a Naja extension",
    label = "missing `Extension` implementation",
    note = "Implement `Extension` and override the lifecycle hooks you need."
)]
#[allow(unused_variables)]
pub trait Extension: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// `init`: subscribe to native events, capture initial state.
    fn on_init(&self, naja: &Naja, event: &mut Event<Init>) {}

    /// `load`: Naja became idle.
    fn on_load(&self, naja: &Naja, event: &mut Event<Load>) {}

    /// `interaction`: read directives into options or veto the interaction.
    fn on_interaction(&self, naja: &Naja, event: &mut Event<Interaction>) {}

    /// `before`: amend or veto the request.
    fn on_before(&self, naja: &Naja, event: &mut Event<Before>) {}

    /// `start`: the request is in flight.
    fn on_start(&self, naja: &Naja, event: &mut Event<Start>) {}

    /// `success`: apply the payload.
    fn on_success(&self, naja: &Naja, event: &mut Event<Success>) {}

    /// `error`: the request failed.
    fn on_error(&self, naja: &Naja, event: &mut Event<Failure>) {}

    /// `complete`: release per-request state.
    fn on_complete(&self, naja: &Naja, event: &mut Event<Complete>) {}
}

/// An event that extensions observe through a dedicated hook.
pub trait LifecycleEvent: EventDetail + Sized {
    /// Call the hook of `extension` matching this event.
    fn notify(extension: &dyn Extension, naja: &Naja, event: &mut Event<Self>);
}

macro_rules! lifecycle_events {
    ($($detail:ty => $hook:ident),* $(,)?) => {
        $(
            impl LifecycleEvent for $detail {
                fn notify(extension: &dyn Extension, naja: &Naja, event: &mut Event<Self>) {
                    extension.$hook(naja, event)
                }
            }
        )*
    };
}

lifecycle_events! {
    Init => on_init,
    Load => on_load,
    Interaction => on_interaction,
    Before => on_before,
    Start => on_start,
    Success => on_success,
    Failure => on_error,
    Complete => on_complete,
}
