//! # naja-core
//!
//! Core primitives and contracts of the Naja AJAX layer.
//!
//! Naja intercepts link clicks and form submissions on a server-rendered page,
//! turns them into asynchronous requests and patches the returned snippets
//! into the live document. This crate holds everything the built-in and
//! third-party extensions are written against.
//!
//! # Building Blocks
//!
//! - [`EventBus`] - typed, cancelable publish/subscribe owned by every component
//! - [`Naja`] - the context object and request dispatcher
//! - [`Extension`] - lifecycle hooks (`init`, `interaction`, `before`, `start`,
//!   `success`, `error`, `complete`, `load`)
//! - [`Options`] / [`Directives`] - per-request configuration from code and
//!   from `data-naja-*` attributes
//! - [`Payload`] - the response body contract
//!
//! # Collaborators
//!
//! The page itself is reached through [`Dom`] and [`HistoryApi`], the network
//! through [`Transport`], and the event loop through [`Spawn`]. Naja never
//! assumes a concrete browser binding.
//!
//! # Failure Policy
//!
//! Requests started by native events are detached; their failures are only
//! observable through the `error` and `complete` events.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod bus;
mod directives;
mod dom;
mod error;
mod events;
mod extension;
mod history;
pub mod location;
mod naja;
pub mod options;
mod payload;
mod request;
mod spawn;
mod transport;

// Re-exports
pub use bus::{Event, EventBus, EventDetail, ListenerId, ListenerOptions};
pub use directives::{Directives, SnippetOperation};
pub use dom::{
    Dom, ElementId, EventTarget, InsertPosition, Modifiers, NativeEvent, NativeEventKind,
    NativeListener, Script,
};
pub use error::{BoxError, NajaError};
pub use events::{Before, Complete, Failure, Init, Interaction, Load, Start, Success};
pub use extension::{Extension, LifecycleEvent};
pub use history::{HistoryApi, HistoryEntry};
pub use naja::{Environment, Naja, NajaBuilder, REQUESTED_WITH, WeakNaja};
pub use options::{HistoryMode, Options};
pub use payload::{Payload, SnippetContent};
pub use request::{FormData, HttpResponse, Request, RequestId};
pub use spawn::Spawn;
pub use transport::{DynTransport, Transport};

pub use futures::future::AbortHandle;
