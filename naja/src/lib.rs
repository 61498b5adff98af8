//! # naja - AJAX Navigation for Server-Rendered Pages
//!
//! `naja` intercepts link clicks and form submissions, sends them as
//! asynchronous requests and applies the JSON payload the server answers
//! with: snippet updates, redirects and history entries. Pages keep working
//! without it; Naja only makes them faster.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use naja::prelude::*;
//! use std::sync::Arc;
//!
//! let env = Environment {
//!     dom: page.clone(),
//!     history: page.clone(),
//!     transport: Arc::new(HttpTransport::new()),
//!     spawner: Arc::new(TokioSpawner),
//! };
//! let config = NajaConfig::from_json(r#"{"allowedOrigins": ["https://cdn.example.com"]}"#)?;
//! let naja = naja::new(env, &config);
//! naja.initialize()?;
//!
//! // Programmatic request, same lifecycle as a click.
//! let payload = naja.make_request("GET", "/list?page=2", None, Options::new()).await?;
//! ```
//!
//! ## Extensions
//!
//! [`new`] registers the built-in extensions in their canonical order. Use
//! [`builder`] to append your own; their hooks run after the built-ins.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod config;

pub use config::{ConfigError, NajaConfig};

pub use naja_core::{
    // Abort
    AbortHandle,
    // Lifecycle events
    Before,
    // Errors
    BoxError,
    Complete,
    // Configuration
    Directives,
    // Collaborators
    Dom,
    DynTransport,
    ElementId,
    Environment,
    // Event bus
    Event,
    EventBus,
    EventDetail,
    EventTarget,
    // Extension
    Extension,
    Failure,
    // Requests
    FormData,
    HistoryApi,
    HistoryEntry,
    HistoryMode,
    HttpResponse,
    Init,
    InsertPosition,
    Interaction,
    LifecycleEvent,
    ListenerId,
    ListenerOptions,
    Load,
    Modifiers,
    // Dispatcher
    Naja,
    NajaBuilder,
    NajaError,
    NativeEvent,
    NativeEventKind,
    NativeListener,
    Options,
    Payload,
    REQUESTED_WITH,
    Request,
    RequestId,
    Script,
    SnippetContent,
    SnippetOperation,
    Spawn,
    Start,
    Success,
    Transport,
    WeakNaja,
    location,
    options,
};

pub use naja_std::{
    AbortHandler, AfterUpdate, BeforeUpdate, BuildState, FormValidator, FormsHandler,
    HistoryHandler, HistoryPhase, Redirect, RedirectHandler, RequestFuture, RestoreState,
    ScriptLoader, SnippetHandler, TokioSpawner, UiHandler, UniqueHandler,
};

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use naja_std::testing::*;
}

/// A builder with the built-in extensions registered in canonical order.
///
/// The order is significant on `success`: redirects stop the event before
/// snippets are applied, and history snapshots are taken after them.
pub fn builder(env: Environment, config: &NajaConfig) -> NajaBuilder {
    Naja::builder(env)
        .default_options(config.default_options.clone())
        .extension(
            UiHandler::new()
                .with_selector(config.selector.clone())
                .with_allowed_origins(config.allowed_origins.iter().cloned())
                .with_event_delegation(config.event_delegation),
        )
        .extension(FormsHandler::new())
        .extension(AbortHandler::new())
        .extension(UniqueHandler::new())
        .extension(RedirectHandler::new())
        .extension(SnippetHandler::new().with_prefix(config.snippet_prefix.clone()))
        .extension(ScriptLoader::new())
        .extension(HistoryHandler::new().with_ui_cache(config.history_ui_cache))
}

/// A Naja instance with the built-in extensions. Call
/// [`Naja::initialize`] once the page is ready.
pub fn new(env: Environment, config: &NajaConfig) -> Naja {
    tracing::debug!(
        selector = %config.selector,
        event_delegation = config.event_delegation,
        "building naja with default extensions"
    );
    builder(env, config).build()
}

/// Prelude module - common imports for Naja.
///
/// # Usage
///
/// ```rust,ignore
/// use naja::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Collaborators
        Dom,
        Environment,
        // Events
        Event,
        EventDetail,
        // Extensions
        Extension,
        HistoryApi,
        // Dispatcher
        Naja,
        NajaConfig,
        NajaError,
        Options,
        Payload,
        Spawn,
        TokioSpawner,
        Transport,
    };
}
