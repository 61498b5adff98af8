//! Error types for Naja.
//!
//! All request failures are delivered to subscribers through the `error` and
//! `complete` events. The same [`NajaError`] value is also returned from
//! [`Naja::make_request`](crate::Naja::make_request), which is why it is
//! `Clone`.

use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// A boxed error type for collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while composing, dispatching or completing a request.
#[derive(Error, Debug, Clone)]
pub enum NajaError {
    /// The target URL's origin is not in the allow-list.
    #[error("cannot dispatch async request, URL is not allowed: {0}")]
    UrlNotAllowed(String),

    /// The target URL could not be resolved against the current location.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A programmatic interaction was started on an element that cannot
    /// produce a request.
    #[error("unsupported element: {0}")]
    UnsupportedElement(&'static str),

    /// The request was aborted, either by the user or by a unique request.
    #[error("request was aborted")]
    Aborted,

    /// The transport did not settle within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} received from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// URL of the failed response.
        url: String,
    },

    /// The response body is not a valid payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The transport failed before producing a response.
    #[error("transport failure: {0}")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// [`Naja::initialize`](crate::Naja::initialize) was called twice.
    #[error("cannot initialize Naja, it is already initialized")]
    AlreadyInitialized,
}

impl NajaError {
    /// Whether this error represents an explicit cancellation.
    pub fn is_abort(&self) -> bool {
        matches!(self, NajaError::Aborted)
    }

    /// Whether a retry may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NajaError::Transport(_) | NajaError::Timeout(_))
    }
}

impl From<BoxError> for NajaError {
    fn from(err: BoxError) -> Self {
        NajaError::Transport(Arc::from(err))
    }
}

impl From<serde_json::Error> for NajaError {
    fn from(err: serde_json::Error) -> Self {
        NajaError::InvalidPayload(err.to_string())
    }
}
