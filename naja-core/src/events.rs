//! Lifecycle event details.
//!
//! One request produces, in order: `before`, `start`, `success` or `error`,
//! `complete` and finally `load`. Requests triggered by the user are preceded
//! by `interaction`. `init` fires once when Naja is initialized.

use crate::{
    bus::EventDetail,
    directives::Directives,
    dom::{ElementId, NativeEventKind},
    error::NajaError,
    options::Options,
    payload::Payload,
    request::{FormData, HttpResponse, Request},
};
use futures::future::AbortHandle;
use std::sync::Arc;

/// `init`: Naja is being initialized. Listeners may amend the defaults.
#[derive(Debug)]
pub struct Init {
    /// Options every request starts from.
    pub default_options: Options,
}

impl EventDetail for Init {
    const TYPE: &'static str = "init";
}

/// `load`: Naja is idle; freshly inserted content may need binding.
#[derive(Debug, Default)]
pub struct Load;

impl EventDetail for Load {
    const TYPE: &'static str = "load";
}

/// `interaction`: the user clicked a link or submitted a form.
///
/// Canceling it suppresses both the request and the browser's default action.
#[derive(Debug)]
pub struct Interaction {
    /// Element that triggered the request (link, form or submitter).
    pub element: ElementId,
    /// Native event kind, `None` for programmatic interactions.
    pub trigger: Option<NativeEventKind>,
    /// Method the request will use.
    pub method: String,
    /// URL the request will target.
    pub url: String,
    /// Attribute directives of `element`.
    pub directives: Directives,
    /// Options passed by the caller, still mutable.
    ///
    /// Configured defaults are not merged in yet; they are laid underneath
    /// when the request is made, so a key present here beats both the
    /// defaults and any attribute directive applied with
    /// [`Options::set_default`].
    pub options: Options,
}

impl EventDetail for Interaction {
    const TYPE: &'static str = "interaction";
    const CANCELABLE: bool = true;
}

/// `before`: the request is about to be sent. Everything is still mutable.
#[derive(Debug)]
pub struct Before {
    /// HTTP method.
    pub method: String,
    /// Target URL, possibly relative.
    pub url: String,
    /// Form fields.
    pub data: Option<FormData>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Options of the request.
    pub options: Options,
}

impl EventDetail for Before {
    const TYPE: &'static str = "before";
    const CANCELABLE: bool = true;
}

/// `start`: the request is in flight.
#[derive(Debug)]
pub struct Start {
    /// The frozen request.
    pub request: Arc<Request>,
    /// Aborting it makes the request fail with [`NajaError::Aborted`].
    pub abort: AbortHandle,
}

impl EventDetail for Start {
    const TYPE: &'static str = "start";
}

/// `success`: a 2xx response with a valid payload arrived.
#[derive(Debug)]
pub struct Success {
    /// The request.
    pub request: Arc<Request>,
    /// Raw response.
    pub response: HttpResponse,
    /// Parsed payload.
    pub payload: Payload,
}

impl EventDetail for Success {
    const TYPE: &'static str = "success";
}

/// `error`: the request failed or was aborted.
#[derive(Debug)]
pub struct Failure {
    /// The request.
    pub request: Arc<Request>,
    /// What went wrong.
    pub error: NajaError,
    /// Raw response, when the server answered.
    pub response: Option<HttpResponse>,
}

impl EventDetail for Failure {
    const TYPE: &'static str = "error";
}

/// `complete`: fires exactly once per request, whatever the outcome.
#[derive(Debug)]
pub struct Complete {
    /// The request.
    pub request: Arc<Request>,
    /// Raw response, when the server answered.
    pub response: Option<HttpResponse>,
    /// Payload on success.
    pub payload: Option<Payload>,
    /// Error on failure.
    pub error: Option<NajaError>,
}

impl Complete {
    /// Whether the request succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl EventDetail for Complete {
    const TYPE: &'static str = "complete";
}
