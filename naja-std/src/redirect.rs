//! # Redirect Handler
//!
//! Follows the `redirect` key of a successful payload. Same-origin targets
//! are loaded with a follow-up AJAX `GET`; forced redirects and targets
//! outside the allowed origins become a full page load. Either way the
//! `success` event stops propagating, so later extensions never apply the
//! payload of a response that redirects.

use crate::ui::UiHandler;
use naja_core::{
    Event, EventBus, EventDetail, Extension, Interaction, ListenerId, Naja, Options, Success,
    location, options::FORCE_REDIRECT,
};
use tracing::debug;

/// `redirect` (cancelable): a payload asked to go elsewhere.
#[derive(Debug)]
pub struct Redirect {
    /// Redirect target, may be rewritten.
    pub url: String,
    /// Full page load instead of an AJAX request, may be rewritten.
    pub hard: bool,
    /// Options of the follow-up request.
    pub options: Options,
}

impl EventDetail for Redirect {
    const TYPE: &'static str = "redirect";
    const CANCELABLE: bool = true;
}

/// Follows payload redirects.
#[derive(Default)]
pub struct RedirectHandler {
    bus: EventBus,
}

impl RedirectHandler {
    /// Create the handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `redirect`.
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&mut Event<Redirect>) + Send + Sync + 'static,
    {
        self.bus.on(listener)
    }

    /// Unsubscribe.
    pub fn off(&self, id: ListenerId) -> bool {
        self.bus.off::<Redirect>(id)
    }

    /// Redirect to `url`.
    ///
    /// `force` requests a full page load; so does a target outside the
    /// allowed origins.
    pub fn make_redirect(&self, naja: &Naja, url: &str, force: bool, options: Options) {
        let allowed = match naja.extension::<UiHandler>() {
            Some(ui) => ui.is_url_allowed(naja, url),
            None => location::is_same_origin(&naja.dom().location(), url),
        };

        let mut event = Event::new(Redirect {
            url: url.to_owned(),
            hard: force || !allowed,
            options,
        });
        if !self.bus.dispatch(&mut event) {
            debug!(url, "redirect canceled");
            return;
        }

        let Redirect { url, hard, options } = event.into_detail();
        if hard {
            debug!(%url, "redirecting with a full page load");
            naja.dom().navigate(&url);
            return;
        }
        debug!(%url, "redirecting with an async request");
        let follow_up = naja.clone();
        naja.spawn_request(async move { follow_up.make_request("GET", &url, None, options).await });
    }
}

impl Extension for RedirectHandler {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn on_interaction(&self, _naja: &Naja, event: &mut Event<Interaction>) {
        if let Some(force) = event.detail.directives.force_redirect {
            event.detail.options.set_default(FORCE_REDIRECT, force);
        }
    }

    fn on_success(&self, naja: &Naja, event: &mut Event<Success>) {
        let Some(url) = event.detail.payload.redirect.clone() else {
            return;
        };
        event.stop_immediate_propagation();

        let request = &event.detail.request;
        let force = event.detail.payload.force_redirect || request.options.force_redirect();
        let mut options = Options::clone(&request.options);
        options.remove(FORCE_REDIRECT);
        self.make_redirect(naja, &url, force, options);
    }
}
