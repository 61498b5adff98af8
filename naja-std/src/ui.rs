//! # UI Handler
//!
//! Turns native link clicks and form submissions into AJAX requests.
//!
//! # Binding
//!
//! By default every link matching `a[href]:not([download]){selector}` and
//! every form inside the body gets its own native listener; content inserted
//! by snippets is bound on `afterUpdate`. With event delegation a single
//! click listener on the window and a single submit listener on the document
//! handle the whole page instead.
//!
//! # Interaction
//!
//! The `interaction` event fires synchronously inside the native listener,
//! so a veto can still suppress the browser's default action. Requests are
//! then handed to the spawner; nobody awaits them.

use crate::snippet::{AfterUpdate, SnippetHandler};
use futures::future::{self, BoxFuture};
use naja_core::{
    Directives, ElementId, Event, EventTarget, Extension, FormData, Init, Interaction, Load,
    Naja, NajaError, NativeEvent, NativeEventKind, NativeListener, Options, Payload, location,
};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Selector opting links and forms into AJAX handling.
pub const DEFAULT_SELECTOR: &str = ".ajax";

/// A request future produced by an interaction.
pub type RequestFuture = BoxFuture<'static, Result<Payload, NajaError>>;

/// Binds links and forms and dispatches their interactions.
pub struct UiHandler {
    selector: String,
    allowed_origins: Vec<String>,
    event_delegation: bool,
    listener: OnceLock<NativeListener>,
}

impl Default for UiHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl UiHandler {
    /// Handler for `.ajax` elements, same-origin only, without delegation.
    pub fn new() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_owned(),
            allowed_origins: Vec::new(),
            event_delegation: false,
            listener: OnceLock::new(),
        }
    }

    /// Selector suffix; an empty selector handles every link and form.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Extra origins requests may target. Entries may be full URLs.
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins
            .into_iter()
            .map(|origin| {
                let origin = origin.into();
                location::normalize_origin(&origin).unwrap_or(origin)
            })
            .collect();
        self
    }

    /// Handle the whole page with two listeners instead of binding elements.
    pub fn with_event_delegation(mut self, enabled: bool) -> Self {
        self.event_delegation = enabled;
        self
    }

    /// Selector suffix.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Whether event delegation is active.
    pub fn event_delegation(&self) -> bool {
        self.event_delegation
    }

    fn link_selector(&self) -> String {
        format!("a[href]:not([download]){}", self.selector)
    }

    /// Whether `url` may be requested: it must resolve to a tuple origin that
    /// is either the current one or explicitly allowed.
    pub fn is_url_allowed(&self, naja: &Naja, url: &str) -> bool {
        let current = naja.dom().location();
        let Ok(target) = location::resolve(&current, url) else {
            return false;
        };
        let Some(origin) = location::origin(&target) else {
            return false;
        };
        location::normalize_origin(&current).as_deref() == Some(origin.as_str())
            || self.allowed_origins.iter().any(|allowed| *allowed == origin)
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Attach the native listener to `element` and matching descendants.
    ///
    /// Binding is idempotent. Does nothing with event delegation.
    pub fn bind_ui(&self, naja: &Naja, element: ElementId) {
        if self.event_delegation {
            warn!("bind_ui has no effect with event delegation");
            return;
        }
        let Some(listener) = self.listener.get() else {
            debug!("ui handler is not initialized, nothing to bind");
            return;
        };
        let dom = naja.dom();
        let bind = |target: ElementId, kind: NativeEventKind| {
            dom.remove_event_listener(EventTarget::Element(target), kind, listener);
            dom.add_event_listener(EventTarget::Element(target), kind, listener);
        };

        let link_selector = self.link_selector();
        if dom.matches(element, &link_selector) {
            bind(element, NativeEventKind::Click);
            return;
        }
        for link in dom.query_selector_all(element, &link_selector) {
            bind(link, NativeEventKind::Click);
        }

        if dom.tag_name(element) == "form" {
            bind(element, NativeEventKind::Submit);
            return;
        }
        for form in dom.query_selector_all(element, "form") {
            bind(form, NativeEventKind::Submit);
        }
    }

    /// Native listener body.
    pub fn handle_ui(&self, naja: &Naja, event: &NativeEvent) {
        let dom = naja.dom();
        let interaction = match event {
            NativeEvent::Click {
                target,
                current_target,
                button,
                modifiers,
                ..
            } => {
                if modifiers.any() || *button != 0 {
                    return;
                }
                let link = if self.event_delegation {
                    dom.closest(*target, &self.link_selector())
                } else {
                    *current_target
                };
                let Some(link) = link else {
                    return;
                };
                self.click_element(naja, link, Options::new(), Some(event))
            }
            NativeEvent::Submit {
                target,
                current_target,
                submitter,
                ..
            } => {
                let form = match (self.event_delegation, current_target) {
                    (false, Some(current)) => *current,
                    _ => *target,
                };
                let opted_in = self.selector.is_empty()
                    || dom.matches(form, &self.selector)
                    || submitter.is_some_and(|s| dom.matches(s, &self.selector));
                if !opted_in {
                    return;
                }
                self.submit_form(naja, form, Options::new(), Some(event))
            }
            NativeEvent::KeyDown { .. } | NativeEvent::PopState { .. } => return,
        };

        match interaction {
            Ok(request) => naja.spawn_request(request),
            Err(error) => warn!(%error, "interaction not handled, leaving it to the browser"),
        }
    }

    // ========================================================================
    // Interactions
    // ========================================================================

    /// Request the target of a link, or submit the form of a submit button.
    pub fn click_element(
        &self,
        naja: &Naja,
        element: ElementId,
        options: Options,
        event: Option<&NativeEvent>,
    ) -> Result<RequestFuture, NajaError> {
        let dom = naja.dom();
        match dom.tag_name(element).as_str() {
            "a" => {
                let href = dom
                    .attribute(element, "href")
                    .ok_or(NajaError::UnsupportedElement("anchor without href"))?;
                self.process_interaction(naja, element, "GET", &href, None, options, event)
            }
            "button" | "input" if dom.form_of(element).is_some() => {
                self.submit_form(naja, element, options, event)
            }
            _ => Err(NajaError::UnsupportedElement(
                "only anchors and form submitters can be clicked",
            )),
        }
    }

    /// Submit a form, or the form owning a submit button.
    ///
    /// The submitter's `formmethod`/`formaction` win over the form's
    /// `method`/`action`; the defaults are `GET` and the current path.
    pub fn submit_form(
        &self,
        naja: &Naja,
        element: ElementId,
        options: Options,
        event: Option<&NativeEvent>,
    ) -> Result<RequestFuture, NajaError> {
        let dom = naja.dom();
        let (form, submitter) = match dom.tag_name(element).as_str() {
            "form" => {
                let submitter = match event {
                    Some(NativeEvent::Submit { submitter, .. }) => *submitter,
                    _ => None,
                };
                (element, submitter)
            }
            "button" | "input" => {
                let form = dom.form_of(element).ok_or(NajaError::UnsupportedElement(
                    "submitter is not attached to a form",
                ))?;
                (form, Some(element))
            }
            _ => {
                return Err(NajaError::UnsupportedElement(
                    "only forms and their submitters can be submitted",
                ));
            }
        };

        let method = submitter
            .and_then(|s| dom.attribute(s, "formmethod"))
            .or_else(|| dom.attribute(form, "method"))
            .unwrap_or_else(|| "GET".to_owned())
            .to_ascii_uppercase();
        let url = submitter
            .and_then(|s| dom.attribute(s, "formaction"))
            .or_else(|| dom.attribute(form, "action"))
            .unwrap_or_else(|| location::path_and_query(&dom.location()));
        let data = dom.form_data(form, submitter);

        self.process_interaction(
            naja,
            submitter.unwrap_or(form),
            &method,
            &url,
            Some(data),
            options,
            event,
        )
    }

    /// Fire `interaction` and build the request.
    ///
    /// A vetoed interaction prevents the native default action and resolves
    /// with an empty payload without sending anything. A URL outside the
    /// allowed origins is rejected before any default action is prevented.
    #[allow(clippy::too_many_arguments)]
    pub fn process_interaction(
        &self,
        naja: &Naja,
        element: ElementId,
        method: &str,
        url: &str,
        data: Option<FormData>,
        options: Options,
        event: Option<&NativeEvent>,
    ) -> Result<RequestFuture, NajaError> {
        let dom = naja.dom();
        let mut interaction = Event::new(Interaction {
            element,
            trigger: event.map(NativeEvent::kind),
            method: method.to_owned(),
            url: url.to_owned(),
            directives: Directives::parse(|name| dom.attribute(element, name)),
            options,
        });

        if !naja.dispatch(&mut interaction) {
            if let Some(event) = event {
                event.prevent_default();
            }
            debug!(url, "interaction canceled");
            return Ok(Box::pin(future::ready(Ok(Payload::default()))));
        }

        let Interaction {
            method,
            url,
            options,
            ..
        } = interaction.into_detail();
        if !self.is_url_allowed(naja, &url) {
            return Err(NajaError::UrlNotAllowed(url));
        }
        if let Some(event) = event {
            event.prevent_default();
        }

        let naja = naja.clone();
        Ok(Box::pin(async move {
            naja.make_request(&method, &url, data, options).await
        }))
    }
}

impl Extension for UiHandler {
    fn name(&self) -> &'static str {
        "ui"
    }

    fn on_init(&self, naja: &Naja, _event: &mut Event<Init>) {
        let weak = naja.downgrade();
        let listener = self.listener.get_or_init(|| {
            NativeListener::new(move |event| {
                let Some(naja) = weak.upgrade() else {
                    return;
                };
                if let Some(ui) = naja.extension::<UiHandler>() {
                    ui.handle_ui(&naja, event);
                }
            })
        });

        let dom = naja.dom();
        if self.event_delegation {
            dom.add_event_listener(EventTarget::Window, NativeEventKind::Click, listener);
            dom.add_event_listener(EventTarget::Document, NativeEventKind::Submit, listener);
            return;
        }

        self.bind_ui(naja, dom.body());
        if let Some(snippets) = naja.extension::<SnippetHandler>() {
            let weak = naja.downgrade();
            snippets.on::<AfterUpdate, _>(move |event| {
                let Some(naja) = weak.upgrade() else {
                    return;
                };
                if let Some(ui) = naja.extension::<UiHandler>() {
                    ui.bind_ui(&naja, event.detail.snippet);
                }
            });
        }
    }

    fn on_load(&self, naja: &Naja, _event: &mut Event<Load>) {
        if !self.event_delegation {
            self.bind_ui(naja, naja.dom().body());
        }
    }
}
