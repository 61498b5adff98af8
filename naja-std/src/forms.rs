//! # Forms Handler
//!
//! Hooks client-side form validation into the interaction flow. Without a
//! [`FormValidator`] the handler does nothing.

use crate::snippet::{AfterUpdate, SnippetHandler};
use naja_core::{Dom, ElementId, Event, Extension, Init, Interaction, Naja};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Client-side form validation.
pub trait FormValidator: Send + Sync + 'static {
    /// Whether `form` may be submitted through `submitter`.
    fn validate(&self, dom: &dyn Dom, form: ElementId, submitter: Option<ElementId>) -> bool;

    /// Prepare a form inserted by a snippet update.
    #[allow(unused_variables)]
    fn init_form(&self, dom: &dyn Dom, form: ElementId) {}
}

/// Vetoes interactions on invalid forms.
#[derive(Default)]
pub struct FormsHandler {
    validator: Mutex<Option<Arc<dyn FormValidator>>>,
}

impl FormsHandler {
    /// Handler without a validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler using `validator`.
    pub fn with_validator(validator: impl FormValidator) -> Self {
        let handler = Self::new();
        handler.set_validator(validator);
        handler
    }

    /// Install or replace the validator.
    pub fn set_validator(&self, validator: impl FormValidator) {
        *self.validator.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(validator));
    }

    fn validator(&self) -> Option<Arc<dyn FormValidator>> {
        self.validator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run [`FormValidator::init_form`] on the forms of `root`.
    pub fn init_forms(&self, dom: &dyn Dom, root: ElementId) {
        let Some(validator) = self.validator() else {
            return;
        };
        if dom.tag_name(root) == "form" {
            validator.init_form(dom, root);
        }
        for form in dom.query_selector_all(root, "form") {
            validator.init_form(dom, form);
        }
    }
}

impl Extension for FormsHandler {
    fn name(&self) -> &'static str {
        "forms"
    }

    fn on_init(&self, naja: &Naja, _event: &mut Event<Init>) {
        self.init_forms(naja.dom().as_ref(), naja.dom().body());
        let Some(snippets) = naja.extension::<SnippetHandler>() else {
            return;
        };
        let weak = naja.downgrade();
        snippets.on::<AfterUpdate, _>(move |event| {
            let Some(naja) = weak.upgrade() else {
                return;
            };
            if let Some(forms) = naja.extension::<FormsHandler>() {
                forms.init_forms(naja.dom().as_ref(), event.detail.snippet);
            }
        });
    }

    fn on_interaction(&self, naja: &Naja, event: &mut Event<Interaction>) {
        let Some(validator) = self.validator() else {
            return;
        };
        let dom = naja.dom();
        let element = event.detail.element;
        let (form, submitter) = match dom.tag_name(element).as_str() {
            "form" => (Some(element), None),
            "button" | "input" => (dom.form_of(element), Some(element)),
            _ => (None, None),
        };
        let Some(form) = form else {
            return;
        };
        if !validator.validate(dom.as_ref(), form, submitter) {
            debug!(?form, "form is invalid, interaction vetoed");
            event.prevent_default();
        }
    }
}
