//! Link and form interception.

use naja::{
    Dom, ElementId, EventTarget, FormValidator, FormsHandler, Interaction, Modifiers, NajaConfig,
    NajaError, NativeEventKind, Options, UiHandler,
};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

mod common;
use common::{Harness, snippets, url};

#[tokio::test]
async fn test_click_on_bound_link_runs_ajax_request() {
    let h = Harness::started();
    h.transport
        .respond_json("/foo", snippets(&[("snippet-content", "<p>foo</p>")]));

    assert!(h.click("foo"));
    assert_eq!(h.spawner.pending(), 1);
    assert_eq!(h.log.events(), vec!["interaction"]);

    h.settle().await;
    assert_eq!(h.requested_urls(), vec![url("/foo")]);
    assert_eq!(h.dom.html_of("snippet-content"), "<p>foo</p>");
    assert_eq!(h.dom.location(), url("/foo"));
    assert!(h.dom.navigations().is_empty());
}

#[tokio::test]
async fn test_links_outside_selector_are_left_alone() {
    let h = Harness::started();

    assert!(!h.click("plain"));
    assert!(!h.click("file"));
    h.settle().await;

    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.dom.navigations(), vec![url("/plain"), url("/file")]);
    assert_eq!(h.log.count("interaction"), 0);
}

#[tokio::test]
async fn test_modified_and_secondary_clicks_are_ignored() {
    let h = Harness::started();
    let foo = h.dom.element("foo");

    let ctrl = Modifiers {
        ctrl: true,
        ..Modifiers::default()
    };
    assert!(!h.dom.click_with(foo, 0, ctrl));
    assert!(!h.dom.click_with(foo, 1, Modifiers::default()));
    h.settle().await;

    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.log.count("interaction"), 0);
}

#[tokio::test]
async fn test_disallowed_origin_falls_back_to_browser() {
    let h = Harness::started();

    assert!(!h.click("evil"));
    h.settle().await;
    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.dom.navigations(), vec!["https://evil.example/x".to_owned()]);

    let ui = h.naja.extension::<UiHandler>().unwrap();
    let result = ui.click_element(&h.naja, h.dom.element("evil"), Options::new(), None);
    assert!(matches!(result, Err(NajaError::UrlNotAllowed(url)) if url == "https://evil.example/x"));
}

#[tokio::test]
async fn test_allowed_origins_extend_same_origin() {
    let config = NajaConfig::from_value(json!({
        "allowedOrigins": ["https://evil.example/whatever"]
    }))
    .unwrap();
    let h = Harness::with_config(config).start();
    h.transport.respond_json("https://evil.example/x", json!({}));

    assert!(h.click("evil"));
    h.settle().await;

    assert_eq!(h.requested_urls(), vec!["https://evil.example/x".to_owned()]);
    assert!(h.dom.navigations().is_empty());
}

#[tokio::test]
async fn test_vetoed_interaction_prevents_default_without_request() {
    let h = Harness::started();
    h.naja.on::<Interaction, _>(|event| event.prevent_default());

    assert!(h.click("foo"));
    h.settle().await;

    assert_eq!(h.transport.request_count(), 0);
    assert!(h.dom.navigations().is_empty());
    assert_eq!(h.log.events(), vec!["interaction"]);
}

#[tokio::test]
async fn test_interaction_listener_may_set_options() {
    let h = Harness::started();
    h.transport.respond_json("/foo", snippets(&[]));
    h.naja.on::<Interaction, _>(|event| {
        if event.detail.url == "/foo" {
            event.detail.options.set("history", false);
        }
    });

    assert!(h.click("foo"));
    h.settle().await;

    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.dom.history_len(), 1);
}

#[tokio::test]
async fn test_form_submission_through_submitter() {
    let h = Harness::started();
    h.transport.respond_json("/search", snippets(&[]));
    h.transport.respond_json("/alt", snippets(&[]));
    let form = h.dom.element("search");

    assert!(h.dom.submit(form, Some(h.dom.element("go"))));
    assert!(h.dom.submit(form, Some(h.dom.element("alt"))));
    h.settle().await;

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);

    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, url("/search"));
    let data = requests[0].data.as_ref().unwrap();
    assert_eq!(data.get("q"), Some("naja"));
    assert_eq!(data.get("op"), Some("go"));

    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].url, url("/alt"));
    let data = requests[1].data.as_ref().unwrap();
    assert_eq!(data.get("q"), Some("naja"));
    assert_eq!(data.get("op"), None);
}

#[tokio::test]
async fn test_submit_button_click_submits_ajax_form() {
    let h = Harness::started();

    h.click("alt");
    h.settle().await;

    assert_eq!(h.transport.requests()[0].method, "POST");
    assert!(h.dom.navigations().is_empty());
}

#[tokio::test]
async fn test_forms_outside_selector_submit_natively() {
    let h = Harness::started();

    assert!(!h.click("classic-go"));
    h.settle().await;

    assert_eq!(h.transport.request_count(), 0);
    assert_eq!(h.dom.navigations(), vec![url("/classic")]);
}

#[tokio::test]
async fn test_binding_is_idempotent() {
    let h = Harness::started();
    let foo = EventTarget::Element(h.dom.element("foo"));
    let search = EventTarget::Element(h.dom.element("search"));

    h.naja.load();
    h.naja.load();

    assert_eq!(h.dom.listener_count(foo, NativeEventKind::Click), 1);
    assert_eq!(h.dom.listener_count(search, NativeEventKind::Submit), 1);
    assert_eq!(h.dom.listener_count(EventTarget::Window, NativeEventKind::Click), 0);
}

#[tokio::test]
async fn test_links_in_updated_snippets_are_bound() {
    let h = Harness::started();
    h.transport.respond_json(
        "/foo",
        snippets(&[(
            "snippet-content",
            r#"<a id="more" class="ajax" href="/more">More</a>"#,
        )]),
    );
    h.transport.respond_json("/more", snippets(&[]));

    h.click("foo");
    h.settle().await;
    assert!(h.click("more"));
    h.settle().await;

    assert_eq!(h.requested_urls(), vec![url("/foo"), url("/more")]);
}

#[tokio::test]
async fn test_event_delegation_handles_the_whole_page() {
    let config = NajaConfig::from_value(json!({"eventDelegation": true})).unwrap();
    let h = Harness::with_config(config).start();
    h.transport.respond_json("/late", snippets(&[]));
    h.transport.respond_json("/alt", snippets(&[]));

    assert_eq!(h.dom.listener_count(EventTarget::Window, NativeEventKind::Click), 1);
    assert_eq!(h.dom.listener_count(EventTarget::Document, NativeEventKind::Submit), 1);
    assert_eq!(
        h.dom
            .listener_count(EventTarget::Element(h.dom.element("foo")), NativeEventKind::Click),
        0
    );

    let content = h.dom.element("snippet-content");
    h.dom.set_inner_html(
        content,
        r#"<a id="late" class="ajax" href="/late"><span id="inner">Late</span></a>"#,
    );
    assert!(h.click("inner"));
    assert!(!h.click("plain"));
    assert!(h.dom.submit(h.dom.element("search"), Some(h.dom.element("alt"))));
    h.settle().await;

    assert_eq!(h.requested_urls(), vec![url("/late"), url("/alt")]);
    assert_eq!(h.dom.navigations(), vec![url("/plain")]);
}

#[tokio::test]
async fn test_programmatic_interactions() {
    let h = Harness::started();
    h.transport
        .respond_json("/foo", snippets(&[("snippet-content", "<p>foo</p>")]));
    let ui = h.naja.extension::<UiHandler>().unwrap();

    let request = ui
        .click_element(&h.naja, h.dom.element("foo"), Options::new(), None)
        .unwrap_or_else(|error| panic!("interaction failed: {error}"));
    let payload = request.await.unwrap();
    assert_eq!(payload.snippets.len(), 1);
    assert_eq!(h.log.events()[0], "interaction");

    let unsupported = ui.click_element(&h.naja, h.dom.element("snippet-content"), Options::new(), None);
    assert!(matches!(unsupported, Err(NajaError::UnsupportedElement(_))));
    let unsupported = ui.submit_form(&h.naja, h.dom.element("foo"), Options::new(), None);
    assert!(matches!(unsupported, Err(NajaError::UnsupportedElement(_))));
}

/// Rejects submissions through the `alt` button.
struct NoAlt {
    initialized: Arc<AtomicUsize>,
}

impl FormValidator for NoAlt {
    fn validate(&self, dom: &dyn Dom, _form: ElementId, submitter: Option<ElementId>) -> bool {
        submitter.and_then(|s| dom.attribute(s, "id")).as_deref() != Some("alt")
    }

    fn init_form(&self, _dom: &dyn Dom, _form: ElementId) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_form_validator_vetoes_and_initializes() {
    let h = Harness::started();
    let initialized = Arc::new(AtomicUsize::new(0));
    h.naja
        .extension::<FormsHandler>()
        .unwrap()
        .set_validator(NoAlt {
            initialized: initialized.clone(),
        });
    h.transport.respond_json(
        "/search",
        snippets(&[("snippet-content", r#"<form id="late" class="ajax"></form>"#)]),
    );
    let form = h.dom.element("search");

    assert!(h.dom.submit(form, Some(h.dom.element("alt"))));
    h.settle().await;
    assert_eq!(h.transport.request_count(), 0);
    assert!(h.dom.navigations().is_empty());

    assert!(h.dom.submit(form, Some(h.dom.element("go"))));
    h.settle().await;
    assert_eq!(h.requested_urls(), vec![url("/search")]);
    assert_eq!(initialized.load(Ordering::SeqCst), 1);
}
