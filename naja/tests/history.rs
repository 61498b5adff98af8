//! Session history: entries, snapshots and back/forward replay.

use naja::{
    BuildState, Dom, HistoryHandler, HistoryPhase, NajaConfig, Options, RestoreState, UiHandler,
};
use serde_json::json;

mod common;
use common::{Harness, PAGE, snippets, url};

/// A started harness where `/foo` and `/bar` each rewrite the content.
fn navigable(config: NajaConfig) -> Harness {
    let h = Harness::with_config(config).start();
    h.transport
        .respond_json("/foo", snippets(&[("snippet-content", "<p>foo</p>")]));
    h.transport
        .respond_json("/bar", snippets(&[("snippet-content", "<p>bar</p>")]));
    h.transport
        .respond_json("/", snippets(&[("snippet-content", "<p>home again</p>")]));
    h
}

async fn visit(h: &Harness, link: &str) {
    assert!(h.click(link));
    h.settle().await;
}

#[tokio::test]
async fn test_initial_entry_is_replaced_with_snapshot() {
    let h = Harness::started();

    assert_eq!(h.dom.history_len(), 1);
    let entry = h.dom.history_state().unwrap();
    assert_eq!(entry.href, url("/"));
    assert_eq!(entry.title, "Home");
    let ui = entry.ui.unwrap();
    assert_eq!(ui["snippet-content"], "<p>home</p>");
    assert_eq!(ui["snippet-list"], "<li>1</li>");
}

#[tokio::test]
async fn test_back_and_forward_replay_snapshots() {
    let h = navigable(NajaConfig::default());
    visit(&h, "foo").await;
    visit(&h, "bar").await;
    assert_eq!(h.dom.history_len(), 3);
    assert_eq!(h.dom.location(), url("/bar"));

    assert!(h.dom.back());
    assert_eq!(h.dom.html_of("snippet-content"), "<p>foo</p>");
    assert_eq!(h.dom.location(), url("/foo"));

    assert!(h.dom.back());
    assert_eq!(h.dom.html_of("snippet-content"), "<p>home</p>");

    assert!(h.dom.forward());
    assert!(h.dom.forward());
    assert_eq!(h.dom.html_of("snippet-content"), "<p>bar</p>");

    h.settle().await;
    assert_eq!(h.transport.request_count(), 2);
    assert_eq!(h.dom.history_len(), 3);
    assert_eq!(
        h.naja.extension::<HistoryHandler>().unwrap().phase(),
        HistoryPhase::Navigating
    );
}

#[tokio::test]
async fn test_history_off_directive() {
    let h = Harness::started();
    h.transport.respond_json("/quiet", snippets(&[]));

    visit(&h, "quiet").await;

    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.dom.history_len(), 1);
    assert_eq!(h.dom.location(), url("/"));
}

#[tokio::test]
async fn test_history_directive_beats_default_option() {
    let config = NajaConfig::from_value(json!({"defaultOptions": {"history": "replace"}})).unwrap();
    let h = navigable(config);
    h.transport.respond_json("/quiet", snippets(&[]));

    visit(&h, "quiet").await;
    assert_eq!(h.transport.request_count(), 1);
    assert_eq!(h.dom.history_len(), 1);
    assert_eq!(h.dom.location(), url("/"));
    assert_eq!(h.dom.history_state().unwrap().href, url("/"));

    visit(&h, "foo").await;
    assert_eq!(h.dom.history_len(), 1);
    assert_eq!(h.dom.location(), url("/foo"));
}

#[tokio::test]
async fn test_explicit_option_beats_history_directive() {
    let h = Harness::started();
    h.transport.respond_json("/quiet", snippets(&[]));
    let ui = h.naja.extension::<UiHandler>().unwrap();

    ui.click_element(
        &h.naja,
        h.dom.element("quiet"),
        Options::new().with("history", true),
        None,
    )
    .unwrap_or_else(|error| panic!("interaction failed: {error}"))
    .await
    .unwrap();

    assert_eq!(h.dom.history_len(), 2);
    assert_eq!(h.dom.location(), url("/quiet"));
}

#[tokio::test]
async fn test_replace_mode() {
    let h = navigable(NajaConfig::default());

    h.naja
        .make_request("GET", "/foo", None, Options::new().with("history", "replace"))
        .await
        .unwrap();

    assert_eq!(h.dom.history_len(), 1);
    assert_eq!(h.dom.location(), url("/foo"));
    assert_eq!(h.dom.history_state().unwrap().href, url("/foo"));
}

#[tokio::test]
async fn test_replay_fires_load() {
    let h = navigable(NajaConfig::default());
    visit(&h, "foo").await;
    h.log.clear();

    assert!(h.dom.back());

    assert_eq!(h.dom.html_of("snippet-content"), "<p>home</p>");
    assert_eq!(h.log.events(), vec!["load"]);
}

#[tokio::test]
async fn test_nocache_snippets_keep_live_content_on_replay() {
    let page = PAGE.replace(
        r#"<div id="snippet-content"><p>home</p></div>"#,
        r#"<div id="snippet-content"><p>home</p></div>
<div id="snippet-clock" data-naja-history-nocache>12:00</div>
<div id="snippet-ticker" data-history-nocache>up</div>"#,
    );
    let h = Harness::with_page(NajaConfig::default(), &page).start();
    h.transport.respond_json(
        "/foo",
        snippets(&[
            ("snippet-content", "<p>foo</p>"),
            ("snippet-clock", "12:05"),
            ("snippet-ticker", "down"),
        ]),
    );

    let ui = h.dom.history_state().unwrap().ui.unwrap();
    assert!(ui.contains_key("snippet-content"));
    assert!(!ui.contains_key("snippet-clock"));
    assert!(!ui.contains_key("snippet-ticker"));

    visit(&h, "foo").await;
    assert_eq!(h.dom.html_of("snippet-clock"), "12:05");

    assert!(h.dom.back());
    assert_eq!(h.dom.html_of("snippet-content"), "<p>home</p>");
    assert_eq!(h.dom.html_of("snippet-clock"), "12:05");
    assert_eq!(h.dom.html_of("snippet-ticker"), "down");
}

#[tokio::test]
async fn test_entries_without_snapshot_are_refetched() {
    let config = NajaConfig::from_value(json!({"historyUiCache": false})).unwrap();
    let h = navigable(config);
    visit(&h, "foo").await;
    visit(&h, "bar").await;
    assert!(h.dom.history_state().unwrap().ui.is_none());

    assert!(h.dom.back());
    assert_eq!(h.spawner.pending(), 1);
    h.settle().await;

    assert_eq!(h.requested_urls(), vec![url("/foo"), url("/bar"), url("/foo")]);
    assert_eq!(h.dom.html_of("snippet-content"), "<p>foo</p>");
    assert_eq!(h.dom.history_len(), 3);
    assert_eq!(h.dom.location(), url("/foo"));
}

#[tokio::test]
async fn test_per_request_snapshot_override() {
    let h = navigable(NajaConfig::default());

    h.naja
        .make_request("GET", "/foo", None, Options::new().with("historyUiCache", false))
        .await
        .unwrap();

    let entry = h.dom.history_state().unwrap();
    assert_eq!(entry.href, url("/foo"));
    assert!(entry.ui.is_none());
}

#[tokio::test]
async fn test_post_get_records_canonical_url() {
    let h = Harness::started();
    h.transport.respond_json(
        "/save",
        json!({"postGet": true, "url": "/saved", "snippets": {"snippet-content": "ok"}}),
    );

    h.naja
        .make_request("POST", "/save", None, Options::new())
        .await
        .unwrap();

    assert_eq!(h.dom.location(), url("/saved"));
    assert_eq!(h.dom.history_state().unwrap().href, url("/saved"));
}

#[tokio::test]
async fn test_build_state_may_amend_entry() {
    let h = navigable(NajaConfig::default());
    let history = h.naja.extension::<HistoryHandler>().unwrap();
    history.on::<BuildState, _>(|event| {
        event.detail.entry.title = format!("{} (naja)", event.detail.entry.title);
    });

    visit(&h, "foo").await;

    assert_eq!(h.dom.history_state().unwrap().title, "Home (naja)");
}

#[tokio::test]
async fn test_restore_state_may_cancel_replay() {
    let h = navigable(NajaConfig::default());
    let history = h.naja.extension::<HistoryHandler>().unwrap();
    history.on::<RestoreState, _>(|event| event.prevent_default());
    visit(&h, "foo").await;
    visit(&h, "bar").await;

    assert!(h.dom.back());
    h.settle().await;

    assert_eq!(h.dom.html_of("snippet-content"), "<p>bar</p>");
    assert_eq!(h.transport.request_count(), 2);
}
