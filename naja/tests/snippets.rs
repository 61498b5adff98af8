//! Snippet updates driven by response payloads.

use naja::{BeforeUpdate, Dom, NajaConfig, Options, SnippetHandler, SnippetOperation};
use serde_json::json;

mod common;
use common::{Harness, snippets};

async fn get(h: &Harness, path: &str) {
    h.naja
        .make_request("GET", path, None, Options::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_replace_is_idempotent() {
    let h = Harness::started();
    h.transport
        .respond_json("/foo", snippets(&[("snippet-content", "<p>foo</p>")]));

    get(&h, "/foo").await;
    get(&h, "/foo").await;

    assert_eq!(h.dom.html_of("snippet-content"), "<p>foo</p>");
}

#[tokio::test]
async fn test_append_accumulates() {
    let h = Harness::started();
    h.transport
        .respond_json("/more", snippets(&[("snippet-list", "<li>2</li>")]));

    get(&h, "/more").await;
    get(&h, "/more").await;

    assert_eq!(h.dom.html_of("snippet-list"), "<li>1</li><li>2</li><li>2</li>");
}

#[tokio::test]
async fn test_payload_operation_overrides_attribute() {
    let h = Harness::started();
    h.transport.respond_json(
        "/top",
        json!({"snippets": {
            "snippet-list": {"content": "<li>0</li>", "operation": "prepend"},
            "snippet-content": {"content": "<p>!</p>", "operation": "append"}
        }}),
    );

    get(&h, "/top").await;

    assert_eq!(h.dom.html_of("snippet-list"), "<li>0</li><li>1</li>");
    assert_eq!(h.dom.html_of("snippet-content"), "<p>home</p><p>!</p>");
}

#[tokio::test]
async fn test_unknown_snippets_are_skipped() {
    let h = Harness::started();
    h.transport.respond_json(
        "/foo",
        snippets(&[("snippet-missing", "<p>?</p>"), ("snippet-content", "<p>foo</p>")]),
    );

    get(&h, "/foo").await;

    assert_eq!(h.dom.html_of("snippet-content"), "<p>foo</p>");
    assert_eq!(h.log.count("success"), 1);
}

#[tokio::test]
async fn test_title_snippet_sets_document_title() {
    let page = r#"<html><head><title id="snippet--title">Home</title></head>
<body><div id="snippet-content"></div></body></html>"#;
    let h = Harness::with_page(NajaConfig::default(), page).start();
    h.transport
        .respond_json("/foo", snippets(&[("snippet--title", "Foo")]));

    get(&h, "/foo").await;

    assert_eq!(h.dom.title(), "Foo");
}

#[tokio::test]
async fn test_custom_prefix() {
    let page = r#"<div id="snippet-content">a</div><div id="part-main">b</div>"#;
    let config = NajaConfig::from_value(json!({"snippetPrefix": "part-"})).unwrap();
    let h = Harness::with_page(config, page).start();

    let found = h
        .naja
        .extension::<SnippetHandler>()
        .unwrap()
        .find_snippets(h.dom.as_ref());

    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["part-main"]);
}

#[tokio::test]
async fn test_before_update_may_rewrite_or_cancel() {
    let h = Harness::started();
    h.transport.respond_json(
        "/foo",
        snippets(&[("snippet-content", "<p>foo</p>"), ("snippet-list", "<li>x</li>")]),
    );
    let handler = h.naja.extension::<SnippetHandler>().unwrap();
    handler.on::<BeforeUpdate, _>(|event| match event.detail.id.as_str() {
        "snippet-content" => event.detail.content = "<p>rewritten</p>".into(),
        _ => event.prevent_default(),
    });

    get(&h, "/foo").await;

    assert_eq!(h.dom.html_of("snippet-content"), "<p>rewritten</p>");
    assert_eq!(h.dom.html_of("snippet-list"), "<li>1</li>");
}

#[tokio::test]
async fn test_before_update_sees_resolved_operation() {
    let h = Harness::started();
    h.transport
        .respond_json("/more", snippets(&[("snippet-list", "<li>2</li>")]));
    let handler = h.naja.extension::<SnippetHandler>().unwrap();
    handler.on::<BeforeUpdate, _>(|event| {
        assert_eq!(event.detail.operation, SnippetOperation::Append);
        assert!(!event.detail.from_cache);
        event.detail.operation = SnippetOperation::Replace;
    });

    get(&h, "/more").await;

    assert_eq!(h.dom.html_of("snippet-list"), "<li>2</li>");
}

#[tokio::test]
async fn test_scripts_in_snippets_run_once_per_id() {
    let h = Harness::started();
    let content = r#"<p>x</p><script data-naja-script-id="chart">drawChart()</script><script>tick()</script>"#;
    h.transport
        .respond_json("/foo", snippets(&[("snippet-content", content)]));

    get(&h, "/foo").await;
    get(&h, "/foo").await;

    let executed: Vec<String> = h
        .dom
        .executed_scripts()
        .into_iter()
        .map(|script| script.text)
        .collect();
    assert_eq!(executed, vec!["drawChart()", "tick()", "tick()"]);
}
