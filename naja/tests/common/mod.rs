#![allow(dead_code)]

use naja::{
    Environment, Naja, NajaConfig,
    testing::{EventLog, ManualSpawner, MemoryDom, MockTransport},
};
use serde_json::{Value, json};
use std::sync::Arc;

// ============================================================================
// Test Page
// ============================================================================

pub const ORIGIN: &str = "https://example.com";

pub const PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Home</title></head><body>
<nav>
  <a id="foo" class="ajax" href="/foo">Foo</a>
  <a id="bar" class="ajax" href="/bar">Bar</a>
  <a id="plain" href="/plain">Plain</a>
  <a id="evil" class="ajax" href="https://evil.example/x">Evil</a>
  <a id="quiet" class="ajax" href="/quiet" data-naja-history="off">Quiet</a>
  <a id="file" class="ajax" href="/file" download>File</a>
</nav>
<div id="snippet-content"><p>home</p></div>
<ul id="snippet-list" data-naja-snippet-append><li>1</li></ul>
<form id="search" class="ajax" action="/search">
  <input name="q" value="naja">
  <button id="go" name="op" value="go">Go</button>
  <button id="alt" formmethod="post" formaction="/alt">Alt</button>
</form>
<form id="classic" action="/classic"><button id="classic-go">Go</button></form>
</body></html>"#;

/// Absolute URL on the test origin.
pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// A payload body with the given snippets.
pub fn snippets(pairs: &[(&str, &str)]) -> Value {
    let snippets: serde_json::Map<String, Value> = pairs
        .iter()
        .map(|(id, html)| ((*id).to_owned(), Value::String((*html).to_owned())))
        .collect();
    json!({ "snippets": snippets })
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub naja: Naja,
    pub dom: Arc<MemoryDom>,
    pub transport: Arc<MockTransport>,
    pub spawner: Arc<ManualSpawner>,
    pub log: EventLog,
}

impl Harness {
    /// Default configuration, not yet initialized.
    pub fn new() -> Self {
        Self::with_config(NajaConfig::default())
    }

    pub fn with_config(config: NajaConfig) -> Self {
        Self::with_page(config, PAGE)
    }

    pub fn with_page(config: NajaConfig, page: &str) -> Self {
        let dom = Arc::new(MemoryDom::new(url("/"), page));
        let transport = Arc::new(MockTransport::new());
        let spawner = Arc::new(ManualSpawner::new());
        let env = Environment {
            dom: dom.clone(),
            history: dom.clone(),
            transport: transport.clone(),
            spawner: spawner.clone(),
        };
        let naja = naja::new(env, &config);
        let log = EventLog::new();
        log.attach(&naja);
        Self {
            naja,
            dom,
            transport,
            spawner,
            log,
        }
    }

    /// Default configuration, initialized, with the log cleared.
    pub fn started() -> Self {
        Self::new().start()
    }

    pub fn start(self) -> Self {
        self.naja.initialize().unwrap();
        self.log.clear();
        self
    }

    /// Drive every detached request to completion.
    pub async fn settle(&self) {
        self.spawner.run_until_idle().await;
    }

    /// Click the element with `id`; returns whether the default was prevented.
    pub fn click(&self, id: &str) -> bool {
        self.dom.click(self.dom.element(id))
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.transport.requests().into_iter().map(|r| r.url).collect()
    }
}
