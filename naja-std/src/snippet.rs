//! # Snippet Handler
//!
//! Applies the `snippets` of a successful payload to the page. Each snippet
//! id names an element; its content replaces, or is prepended/appended to,
//! that element's inner HTML. An element named `title` sets the document
//! title instead.
//!
//! The handler owns its own bus:
//!
//! - `beforeUpdate` (cancelable) lets listeners skip or rewrite one snippet
//! - `afterUpdate` announces applied content, e.g. for binding new links or
//!   running scripts

use naja_core::{
    Directives, Dom, ElementId, Event, EventBus, EventDetail, Extension, InsertPosition,
    ListenerId, Naja, SnippetContent, SnippetOperation, Success,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Id prefix marking snippet elements.
pub const DEFAULT_SNIPPET_PREFIX: &str = "snippet-";

const SNAPSHOT_OPT_OUT: [&str; 2] = ["data-naja-history-nocache", "data-history-nocache"];

/// `beforeUpdate`: a snippet is about to be applied.
#[derive(Debug)]
pub struct BeforeUpdate {
    /// Target element.
    pub snippet: ElementId,
    /// Snippet id.
    pub id: String,
    /// Content to apply, may be rewritten.
    pub content: String,
    /// Operation to apply, may be rewritten.
    pub operation: SnippetOperation,
    /// Content comes from a history snapshot.
    pub from_cache: bool,
}

impl EventDetail for BeforeUpdate {
    const TYPE: &'static str = "beforeUpdate";
    const CANCELABLE: bool = true;
}

/// `afterUpdate`: a snippet was applied.
#[derive(Debug)]
pub struct AfterUpdate {
    /// Updated element.
    pub snippet: ElementId,
    /// Snippet id.
    pub id: String,
    /// Applied content (only the fragment for prepend/append).
    pub content: String,
    /// Applied operation.
    pub operation: SnippetOperation,
    /// Content came from a history snapshot.
    pub from_cache: bool,
}

impl EventDetail for AfterUpdate {
    const TYPE: &'static str = "afterUpdate";
}

/// Writes payload snippets into the document.
pub struct SnippetHandler {
    bus: EventBus,
    prefix: String,
}

impl Default for SnippetHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetHandler {
    /// Handler for `snippet-` prefixed elements.
    pub fn new() -> Self {
        Self {
            bus: EventBus::new(),
            prefix: DEFAULT_SNIPPET_PREFIX.to_owned(),
        }
    }

    /// Use another id prefix for [`find_snippets`](Self::find_snippets).
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Id prefix of snippet elements.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Subscribe to `beforeUpdate` or `afterUpdate`.
    pub fn on<D, F>(&self, listener: F) -> ListenerId
    where
        D: EventDetail,
        F: Fn(&mut Event<D>) + Send + Sync + 'static,
    {
        self.bus.on(listener)
    }

    /// Unsubscribe.
    pub fn off<D: EventDetail>(&self, id: ListenerId) -> bool {
        self.bus.off::<D>(id)
    }

    /// Snapshot of every snippet element's inner HTML, keyed by id.
    ///
    /// Snippets marked `data-naja-history-nocache` (or `data-history-nocache`)
    /// are left out, so replaying the snapshot keeps their live content.
    pub fn find_snippets(&self, dom: &dyn Dom) -> BTreeMap<String, String> {
        let selector = format!(r#"[id^="{}"]"#, self.prefix);
        dom.query_selector_all(dom.root(), &selector)
            .into_iter()
            .filter_map(|snippet| {
                if SNAPSHOT_OPT_OUT
                    .iter()
                    .any(|name| dom.attribute(snippet, name).is_some())
                {
                    return None;
                }
                let id = dom.attribute(snippet, "id")?;
                Some((id, dom.inner_html(snippet)))
            })
            .collect()
    }

    /// Apply `snippets`. Ids without a matching element are skipped.
    ///
    /// Content from a history snapshot (`from_cache`) always replaces.
    pub fn update_snippets(
        &self,
        naja: &Naja,
        snippets: &BTreeMap<String, SnippetContent>,
        from_cache: bool,
    ) {
        let dom = naja.dom();
        for (id, content) in snippets {
            match dom.element_by_id(id) {
                Some(snippet) => self.update_snippet(dom.as_ref(), snippet, id, content, from_cache),
                None => debug!(snippet = %id, "no element for snippet, skipping"),
            }
        }
    }

    /// Apply one snippet to `snippet`.
    pub fn update_snippet(
        &self,
        dom: &dyn Dom,
        snippet: ElementId,
        id: &str,
        content: &SnippetContent,
        from_cache: bool,
    ) {
        let operation = if from_cache {
            SnippetOperation::Replace
        } else {
            content
                .operation()
                .or_else(|| Directives::parse(|name| dom.attribute(snippet, name)).snippet_operation)
                .unwrap_or_default()
        };

        let mut before = Event::new(BeforeUpdate {
            snippet,
            id: id.to_owned(),
            content: content.html().to_owned(),
            operation,
            from_cache,
        });
        if !self.bus.dispatch(&mut before) {
            debug!(snippet = %id, "snippet update canceled");
            return;
        }
        let BeforeUpdate {
            id,
            content,
            operation,
            ..
        } = before.into_detail();

        if dom.tag_name(snippet) == "title" {
            dom.set_title(&content);
        } else {
            match operation {
                SnippetOperation::Replace => dom.set_inner_html(snippet, &content),
                SnippetOperation::Prepend => {
                    dom.insert_adjacent_html(snippet, InsertPosition::AfterBegin, &content)
                }
                SnippetOperation::Append => {
                    dom.insert_adjacent_html(snippet, InsertPosition::BeforeEnd, &content)
                }
            }
        }

        self.bus.emit(AfterUpdate {
            snippet,
            id,
            content,
            operation,
            from_cache,
        });
    }
}

impl Extension for SnippetHandler {
    fn name(&self) -> &'static str {
        "snippets"
    }

    fn on_success(&self, naja: &Naja, event: &mut Event<Success>) {
        let snippets = &event.detail.payload.snippets;
        if !snippets.is_empty() {
            self.update_snippets(naja, snippets, false);
        }
    }
}
