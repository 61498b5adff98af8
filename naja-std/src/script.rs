//! # Script Loader
//!
//! Scripts inserted through `innerHTML` never run, so after each snippet
//! update the loader extracts the `<script>` elements of the new content and
//! re-inserts them through [`Dom::insert_script`]. Scripts carrying a
//! `data-naja-script-id` attribute run at most once per page.

use crate::snippet::{AfterUpdate, SnippetHandler};
use naja_core::{Dom, Event, Extension, Init, Naja, Script};
use regex::Regex;
use std::{
    collections::HashSet,
    sync::{LazyLock, Mutex, PoisonError},
};
use tracing::debug;

/// Attribute deduplicating scripts across snippet updates.
pub const SCRIPT_ID_ATTRIBUTE: &str = "data-naja-script-id";

static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("script pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'/>=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

/// Scripts contained in an HTML fragment, in source order.
pub fn extract_scripts(html: &str) -> Vec<Script> {
    SCRIPT
        .captures_iter(html)
        .map(|captures| {
            let attributes = captures.get(1).map_or("", |a| a.as_str());
            Script {
                attributes: ATTRIBUTE
                    .captures_iter(attributes)
                    .filter_map(|attribute| {
                        let name = attribute.get(1)?.as_str().to_ascii_lowercase();
                        let value = attribute
                            .get(2)
                            .or_else(|| attribute.get(3))
                            .or_else(|| attribute.get(4))
                            .map_or("", |v| v.as_str());
                        Some((name, value.to_owned()))
                    })
                    .collect(),
                text: captures.get(2).map_or("", |t| t.as_str()).to_owned(),
            }
        })
        .collect()
}

/// Executes scripts contained in snippet updates.
#[derive(Default)]
pub struct ScriptLoader {
    loaded: Mutex<HashSet<String>>,
}

impl ScriptLoader {
    /// Create the loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute the scripts of `html`. Returns how many were inserted.
    pub fn load_scripts(&self, dom: &dyn Dom, html: &str) -> usize {
        let mut inserted = 0;
        for script in extract_scripts(html) {
            if let Some(id) = script.attribute(SCRIPT_ID_ATTRIBUTE) {
                let first = self
                    .loaded
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id.to_owned());
                if !first {
                    debug!(script_id = id, "script already executed, skipping");
                    continue;
                }
            }
            dom.insert_script(&script);
            inserted += 1;
        }
        inserted
    }
}

impl Extension for ScriptLoader {
    fn name(&self) -> &'static str {
        "scripts"
    }

    fn on_init(&self, naja: &Naja, _event: &mut Event<Init>) {
        let Some(snippets) = naja.extension::<SnippetHandler>() else {
            debug!("no snippet handler registered, scripts will not be loaded");
            return;
        };
        let weak = naja.downgrade();
        snippets.on::<AfterUpdate, _>(move |event| {
            let Some(naja) = weak.upgrade() else {
                return;
            };
            if let Some(loader) = naja.extension::<ScriptLoader>() {
                loader.load_scripts(naja.dom().as_ref(), &event.detail.content);
            }
        });
    }
}
