//! Browser history contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State stored with each history entry Naja creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// URL of the entry.
    pub href: String,
    /// Document title at the time the entry was created.
    pub title: String,
    /// Snippet id to inner HTML; `None` when the snapshot is disabled.
    pub ui: Option<BTreeMap<String, String>>,
}

/// The host's session history.
pub trait HistoryApi: Send + Sync + 'static {
    /// Add an entry and make it current.
    fn push_state(&self, entry: HistoryEntry, title: &str, url: &str);

    /// Overwrite the current entry.
    fn replace_state(&self, entry: HistoryEntry, title: &str, url: &str);
}
