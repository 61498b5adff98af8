//! Attribute-driven configuration.
//!
//! Elements opt in or out of behaviour through `data-naja-*` attributes (or
//! their legacy `data-ajax-*` spelling). [`Directives::parse`] is a pure
//! function of an attribute lookup, so interaction handling never reads the
//! DOM directly.

use crate::options::HistoryMode;

const PREFIX: &str = "data-naja-";
const LEGACY_PREFIX: &str = "data-ajax-";

/// How snippet content is merged into the existing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetOperation {
    /// Overwrite the inner HTML.
    #[default]
    Replace,
    /// Insert before the existing content.
    Prepend,
    /// Insert after the existing content.
    Append,
}

/// Behaviour flags read from an element's attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// `data-naja-abort`: `Some(false)` when set to `off`.
    pub abort: Option<bool>,
    /// `data-naja-unique`: `Some(None)` when set to `off`, `Some(Some(key))`
    /// for a named key.
    pub unique: Option<Option<String>>,
    /// `data-naja-history`.
    pub history: Option<HistoryMode>,
    /// `data-naja-history-nocache`: disables the snippet snapshot.
    pub history_ui_cache: Option<bool>,
    /// `data-naja-force-redirect`.
    pub force_redirect: Option<bool>,
    /// `data-naja-snippet-prepend` / `data-naja-snippet-append`.
    pub snippet_operation: Option<SnippetOperation>,
}

impl Directives {
    /// Read directives through `attribute`, which returns the value of the
    /// named attribute (an empty string for a bare attribute).
    pub fn parse<F>(attribute: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| {
            attribute(&format!("{PREFIX}{name}"))
                .or_else(|| attribute(&format!("{LEGACY_PREFIX}{name}")))
        };

        let abort = lookup("abort").map(|value| value != "off");
        let unique = lookup("unique").map(|value| match value.as_str() {
            "off" => None,
            "" | "on" => Some(crate::options::DEFAULT_UNIQUE_KEY.to_owned()),
            key => Some(key.to_owned()),
        });
        let history = lookup("history").map(|value| HistoryMode::from_attribute(&value));
        let history_ui_cache = lookup("history-nocache").map(|_| false);
        let force_redirect = lookup("force-redirect").map(|value| value != "off");

        let snippet_operation = if lookup("snippet-prepend").is_some()
            || attribute(&format!("{LEGACY_PREFIX}prepend")).is_some()
        {
            Some(SnippetOperation::Prepend)
        } else if lookup("snippet-append").is_some()
            || attribute(&format!("{LEGACY_PREFIX}append")).is_some()
        {
            Some(SnippetOperation::Append)
        } else {
            None
        };

        Self {
            abort,
            unique,
            history,
            history_ui_cache,
            force_redirect,
            snippet_operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(attrs: &[(&str, &str)]) -> Directives {
        let attrs: HashMap<String, String> = attrs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Directives::parse(|name| attrs.get(name).cloned())
    }

    #[test]
    fn test_empty_element_has_no_directives() {
        assert_eq!(parse(&[]), Directives::default());
    }

    #[test]
    fn test_naja_prefix() {
        let d = parse(&[
            ("data-naja-abort", "off"),
            ("data-naja-unique", "search"),
            ("data-naja-history", "replace"),
            ("data-naja-history-nocache", ""),
        ]);
        assert_eq!(d.abort, Some(false));
        assert_eq!(d.unique, Some(Some("search".into())));
        assert_eq!(d.history, Some(HistoryMode::Replace));
        assert_eq!(d.history_ui_cache, Some(false));
    }

    #[test]
    fn test_legacy_prefix_and_snippet_modes() {
        let d = parse(&[("data-ajax-unique", "off"), ("data-ajax-append", "")]);
        assert_eq!(d.unique, Some(None));
        assert_eq!(d.snippet_operation, Some(SnippetOperation::Append));

        let d = parse(&[("data-naja-snippet-prepend", "")]);
        assert_eq!(d.snippet_operation, Some(SnippetOperation::Prepend));
    }

    #[test]
    fn test_naja_prefix_wins_over_legacy() {
        let d = parse(&[("data-naja-history", "off"), ("data-ajax-history", "replace")]);
        assert_eq!(d.history, Some(HistoryMode::Off));
    }
}
