//! Response body contract.

use crate::{directives::SnippetOperation, error::NajaError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// New content for one snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnippetContent {
    /// Plain HTML; the operation is taken from the element's attributes.
    Html(String),
    /// HTML with an explicit operation overriding the element's attributes.
    Structured {
        /// The HTML fragment.
        content: String,
        /// How to merge the fragment.
        #[serde(default)]
        operation: Option<SnippetOperation>,
    },
}

impl SnippetContent {
    /// The HTML fragment.
    pub fn html(&self) -> &str {
        match self {
            SnippetContent::Html(html) => html,
            SnippetContent::Structured { content, .. } => content,
        }
    }

    /// The explicit operation, if any.
    pub fn operation(&self) -> Option<SnippetOperation> {
        match self {
            SnippetContent::Html(_) => None,
            SnippetContent::Structured { operation, .. } => *operation,
        }
    }
}

impl From<&str> for SnippetContent {
    fn from(html: &str) -> Self {
        SnippetContent::Html(html.to_owned())
    }
}

impl From<String> for SnippetContent {
    fn from(html: String) -> Self {
        SnippetContent::Html(html)
    }
}

/// Parsed server response.
///
/// Unknown keys are kept in [`Payload::extra`] for application listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Snippet id to new content.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub snippets: BTreeMap<String, SnippetContent>,
    /// Redirect target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Force the redirect to be a full page load.
    #[serde(default)]
    pub force_redirect: bool,
    /// The response follows a POST/redirect/GET cycle.
    #[serde(default)]
    pub post_get: bool,
    /// Canonical URL after a POST/redirect/GET cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Any other keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    /// Parse a response body. An empty body is an empty payload.
    pub fn parse(body: &str) -> Result<Self, NajaError> {
        let body = body.trim();
        if body.is_empty() {
            return Ok(Payload::default());
        }
        Ok(serde_json::from_str(body)?)
    }

    /// Builder-style snippet insert.
    pub fn with_snippet(mut self, id: impl Into<String>, content: impl Into<SnippetContent>) -> Self {
        self.snippets.insert(id.into(), content.into());
        self
    }

    /// Whether the payload carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self == &Payload::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let payload = Payload::parse(
            r#"{
                "snippets": {
                    "snippet--main": "<p>Hi</p>",
                    "snippet--log": {"content": "<li>x</li>", "operation": "append"}
                },
                "redirect": "/next",
                "forceRedirect": true,
                "postGet": true,
                "url": "/canonical",
                "flash": "saved"
            }"#,
        )
        .unwrap();

        assert_eq!(payload.snippets["snippet--main"].html(), "<p>Hi</p>");
        assert_eq!(payload.snippets["snippet--main"].operation(), None);
        assert_eq!(
            payload.snippets["snippet--log"].operation(),
            Some(SnippetOperation::Append)
        );
        assert_eq!(payload.redirect.as_deref(), Some("/next"));
        assert!(payload.force_redirect);
        assert!(payload.post_get);
        assert_eq!(payload.url.as_deref(), Some("/canonical"));
        assert_eq!(payload.extra["flash"], "saved");
    }

    #[test]
    fn test_empty_body_is_empty_payload() {
        assert!(Payload::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_body_is_invalid_payload() {
        assert!(matches!(
            Payload::parse("<html>"),
            Err(NajaError::InvalidPayload(_))
        ));
    }
}
