//! # Configuration
//!
//! [`NajaConfig`] collects the page-level settings of the built-in
//! extensions. It deserializes from the JSON object a page embeds, with
//! camelCase keys and every field optional:
//!
//! ```json
//! {
//!     "selector": ".ajax",
//!     "allowedOrigins": ["https://cdn.example.com"],
//!     "eventDelegation": false,
//!     "snippetPrefix": "snippet-",
//!     "historyUiCache": true,
//!     "defaultOptions": {"headers": {"X-Client": "naja"}}
//! }
//! ```

use naja_core::{Options, location};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`NajaConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The JSON could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// An `allowedOrigins` entry is not an http(s) origin.
    #[error("invalid allowed origin: {0}")]
    InvalidOrigin(String),
}

/// Page-level settings of the built-in extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NajaConfig {
    /// Selector suffix opting links and forms in; empty handles all of them.
    pub selector: String,
    /// Origins requests may target besides the current one.
    pub allowed_origins: Vec<String>,
    /// One window/document listener instead of per-element binding.
    pub event_delegation: bool,
    /// Id prefix of snippet elements.
    pub snippet_prefix: String,
    /// Whether history entries carry snippet snapshots.
    pub history_ui_cache: bool,
    /// Options every request starts from.
    pub default_options: Options,
}

impl Default for NajaConfig {
    fn default() -> Self {
        Self {
            selector: naja_std::ui::DEFAULT_SELECTOR.to_owned(),
            allowed_origins: Vec::new(),
            event_delegation: false,
            snippet_prefix: naja_std::snippet::DEFAULT_SNIPPET_PREFIX.to_owned(),
            history_ui_cache: true,
            default_options: Options::new(),
        }
    }
}

impl NajaConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: NajaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: NajaConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every allowed origin names an http(s) origin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self
            .allowed_origins
            .iter()
            .find(|origin| location::normalize_origin(origin).is_none())
        {
            Some(origin) => Err(ConfigError::InvalidOrigin(origin.clone())),
            None => Ok(()),
        }
    }
}
