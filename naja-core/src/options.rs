//! Per-request options.
//!
//! Options are a JSON object built fresh for each interaction. Extensions read
//! and write them during `interaction` and `before`; once `start` fires the
//! dispatcher freezes them behind an `Arc` inside the [`Request`].
//!
//! [`Request`]: crate::Request

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Key of the history mode option.
pub const HISTORY: &str = "history";
/// Key of the per-request history snapshot toggle.
pub const HISTORY_UI_CACHE: &str = "historyUiCache";
/// Key of the unique request option.
pub const UNIQUE: &str = "unique";
/// Key of the abortable option.
pub const ABORT: &str = "abort";
/// Key of the forced redirect option.
pub const FORCE_REDIRECT: &str = "forceRedirect";
/// Key of the transport timeout in milliseconds.
pub const TIMEOUT: &str = "timeout";
/// Key of the number of transport attempts.
pub const ATTEMPTS: &str = "attempts";
/// Key of the extra request headers mapping.
pub const HEADERS: &str = "headers";

/// Unique key shared by requests that do not name one.
pub const DEFAULT_UNIQUE_KEY: &str = "default request";

/// How a successful request is recorded in the browser history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Push a new entry.
    #[default]
    Push,
    /// Replace the current entry.
    Replace,
    /// Leave the history untouched.
    Off,
}

impl HistoryMode {
    /// Normalise an option or attribute value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(false) => HistoryMode::Off,
            Value::String(mode) => Self::from_attribute(mode),
            _ => HistoryMode::Push,
        }
    }

    /// Normalise a `data-naja-history` attribute value.
    pub fn from_attribute(mode: &str) -> Self {
        match mode {
            "off" | "false" => HistoryMode::Off,
            "replace" => HistoryMode::Replace,
            _ => HistoryMode::Push,
        }
    }

    /// JSON representation stored in [`Options`].
    pub fn to_value(self) -> Value {
        match self {
            HistoryMode::Push => Value::Bool(true),
            HistoryMode::Replace => Value::String("replace".into()),
            HistoryMode::Off => Value::Bool(false),
        }
    }
}

/// A mutable mapping from option names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// An empty option set.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether `key` was set explicitly.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or overwrite `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Insert `key` only if it was not set explicitly.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Remove `key`.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Merge `overrides` over `defaults`.
    ///
    /// Keys are merged shallowly. When both sides hold a JSON object under the
    /// same key, the two objects are merged one level deep with the keys of
    /// `overrides` taking precedence.
    pub fn merge(defaults: &Options, overrides: Options) -> Options {
        let mut merged = defaults.0.clone();
        for (key, value) in overrides.0 {
            let value = match (merged.get_mut(&key), value) {
                (Some(Value::Object(base)), Value::Object(nested)) => {
                    base.extend(nested);
                    continue;
                }
                (_, value) => value,
            };
            merged.insert(key, value);
        }
        Options(merged)
    }

    /// History mode, [`HistoryMode::Push`] unless disabled.
    pub fn history(&self) -> HistoryMode {
        self.get(HISTORY)
            .map_or(HistoryMode::Push, HistoryMode::from_value)
    }

    /// Per-request override of the history snapshot toggle.
    pub fn history_ui_cache(&self) -> Option<bool> {
        self.get(HISTORY_UI_CACHE).and_then(Value::as_bool)
    }

    /// Unique key of the request; `None` disables uniqueness.
    pub fn unique(&self) -> Option<String> {
        match self.get(UNIQUE) {
            None | Some(Value::Bool(true)) | Some(Value::Null) => Some(DEFAULT_UNIQUE_KEY.into()),
            Some(Value::Bool(false)) => None,
            Some(Value::String(key)) if key == "off" => None,
            Some(Value::String(key)) => Some(key.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Whether the user may abort the request, `true` unless disabled.
    pub fn abort(&self) -> bool {
        !matches!(self.get(ABORT), Some(Value::Bool(false)))
    }

    /// Whether a redirect must be a full page load.
    pub fn force_redirect(&self) -> bool {
        matches!(self.get(FORCE_REDIRECT), Some(Value::Bool(true)))
    }

    /// Transport timeout.
    ///
    /// The limit is timed with `tokio::time`, so it only applies when the
    /// request is polled inside a Tokio runtime with the time driver enabled.
    /// Under any other executor the request runs without a limit and a
    /// warning is logged.
    pub fn timeout(&self) -> Option<Duration> {
        self.get(TIMEOUT)
            .and_then(Value::as_u64)
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Number of transport attempts, at least one.
    pub fn attempts(&self) -> u32 {
        self.get(ATTEMPTS)
            .and_then(Value::as_u64)
            .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX).max(1))
    }

    /// Extra request headers.
    pub fn headers(&self) -> Vec<(String, String)> {
        let Some(Value::Object(headers)) = self.get(HEADERS) else {
            return Vec::new();
        };
        headers
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_owned())))
            .collect()
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Options(map)
    }
}

impl FromIterator<(String, Value)> for Options {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Options(iter.into_iter().collect())
    }
}
