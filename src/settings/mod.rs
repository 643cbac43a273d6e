//! Settings merged from the global file, the project file and call-site
//! overrides.
//!
//! [`Settings`] is a flat JSON object. [`schema`] decides which file each
//! field belongs to and which overrides beat on-disk data;
//! [`SettingsStore`] does the file I/O.

pub mod schema;
mod store;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use schema::{OverrideRule, Placement};

pub use store::{
    LoadOutcome, SettingsPaths, SettingsStore, GLOBAL_FILE_NAME, PROJECT_FILE_NAME,
};

/// Fallback platform URL when neither the files nor the overrides set one.
pub const DEFAULT_URL: &str = "https://api.cloud.dropstack.run";

/// A flat mapping of setting names to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the value under `key` if it is a non-empty string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn username(&self) -> Option<&str> {
        self.get_str("username")
    }

    pub fn token(&self) -> Option<&str> {
        self.get_str("token")
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str("url")
    }

    /// Copies every entry of `other` over this one, replacing existing keys.
    pub fn extend(&mut self, other: Map<String, Value>) {
        self.0.extend(other);
    }

    /// Joins an array-valued `variables` into a comma-separated string.
    pub fn normalize_variables(&mut self) {
        if let Some(Value::Array(items)) = self.0.get("variables") {
            let joined = join_values(items);
            self.0.insert("variables".into(), Value::String(joined));
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The entries belonging to `placement`, with `variables` normalized.
    pub fn projection(&self, placement: Placement) -> Map<String, Value> {
        let mut normalized = self.clone();
        normalized.normalize_variables();
        normalized
            .0
            .into_iter()
            .filter(|(key, _)| schema::placement(key) == placement)
            .collect()
    }
}

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Settings(map)
    }
}

fn join_values(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether an override counts as set: null, false, 0 and "" do not.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Combines overrides with the contents of both settings files.
///
/// The overrides are the base; global then project entries are copied over
/// them, each file only contributing fields the schema places in it. Fields
/// with an override rule are then reasserted from the overrides, and a
/// missing `url` falls back to [`DEFAULT_URL`].
pub fn merge_layers(
    overrides: &Settings,
    global: Option<&Map<String, Value>>,
    project: Option<&Map<String, Value>>,
) -> Settings {
    let mut merged = overrides.clone();

    for (layer, placement) in [(global, Placement::Global), (project, Placement::Project)] {
        let Some(layer) = layer else { continue };
        for (key, value) in layer {
            if schema::placement(key) == placement {
                merged.0.insert(key.clone(), value.clone());
            } else {
                tracing::debug!(field = %key, ?placement, "ignoring field stored in the wrong settings file");
            }
        }
    }

    merged.normalize_variables();
    let mut overrides = overrides.clone();
    overrides.normalize_variables();

    for field in schema::reasserted() {
        let Some(value) = overrides.get(field.name) else {
            continue;
        };
        let wins = match field.rule {
            OverrideRule::OverrideWins => is_truthy(value),
            OverrideRule::OverrideWinsIfNonEmpty => is_non_empty(value),
            OverrideRule::FileWins => false,
        };
        if wins {
            merged.0.insert(field.name.to_string(), value.clone());
        }
    }

    if !merged.get("url").is_some_and(is_truthy) {
        merged.insert("url", DEFAULT_URL);
    }

    merged
}
