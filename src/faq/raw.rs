//! Deserialization boundary for FAQ source JSON.
//!
//! Every field is optional and loosely typed; the adapters here turn the
//! accepted shapes into plain values for [`super::dataset`].

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level FAQ document as stored on disk.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawFaqFile {
    #[serde(rename = "rootMessage")]
    pub root_message: Option<Value>,
    pub header: Option<Value>,
    #[serde(default)]
    pub categories: RawCategories,
    pub faqs: Option<Value>,
    pub images: Option<Value>,
}

impl RawFaqFile {
    /// Returns `None` when `raw` is not a JSON object.
    pub fn from_value(raw: &Value) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        Some(RawFaqFile::deserialize(raw).unwrap_or_default())
    }

    /// `rootMessage`, else `header`.
    pub fn header_source(&self) -> Option<&Value> {
        self.root_message
            .as_ref()
            .filter(|v| !v.is_null())
            .or(self.header.as_ref())
    }

    /// FAQ entries in source order; empty when `faqs` is not an object.
    pub fn faq_entries(&self) -> impl Iterator<Item = (&String, RawFaq)> {
        self.faqs
            .as_ref()
            .and_then(|v| v.as_object())
            .into_iter()
            .flat_map(|obj| obj.iter())
            .map(|(key, value)| (key, RawFaq::from_value(value)))
    }

    /// Image table entries with string values.
    pub fn image_entries(&self) -> impl Iterator<Item = (&String, &str)> {
        self.images
            .as_ref()
            .and_then(|v| v.as_object())
            .into_iter()
            .flat_map(|obj| obj.iter())
            .filter_map(|(name, url)| url.as_str().map(|u| (name, u)))
    }
}

/// The two accepted shapes of the `categories` block.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
pub(super) enum RawCategories {
    /// `[{ "id": .., "label": .. }, ..]`
    List(Vec<Value>),
    /// `{ "<id>": "<label>" | { "<lang>": "<label>" } }`
    Map(Map<String, Value>),
    #[default]
    Missing,
    /// Any other JSON value; logged and ignored
    Unsupported(Value),
}

/// One FAQ entry before normalization.
#[derive(Debug, Default, Deserialize)]
pub(super) struct RawFaq {
    #[serde(rename = "categoryId")]
    pub category_id: Option<Value>,
    pub category: Option<Value>,
    pub label: Option<Value>,
    pub labels: Option<Value>,
    pub content: Option<Value>,
}

impl RawFaq {
    fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return RawFaq::default();
        }
        RawFaq::deserialize(value).unwrap_or_default()
    }

    /// `categoryId`, else `category`, stringified.
    pub fn category_ref(&self) -> Option<String> {
        self.category_id
            .as_ref()
            .and_then(stringify)
            .or_else(|| self.category.as_ref().and_then(stringify))
    }

    /// `label`, else `labels[fallback]`.
    pub fn label(&self, fallback: &str) -> Option<String> {
        self.label
            .as_ref()
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.labels
                    .as_ref()
                    .and_then(|labels| labels.get(fallback))
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
            })
            .map(String::from)
    }
}

/// Scalar JSON values as text; containers and null have no text form.
pub(super) fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trim and lowercase an id; `None` when nothing is left.
pub(super) fn normalize_id(raw: &str) -> Option<String> {
    let id = raw.trim().to_lowercase();
    (!id.is_empty()).then_some(id)
}

/// Id and optional explicit label of a list-form category element.
pub(super) fn list_category(item: &Value) -> Option<(String, Option<String>)> {
    let Some(obj) = item.as_object() else {
        return stringify(item)
            .as_deref()
            .and_then(normalize_id)
            .map(|id| (id, None));
    };
    let id = ["id", "key", "label"]
        .iter()
        .filter_map(|field| obj.get(*field).and_then(stringify))
        .find(|candidate| !candidate.trim().is_empty())
        .as_deref()
        .and_then(normalize_id)?;
    let label = obj
        .get("label")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(String::from);
    Some((id, label))
}

/// Label of a map-form category value.
pub(super) fn map_category_label(value: &Value, fallback: &str) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get(fallback)
            .and_then(|v| v.as_str())
            .or_else(|| obj.values().find_map(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
            .map(String::from),
        _ => None,
    }
}
