use serde::Serialize;
use serde_json::Value;

/// Language used when a requested translation is missing.
pub const DEFAULT_FALLBACK_LANG: &str = "en";

/// Language code -> text, in source order.
///
/// Always holds the fallback key it was normalized with, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageMap {
    entries: Vec<(String, String)>,
}

impl LanguageMap {
    /// Copy every string-valued entry of `source`, dropping everything else.
    ///
    /// A non-object source yields `{ fallback: "" }`. Language codes keep their
    /// original casing.
    pub fn normalize(source: Option<&Value>, fallback: &str) -> Self {
        let mut map = LanguageMap::default();
        if let Some(obj) = source.and_then(|v| v.as_object()) {
            for (lang, value) in obj {
                if let Some(text) = value.as_str() {
                    map.insert(lang, text);
                }
            }
        }
        if map.get(fallback).is_none() {
            map.insert(fallback, "");
        }
        map
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(code, _)| code == lang)
            .map(|(_, text)| text.as_str())
    }

    /// Insert or overwrite, keeping the first position of an existing key.
    pub fn insert(&mut self, lang: &str, text: &str) {
        match self.entries.iter_mut().find(|(code, _)| code == lang) {
            Some((_, existing)) => *existing = text.to_string(),
            None => self.entries.push((lang.to_string(), text.to_string())),
        }
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    /// True when at least one translation has visible text.
    pub fn has_text(&self) -> bool {
        self.entries.iter().any(|(_, text)| !text.trim().is_empty())
    }
}

impl Serialize for LanguageMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (lang, text) in &self.entries {
            map.serialize_entry(lang, text)?;
        }
        map.end()
    }
}

/// Pick the text for `lang`, falling back to `fallback`.
///
/// Precedence: non-empty `lang` value, then non-empty `fallback` value, then
/// `None`.
pub fn resolve<'a>(map: &'a LanguageMap, lang: &str, fallback: &str) -> Option<&'a str> {
    map.get(lang)
        .filter(|text| !text.is_empty())
        .or_else(|| map.get(fallback).filter(|text| !text.is_empty()))
}
