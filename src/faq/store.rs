use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::content::{parse_content, ContentSegment};
use super::dataset::{Category, FaqDataset};
use super::lang::resolve;
use super::{FaqError, LABEL_LIMIT};

/// Supplies raw FAQ JSON.
pub trait FaqSource: Send + Sync {
    fn load(&self) -> Result<Value, FaqError>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// FAQ JSON stored in a file on disk.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with pretty-printed `value`, creating parent dirs.
    pub fn write(&self, value: &Value) -> Result<(), FaqError> {
        let write_err = |source| FaqError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let serialized = serde_json::to_string_pretty(value)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        fs::write(&self.path, serialized).map_err(write_err)
    }
}

impl FaqSource for JsonFileSource {
    fn load(&self) -> Result<Value, FaqError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            FaqError::SourceUnavailable {
                path: self.path.clone(),
                source,
            }
        })?;
        serde_json::from_str(&content).map_err(|source| FaqError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Accept uploaded JSON as replacement FAQ data only if it carries a
/// non-empty `faqs` object.
pub fn validate_import(value: &Value) -> Result<(), FaqError> {
    let Some(obj) = value.as_object() else {
        return Err(FaqError::InvalidImport(
            "top-level value must be a JSON object".to_string(),
        ));
    };
    match obj.get("faqs").and_then(|v| v.as_object()) {
        Some(faqs) if !faqs.is_empty() => Ok(()),
        Some(_) => Err(FaqError::InvalidImport("\"faqs\" is empty".to_string())),
        None => Err(FaqError::InvalidImport(
            "missing \"faqs\" object".to_string(),
        )),
    }
}

/// Menu entry for one FAQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqChoice {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaqStats {
    pub categories: usize,
    pub faqs: usize,
}

/// Cached access to the current [`FaqDataset`].
///
/// The dataset is loaded on first use and replaced as a whole on
/// [`FaqStore::reload`]. A failed reload keeps the previous dataset.
pub struct FaqStore {
    source: Box<dyn FaqSource>,
    fallback_lang: String,
    current: Option<Arc<FaqDataset>>,
    attempted: bool,
}

impl FaqStore {
    pub fn with_fallback(source: Box<dyn FaqSource>, fallback_lang: &str) -> Self {
        FaqStore {
            source,
            fallback_lang: fallback_lang.to_string(),
            current: None,
            attempted: false,
        }
    }

    pub fn fallback_lang(&self) -> &str {
        &self.fallback_lang
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Re-read and re-normalize the source.
    pub fn reload(&mut self) -> Result<Arc<FaqDataset>, FaqError> {
        self.attempted = true;
        match self.source.load() {
            Ok(raw) => {
                let dataset = Arc::new(FaqDataset::normalize(
                    &raw,
                    &self.fallback_lang,
                ));
                tracing::info!(
                    source = %self.source.describe(),
                    categories = dataset.categories.len(),
                    faqs = dataset.faqs.len(),
                    "FAQ dataset loaded"
                );
                self.current = Some(dataset.clone());
                Ok(dataset)
            }
            Err(e) => {
                tracing::warn!(error = %e, kept_previous = self.current.is_some(), "FAQ reload failed");
                Err(e)
            }
        }
    }

    /// Current dataset, loading it on first use. `None` when the source has
    /// never loaded successfully.
    pub fn dataset(&mut self) -> Option<Arc<FaqDataset>> {
        if self.current.is_none() && !self.attempted {
            let _ = self.reload();
        }
        self.current.clone()
    }

    /// Text for `key` in `lang`, else in the fallback language.
    pub fn content(&mut self, key: &str, lang: &str) -> Option<String> {
        let dataset = self.dataset()?;
        let entry = dataset.faq(key)?;
        Some(
            resolve(&entry.content, lang, dataset.fallback_lang())
                .unwrap_or_default()
                .to_string(),
        )
    }

    /// Content of `key` parsed into display segments.
    pub fn segments(&mut self, key: &str, lang: &str) -> Option<Vec<ContentSegment>> {
        let dataset = self.dataset()?;
        let text = self.content(key, lang)?;
        Some(parse_content(&text, &dataset.images))
    }

    /// Displayable FAQs of a category, in source order.
    pub fn by_category(&mut self, category_id: &str) -> Vec<FaqChoice> {
        let Some(dataset) = self.dataset() else {
            return Vec::new();
        };
        let wanted = category_id.trim().to_lowercase();
        dataset
            .faqs
            .iter()
            .filter(|entry| entry.category_id == wanted)
            .filter(|entry| entry.content.has_text())
            .filter(|entry| !entry.label.trim().is_empty())
            .map(|entry| FaqChoice {
                key: entry.key.clone(),
                label: truncate_label(&entry.label),
            })
            .collect()
    }

    pub fn exists(&mut self, key: &str) -> bool {
        self.dataset()
            .map(|dataset| dataset.faq(key).is_some())
            .unwrap_or(false)
    }

    pub fn header(&mut self, lang: &str) -> String {
        self.dataset()
            .and_then(|dataset| {
                resolve(&dataset.root_message, lang, dataset.fallback_lang()).map(String::from)
            })
            .unwrap_or_default()
    }

    /// Languages of the root header, in source order.
    pub fn available_languages(&mut self) -> Vec<String> {
        self.dataset()
            .map(|dataset| dataset.root_message.languages().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn categories(&mut self) -> Vec<Category> {
        self.dataset()
            .map(|dataset| dataset.categories.clone())
            .unwrap_or_default()
    }

    pub fn category_label(&mut self, category_id: &str) -> Option<String> {
        let dataset = self.dataset()?;
        dataset
            .category(category_id)
            .map(|category| truncate_label(&category.label))
    }

    pub fn faq_label(&mut self, key: &str) -> Option<String> {
        let dataset = self.dataset()?;
        dataset.faq(key).map(|entry| truncate_label(&entry.label))
    }

    pub fn stats(&mut self) -> Option<FaqStats> {
        self.dataset().map(|dataset| FaqStats {
            categories: dataset.categories.len(),
            faqs: dataset.faqs.len(),
        })
    }
}

/// Cut a label to [`LABEL_LIMIT`] characters.
pub(crate) fn truncate_label(label: &str) -> String {
    label.chars().take(LABEL_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::DEFAULT_FALLBACK_LANG;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory source whose value can be swapped between loads.
    struct MemorySource(Arc<Mutex<Option<Value>>>);

    impl FaqSource for MemorySource {
        fn load(&self) -> Result<Value, FaqError> {
            let guard = match self.0.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone().ok_or_else(|| FaqError::SourceUnavailable {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "empty"),
            })
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn store_with(value: Option<Value>) -> (FaqStore, Arc<Mutex<Option<Value>>>) {
        let cell = Arc::new(Mutex::new(value));
        (
            FaqStore::with_fallback(Box::new(MemorySource(cell.clone())), DEFAULT_FALLBACK_LANG),
            cell,
        )
    }

    #[test]
    fn test_content_language_fallback() {
        let (mut store, _) =
            store_with(Some(json!({"faqs": {"key": {"content": {"en": "x", "pt": "y"}}}})));
        assert_eq!(store.content("key", "pt").as_deref(), Some("y"));
        assert_eq!(store.content("key", "klingon").as_deref(), Some("x"));
        assert_eq!(store.content("missing", "en"), None);
        assert!(store.exists("key"));
        assert!(!store.exists("missing"));
    }

    #[test]
    fn test_by_category_filters_and_orders() {
        let (mut store, _) = store_with(Some(json!({
            "faqs": {
                "b": {"categoryId": "Help", "label": "B", "content": {"en": "text"}},
                "blank": {"categoryId": "help", "label": "Blank", "content": {"en": "  "}},
                "other": {"categoryId": "misc", "label": "Other", "content": {"en": "t"}},
                "a": {"categoryId": "help", "label": "A", "content": {"pt": "só pt"}}
            }
        })));
        let keys: Vec<String> = store.by_category("HELP").into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        assert!(store.by_category("missing").is_empty());
    }

    #[test]
    fn test_by_category_truncates_labels() {
        let long = "é".repeat(150);
        let (mut store, _) = store_with(Some(json!({
            "faqs": {"k": {"label": long, "content": {"en": "x"}}}
        })));
        let choices = store.by_category("general");
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].label.chars().count(), 100);
    }

    #[test]
    fn test_header_and_languages() {
        let (mut store, _) = store_with(Some(json!({
            "rootMessage": {"pt": "Olá", "en": "Hello", "es": ""}
        })));
        assert_eq!(store.header("pt"), "Olá");
        assert_eq!(store.header("es"), "Hello");
        assert_eq!(store.header("fr"), "Hello");
        assert_eq!(store.available_languages(), vec!["pt", "en", "es"]);
    }

    #[test]
    fn test_unavailable_source_renders_nothing() {
        let (mut store, _) = store_with(None);
        assert!(store.dataset().is_none());
        assert_eq!(store.header("en"), "");
        assert!(store.by_category("general").is_empty());
        assert!(store.available_languages().is_empty());
        assert_eq!(store.content("k", "en"), None);
    }

    #[test]
    fn test_failed_reload_keeps_previous_dataset() {
        let (mut store, cell) = store_with(Some(json!({"faqs": {"k": {"content": {"en": "x"}}}})));
        assert!(store.exists("k"));

        *cell.lock().unwrap() = None;
        assert!(store.reload().is_err());
        assert!(store.exists("k"));

        *cell.lock().unwrap() = Some(json!({"faqs": {"n": {"content": {"en": "y"}}}}));
        store.reload().unwrap();
        assert!(!store.exists("k"));
        assert!(store.exists("n"));
    }

    #[test]
    fn test_reload_twice_structurally_equal() {
        let (mut store, _) = store_with(Some(json!({
            "categories": {"a": "A"},
            "faqs": {"k": {"categoryId": "a", "content": {"en": "x"}}}
        })));
        let first = store.reload().unwrap();
        let second = store.reload().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_segments_use_image_table() {
        let (mut store, _) = store_with(Some(json!({
            "images": {"cat.png": "https://cdn/cat.png"},
            "faqs": {"k": {"content": {"en": "See [file:cat.png]"}}}
        })));
        let segments = store.segments("k", "en").unwrap();
        assert_eq!(segments.len(), 2);
        assert!(matches!(&segments[1], ContentSegment::File { url, .. } if url == "https://cdn/cat.png"));
    }

    #[test]
    fn test_json_file_source_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path().join("nested").join("faq.json"));
        assert!(matches!(source.load(), Err(FaqError::SourceUnavailable { .. })));

        source.write(&json!({"faqs": {"k": {"content": {"en": "x"}}}})).unwrap();
        let mut store = FaqStore::with_fallback(
            Box::new(JsonFileSource::new(source.path())),
            DEFAULT_FALLBACK_LANG,
        );
        assert_eq!(store.content("k", "en").as_deref(), Some("x"));

        fs::write(source.path(), "{ not json").unwrap();
        assert!(matches!(store.reload(), Err(FaqError::Malformed { .. })));
        assert!(store.exists("k"));
    }

    #[test]
    fn test_validate_import() {
        assert!(validate_import(&json!({"faqs": {"k": {}}})).is_ok());
        assert!(validate_import(&json!({"faqs": {}})).is_err());
        assert!(validate_import(&json!({"faqs": ["k"]})).is_err());
        assert!(validate_import(&json!({"categories": []})).is_err());
        assert!(validate_import(&json!([1])).is_err());
    }
}
