use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use super::lang::LanguageMap;
use super::raw::{self, RawCategories, RawFaqFile};

pub const DEFAULT_CATEGORY_ID: &str = "general";
pub const DEFAULT_CATEGORY_LABEL: &str = "General";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaqEntry {
    pub key: String,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    pub label: String,
    pub content: LanguageMap,
}

/// Normalized FAQ data. Built fresh on every load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaqDataset {
    #[serde(rename = "rootMessage")]
    pub root_message: LanguageMap,
    pub categories: Vec<Category>,
    #[serde(serialize_with = "serialize_faqs")]
    pub faqs: Vec<FaqEntry>,
    #[serde(serialize_with = "serialize_images")]
    pub images: Vec<(String, String)>,
    #[serde(skip)]
    fallback_lang: String,
}

impl FaqDataset {
    /// Dataset used when the source holds nothing usable.
    pub fn empty(fallback: &str) -> Self {
        FaqDataset {
            root_message: LanguageMap::normalize(None, fallback),
            categories: vec![default_category()],
            faqs: Vec::new(),
            images: Vec::new(),
            fallback_lang: fallback.to_string(),
        }
    }

    /// Build a dataset from arbitrary JSON. Never fails; unusable parts are
    /// dropped and defaults synthesized. `fallback` is the language every
    /// language map is guaranteed to contain.
    pub fn normalize(raw: &Value, fallback: &str) -> Self {
        let Some(file) = RawFaqFile::from_value(raw) else {
            return Self::empty(fallback);
        };

        let root_message = LanguageMap::normalize(file.header_source(), fallback);

        let mut seen: HashSet<String> = HashSet::new();
        let mut categories: Vec<Category> = Vec::new();
        let mut push_category = |id: String, label: String, categories: &mut Vec<Category>| {
            if seen.insert(id.clone()) {
                categories.push(Category { id, label });
            }
        };

        match &file.categories {
            RawCategories::List(items) => {
                for (id, label) in items.iter().filter_map(raw::list_category) {
                    let label = label.unwrap_or_else(|| id.clone());
                    push_category(id, label, &mut categories);
                }
            }
            RawCategories::Map(entries) => {
                for (key, value) in entries {
                    let Some(id) = raw::normalize_id(key) else {
                        continue;
                    };
                    let label =
                        raw::map_category_label(value, fallback).unwrap_or_else(|| id.clone());
                    push_category(id, label, &mut categories);
                }
            }
            RawCategories::Unsupported(other) => {
                tracing::warn!(categories = %other, "categories must be a list or an object; ignored");
            }
            RawCategories::Missing => {}
        }

        let mut faqs: Vec<FaqEntry> = Vec::new();
        for (key, faq) in file.faq_entries() {
            let category_id = faq
                .category_ref()
                .as_deref()
                .and_then(raw::normalize_id)
                .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string());
            push_category(category_id.clone(), category_id.clone(), &mut categories);

            let entry = FaqEntry {
                key: key.clone(),
                category_id,
                label: faq.label(fallback).unwrap_or_else(|| key.clone()),
                content: LanguageMap::normalize(faq.content.as_ref(), fallback),
            };
            // Keys are unique in a JSON object; a repeated key replaces in place.
            match faqs.iter_mut().find(|existing| existing.key == entry.key) {
                Some(existing) => *existing = entry,
                None => faqs.push(entry),
            }
        }

        if categories.is_empty() {
            categories.push(default_category());
        }

        let images = file
            .image_entries()
            .map(|(name, url)| (name.clone(), url.to_string()))
            .collect();

        FaqDataset {
            root_message,
            categories,
            faqs,
            images,
            fallback_lang: fallback.to_string(),
        }
    }

    pub fn fallback_lang(&self) -> &str {
        &self.fallback_lang
    }

    pub fn faq(&self, key: &str) -> Option<&FaqEntry> {
        self.faqs.iter().find(|entry| entry.key == key)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }
}

fn default_category() -> Category {
    Category {
        id: DEFAULT_CATEGORY_ID.to_string(),
        label: DEFAULT_CATEGORY_LABEL.to_string(),
    }
}

fn serialize_faqs<S: serde::Serializer>(faqs: &[FaqEntry], serializer: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(faqs.len()))?;
    for entry in faqs {
        map.serialize_entry(&entry.key, entry)?;
    }
    map.end()
}

fn serialize_images<S: serde::Serializer>(
    images: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(images.len()))?;
    for (name, url) in images {
        map.serialize_entry(name, url)?;
    }
    map.end()
}
