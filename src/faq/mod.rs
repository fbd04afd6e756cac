//! FAQ model, normalization and content rendering.
//!
//! Raw FAQ JSON may come in several loose shapes. It is normalized once into a
//! [`FaqDataset`] which the [`FaqStore`] caches and serves; FAQ bodies are
//! turned into display segments by [`parse_content`] at render time.

mod content;
mod dataset;
mod lang;
mod raw;
mod store;

use std::path::PathBuf;

pub use content::{ContentSegment, MediaKind};
pub use dataset::Category;
pub use lang::DEFAULT_FALLBACK_LANG;
pub(crate) use store::truncate_label;
pub use store::{validate_import, FaqChoice, FaqStore, JsonFileSource};

/// Maximum label length handed to menus.
pub const LABEL_LIMIT: usize = 100;

/// Errors raised while loading or replacing FAQ source data.
///
/// Shape problems inside otherwise valid JSON never surface here; they are
/// normalized away.
#[derive(Debug, thiserror::Error)]
pub enum FaqError {
    /// Backing file missing or unreadable
    #[error("FAQ source unavailable at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not valid JSON
    #[error("FAQ source at {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Uploaded replacement data was rejected
    #[error("invalid FAQ import: {0}")]
    InvalidImport(String),

    /// Replacement data could not be written
    #[error("failed to write FAQ source {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
