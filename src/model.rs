//! Records, document handles and batch summaries.

use chrono::{DateTime, Utc};
use crate::pipeline::markup::collapse_whitespace;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to a generated PDF held by a [`crate::store::DocumentStore`].
///
/// A handle stays resolvable exactly as long as the record owning it exists;
/// deleting the record releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(Uuid);

impl DocumentHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One imported recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRecord {
    /// Generated at import, never changes.
    pub id: Uuid,
    pub title: String,
    pub category: String,
    /// Import time, never changes.
    pub created: DateTime<Utc>,
    pub document: DocumentHandle,
    /// At most three block elements of sanitized markup.
    pub preview_fragment: String,
    /// Lower-cased, whitespace-collapsed `title + " " + source_text`.
    pub searchable_text: String,
    /// Text extracted by the converter; kept so edits can rebuild
    /// `searchable_text` without accumulating old titles.
    #[serde(default)]
    pub source_text: String,
}

impl RecipeRecord {
    /// Build a fresh record with a new id and the current timestamp.
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        document: DocumentHandle,
        preview_fragment: impl Into<String>,
        source_text: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let source_text = source_text.into();
        Self {
            id: Uuid::new_v4(),
            searchable_text: searchable_text(&title, &source_text),
            title,
            category: category.into(),
            created: Utc::now(),
            document,
            preview_fragment: preview_fragment.into(),
            source_text,
        }
    }

    /// Recompute `searchable_text` after `title` or `source_text` changed.
    pub fn refresh_search_text(&mut self) {
        self.searchable_text = searchable_text(&self.title, &self.source_text);
    }

    /// True when the record passes a category filter and a search term.
    ///
    /// An empty term matches everything; otherwise the lower-cased term must
    /// be a substring of `searchable_text`.
    pub fn matches(&self, filter: &CategoryFilter, term: &str) -> bool {
        let ok_cat = match filter {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => &self.category == c,
        };
        let term = term.trim().to_lowercase();
        ok_cat && (term.is_empty() || self.searchable_text.contains(&term))
    }
}

/// Lower-case and collapse whitespace of `title + " " + text`.
pub fn searchable_text(title: &str, text: &str) -> String {
    let joined = format!("{title} {text}").to_lowercase();
    collapse_whitespace(&joined)
}

/// Category selector for gallery filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// Every category. (default)
    #[default]
    All,
    /// Exactly this category.
    Only(String),
}

impl CategoryFilter {
    /// `"All"` (any case) or an empty string selects everything.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(s.to_string())
        }
    }
}

/// Outcome counts for an import or sync batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
