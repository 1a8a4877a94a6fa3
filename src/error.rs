//! Error types for the recipebox library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RecipeError`] is **fatal**: the batch cannot start at all (nothing
//!   importable was selected, no sync folder was chosen, bad configuration).
//!   Returned as `Err(RecipeError)` from the batch entry points before any
//!   work is done.
//!
//! * [`ItemError`] is **non-fatal**: a single file failed to convert or a
//!   single record failed to write. The worker that hit it logs it, counts it
//!   in the [`crate::model::BatchSummary`] and moves on to the next item.
//!
//! A conversion failure never produces a record, so no catalog entry can
//! ever point at a document that does not exist.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// All fatal errors returned by the recipebox library.
///
/// Per-item failures use [`ItemError`] and are counted rather than
/// propagated here.
#[derive(Debug, Error)]
pub enum RecipeError {
    // ── Batch preconditions ───────────────────────────────────────────────
    /// The selection contained no file with a supported extension.
    #[error(
        "No supported files found in your selection.\n\
Supported extensions: txt, md, docx, pdf, png, jpg, jpeg, gif, webp"
    )]
    EmptySelection,

    /// A sync was requested without a library folder.
    #[error("No library folder selected.\nChoose one with --to <DIR>.")]
    NoTarget,

    /// The folder given as sync target does not exist or is not a directory.
    #[error("Library folder '{path}' is not an accessible directory")]
    TargetUnavailable { path: PathBuf },

    // ── Catalog errors ────────────────────────────────────────────────────
    /// No record with this id exists in the catalog.
    #[error("No recipe with id {id}")]
    RecordNotFound { id: Uuid },

    /// The document store could not be opened or written.
    #[error("Document store error: {detail}")]
    Store { detail: String },

    /// Rasterising or assembling a PDF failed outside any per-file batch.
    #[error("Rendering failed: {detail}")]
    Render { detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file or record.
///
/// Produced inside the import and sync workers, logged, and turned into a
/// failure count. Never aborts sibling work in the same batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// A file could not be read or converted into a document.
    #[error("Failed to convert '{file}': {detail}")]
    Conversion { file: String, detail: String },

    /// A record's document could not be written to the library folder.
    #[error("Failed to write '{title}': {detail}")]
    Write { title: String, detail: String },
}

impl ItemError {
    pub(crate) fn conversion(file: impl Into<String>, detail: impl ToString) -> Self {
        ItemError::Conversion {
            file: file.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn write(title: impl Into<String>, detail: impl ToString) -> Self {
        ItemError::Write {
            title: title.into(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_error_names_the_file() {
        let e = ItemError::conversion("soup.docx", "not a zip archive");
        let msg = e.to_string();
        assert!(msg.contains("soup.docx"), "got: {msg}");
        assert!(msg.contains("not a zip archive"), "got: {msg}");
    }

    #[test]
    fn write_error_names_the_title() {
        let e = ItemError::write("Pancakes", "permission denied");
        assert!(e.to_string().contains("Pancakes"));
    }

    #[test]
    fn empty_selection_lists_supported_extensions() {
        let msg = RecipeError::EmptySelection.to_string();
        assert!(msg.contains("docx"));
        assert!(msg.contains("webp"));
    }

    #[test]
    fn item_error_round_trips_through_json() {
        let e = ItemError::conversion("a.png", "bad header");
        let json = serde_json::to_string(&e).unwrap();
        let back: ItemError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), e.to_string());
    }
}
