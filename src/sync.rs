//! Disk sync: mirror records to `<root>/<category>/<safe title>.pdf`.
//!
//! Records are written one at a time, strictly in the order given, with a
//! yield between records. Existing files are overwritten, so syncing the
//! same set twice leaves the folder tree unchanged.
//!
//! The target folder is an explicit [`FolderHandle`] owned by the caller.
//! It is checked once when opened and never re-validated; if the folder
//! disappears later, each write fails on its own and is counted.

use crate::config::{LibraryConfig, DEFAULT_CATEGORY};
use crate::error::{ItemError, RecipeError};
use crate::model::{BatchSummary, RecipeRecord};
use crate::progress::BatchKind;
use crate::store::DocumentStore;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Longest file stem produced by [`safe_file_name`], in characters.
pub const MAX_FILE_STEM: usize = 120;

/// Stem used when a title sanitises to nothing.
pub const FALLBACK_FILE_STEM: &str = "recipe";

/// Extension of every synced file.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// Read-write access to a library root folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    root: PathBuf,
}

impl FolderHandle {
    /// Take hold of an existing directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RecipeError> {
        let root = path.into();
        if !root.is_dir() {
            return Err(RecipeError::TargetUnavailable { path: root });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `category`, which must be a single path component.
    fn category_dir(&self, category: &str) -> Option<PathBuf> {
        let name = match category.trim() {
            "" => DEFAULT_CATEGORY,
            c => c,
        };
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.root.join(name))
    }
}

static RE_ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[/\\?%*:|"<>]"#).unwrap());

/// File stem for a title: characters illegal on common filesystems become
/// `-`, the result is cut to [`MAX_FILE_STEM`] characters, and an empty
/// result becomes [`FALLBACK_FILE_STEM`].
pub fn safe_file_name(title: &str) -> String {
    let replaced = RE_ILLEGAL.replace_all(title, "-");
    let stem: String = replaced.chars().take(MAX_FILE_STEM).collect();
    if stem.is_empty() {
        FALLBACK_FILE_STEM.to_string()
    } else {
        stem
    }
}

/// Write every record's document under `target`.
///
/// # Errors
/// [`RecipeError::NoTarget`] when `target` is `None`; nothing is written.
/// Per-record failures are counted in the returned summary.
pub async fn sync_to_folder(
    records: &[RecipeRecord],
    docs: &dyn DocumentStore,
    target: Option<&FolderHandle>,
    config: &LibraryConfig,
) -> Result<BatchSummary, RecipeError> {
    let target = target.ok_or(RecipeError::NoTarget)?;
    let total = records.len();

    info!("Saving {} record(s) to {}", total, target.root().display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(BatchKind::Sync, total);
    }

    let mut summary = BatchSummary::default();
    for record in records {
        match write_one(record, docs, target).await {
            Ok(path) => {
                debug!("Wrote {}", path.display());
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!("{}", e);
                summary.failed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(BatchKind::Sync, &record.title, &e.to_string());
                }
            }
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_progress(BatchKind::Sync, summary.total(), total, summary.failed);
        }
        tokio::task::yield_now().await;
    }

    info!(
        "Sync finished: {} saved, {} failed",
        summary.succeeded, summary.failed
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(BatchKind::Sync, &summary);
    }
    Ok(summary)
}

async fn write_one(
    record: &RecipeRecord,
    docs: &dyn DocumentStore,
    target: &FolderHandle,
) -> Result<PathBuf, ItemError> {
    let dir = target.category_dir(&record.category).ok_or_else(|| {
        ItemError::write(
            &record.title,
            format!("category '{}' is not a valid folder name", record.category),
        )
    })?;
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ItemError::write(&record.title, e))?;

    let bytes = docs
        .fetch(record.document)
        .await
        .ok_or_else(|| ItemError::write(&record.title, "document is no longer available"))?;

    let stem = safe_file_name(&record.title);
    let path = dir.join(format!("{stem}.{DOCUMENT_EXTENSION}"));
    let tmp = dir.join(format!(".{stem}.{DOCUMENT_EXTENSION}.tmp"));
    let written = match tokio::fs::write(&tmp, &bytes).await {
        Ok(()) => tokio::fs::rename(&tmp, &path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        // Never leave a half-written temp file next to the real ones.
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            debug!("Could not remove {}: {}", tmp.display(), cleanup);
        }
        return Err(ItemError::write(&record.title, e));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use bytes::Bytes;

    #[test]
    fn illegal_characters_become_hyphens() {
        assert_eq!(safe_file_name("Soup/Stew?"), "Soup-Stew-");
        assert_eq!(safe_file_name(r#"a\b%c*d:e|f"g<h>i"#), "a-b-c-d-e-f-g-h-i");
        assert_eq!(safe_file_name(""), FALLBACK_FILE_STEM);
        assert_eq!(safe_file_name(&"x".repeat(300)).len(), MAX_FILE_STEM);
        assert_eq!(safe_file_name("Crème brûlée"), "Crème brûlée");
    }

    #[test]
    fn open_rejects_missing_folder() {
        let err = FolderHandle::open("/definitely/not/a/dir").unwrap_err();
        assert!(matches!(err, RecipeError::TargetUnavailable { .. }));
    }

    #[test]
    fn category_must_be_one_component() {
        let dir = tempfile::tempdir().unwrap();
        let h = FolderHandle::open(dir.path()).unwrap();
        assert_eq!(h.category_dir(""), Some(dir.path().join("General")));
        assert_eq!(h.category_dir("Soups"), Some(dir.path().join("Soups")));
        assert!(h.category_dir("../escape").is_none());
        assert!(h.category_dir("..").is_none());
    }

    #[tokio::test]
    async fn no_target_fails_fast() {
        let docs = MemoryDocumentStore::new();
        let err = sync_to_folder(&[], &docs, None, &LibraryConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeError::NoTarget));
    }

    #[tokio::test]
    async fn released_document_is_a_counted_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = FolderHandle::open(dir.path()).unwrap();
        let docs = MemoryDocumentStore::new();

        let kept = docs.put(Bytes::from_static(b"%PDF-a")).await.unwrap();
        let gone = docs.put(Bytes::from_static(b"%PDF-b")).await.unwrap();
        docs.release(gone).await;

        let records = vec![
            RecipeRecord::new("Gone", "A", gone, "", ""),
            RecipeRecord::new("Kept", "A", kept, "", ""),
        ];
        let summary = sync_to_folder(&records, &docs, Some(&target), &LibraryConfig::default())
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary { succeeded: 1, failed: 1 });
        assert_eq!(std::fs::read(dir.path().join("A/Kept.pdf")).unwrap(), b"%PDF-a");
        assert!(!dir.path().join("A/Gone.pdf").exists());
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = FolderHandle::open(dir.path()).unwrap();
        let docs = MemoryDocumentStore::new();
        let h = docs.put(Bytes::from_static(b"%PDF-1")).await.unwrap();

        // A non-empty directory where the PDF should go blocks the rename.
        let blocker = dir.path().join("A/Kept.pdf");
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("inside"), b"x").unwrap();

        let records = vec![RecipeRecord::new("Kept", "A", h, "", "")];
        let summary = sync_to_folder(&records, &docs, Some(&target), &LibraryConfig::default())
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary { succeeded: 0, failed: 1 });

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("A"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("Kept.pdf")]);
    }

    #[tokio::test]
    async fn resync_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let target = FolderHandle::open(dir.path()).unwrap();
        let docs = MemoryDocumentStore::new();
        let h = docs.put(Bytes::from_static(b"%PDF-1")).await.unwrap();
        let records = vec![RecipeRecord::new("Soup/Stew?", "", h, "", "")];

        let config = LibraryConfig::default();
        for _ in 0..2 {
            sync_to_folder(&records, &docs, Some(&target), &config)
                .await
                .unwrap();
        }
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("General"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("Soup-Stew-.pdf")]);
    }
}
