//! Bulk import: convert a batch of files and prepend one record per success.
//!
//! ## Concurrency
//!
//! Conversions run through `futures::stream::buffer_unordered` with a width
//! of `min(config.concurrency, batch size)`. Each in-flight future reads,
//! converts (CPU work on the blocking pool) and stores one file, then yields.
//! Finished futures are drained by a single loop, which is the only place
//! the catalog is touched. Records therefore land in completion order, most
//! recent first, and no two appends ever interleave.
//!
//! ## Failure policy
//!
//! A file that fails to read, convert or store is logged, counted and
//! skipped. It never produces a record and never stops the batch.

use crate::catalog::Catalog;
use crate::config::LibraryConfig;
use crate::error::{ItemError, RecipeError};
use crate::model::{BatchSummary, DocumentHandle, RecipeRecord};
use crate::pipeline::format::{convert_file, Converted};
use crate::pipeline::input::SourceFile;
use crate::progress::BatchKind;
use crate::store::DocumentStore;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Import `files` into `catalog`.
///
/// Files outside the supported extension list are dropped silently before
/// the batch starts. Every record gets `default_title` when it is not blank,
/// otherwise the file's base name, and `category` (or the configured default
/// category when blank).
///
/// # Errors
/// [`RecipeError::EmptySelection`] when nothing importable remains after
/// filtering. Per-file failures are counted in the returned summary.
pub async fn import_all(
    catalog: &mut Catalog,
    docs: &dyn DocumentStore,
    files: Vec<SourceFile>,
    default_title: &str,
    category: &str,
    config: &LibraryConfig,
) -> Result<BatchSummary, RecipeError> {
    let offered = files.len();
    let queue: Vec<SourceFile> = files.into_iter().filter(SourceFile::is_supported).collect();
    if queue.is_empty() {
        return Err(RecipeError::EmptySelection);
    }
    if queue.len() < offered {
        debug!("Dropped {} unsupported file(s)", offered - queue.len());
    }

    let total = queue.len();
    let width = config.concurrency.clamp(1, total);
    let category = match category.trim() {
        "" => config.default_category.clone(),
        c => c.to_string(),
    };
    let default_title = default_title.trim();

    info!(
        "Importing {} file(s) into '{}' ({} at a time)",
        total, category, width
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(BatchKind::Import, total);
    }

    let mut conversions = stream::iter(queue.into_iter().map(|file| async move {
        let result = import_one(&file, docs, config).await;
        tokio::task::yield_now().await;
        (file, result)
    }))
    .buffer_unordered(width);

    let mut summary = BatchSummary::default();
    while let Some((file, result)) = conversions.next().await {
        match result {
            Ok((handle, converted)) => {
                let title = if default_title.is_empty() {
                    file.base_name()
                } else {
                    default_title
                };
                let record = RecipeRecord::new(
                    title,
                    category.as_str(),
                    handle,
                    converted.preview_fragment,
                    converted.search_text,
                );
                debug!("Imported {} as {}", file.name(), record.id);
                catalog.prepend(record);
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!("{}", e);
                summary.failed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(BatchKind::Import, file.name(), &e.to_string());
                }
            }
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_progress(BatchKind::Import, summary.total(), total, summary.failed);
        }
    }

    info!(
        "Import finished: {} succeeded, {} failed",
        summary.succeeded, summary.failed
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(BatchKind::Import, &summary);
    }
    Ok(summary)
}

async fn import_one(
    file: &SourceFile,
    docs: &dyn DocumentStore,
    config: &LibraryConfig,
) -> Result<(DocumentHandle, Converted), ItemError> {
    let converted = convert_file(file, config).await?;
    let handle = docs
        .put(converted.document.clone())
        .await
        .map_err(|e| ItemError::conversion(file.name(), format!("could not store document: {e}")))?;
    Ok((handle, converted))
}
