//! The `Library` facade: a catalog plus the stores that make it durable.
//!
//! `Library` is the entry point most callers want. It loads the catalog from
//! a [`KeyValueStore`] on open, drives the import pool, sync worker and
//! exporter against its [`DocumentStore`], and writes the catalog back after
//! every mutation.
//!
//! ```rust,no_run
//! use recipebox::{collect_files, Library, LibraryConfig};
//!
//! # async fn run() -> Result<(), recipebox::RecipeError> {
//! let mut library = Library::open_dir("./my-recipes", LibraryConfig::default())?;
//! let summary = library
//!     .import(collect_files(&["./inbox"]), "", "Desserts")
//!     .await?;
//! println!("{} imported, {} failed", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

use crate::catalog::Catalog;
use crate::config::{LibraryConfig, DEFAULT_CATEGORIES};
use crate::error::RecipeError;
use crate::export::export_summary;
use crate::import::import_all;
use crate::model::{BatchSummary, CategoryFilter, RecipeRecord};
use crate::pipeline::input::SourceFile;
use crate::store::{
    DirDocumentStore, DocumentStore, JsonFileStore, KeyValueStore, KeyValueStoreExt,
    MemoryDocumentStore, MemoryStore, CATEGORIES_KEY, RECIPES_KEY,
};
use crate::sync::{sync_to_folder, FolderHandle};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Name of the document directory inside a library directory.
pub const DOCUMENTS_DIR: &str = "documents";

pub struct Library {
    catalog: Catalog,
    store: Arc<dyn KeyValueStore>,
    docs: Arc<dyn DocumentStore>,
    config: LibraryConfig,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("records", &self.catalog.len())
            .field("categories", &self.catalog.categories())
            .field("config", &self.config)
            .finish()
    }
}

impl Library {
    /// Load the catalog from `store`. A missing or unreadable record list
    /// starts empty; a missing category list starts with the defaults.
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        docs: Arc<dyn DocumentStore>,
        config: LibraryConfig,
    ) -> Self {
        let records: Vec<RecipeRecord> = store.get(RECIPES_KEY, Vec::new());
        let categories: Vec<String> = store.get(
            CATEGORIES_KEY,
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        );
        let catalog = Catalog::from_parts(records, categories);
        debug!(
            "Opened library: {} record(s), {} categories",
            catalog.len(),
            catalog.categories().len()
        );
        Self {
            catalog,
            store,
            docs,
            config,
        }
    }

    /// A library persisted under `dir`: `recipes.json`, `categories.json`
    /// and a `documents/` folder of PDFs.
    pub fn open_dir(dir: impl AsRef<Path>, config: LibraryConfig) -> Result<Self, RecipeError> {
        let dir = dir.as_ref();
        let docs = DirDocumentStore::open(dir.join(DOCUMENTS_DIR)).map_err(|e| RecipeError::Store {
            detail: format!("cannot open {}: {}", dir.display(), e),
        })?;
        Ok(Self::open(
            Arc::new(JsonFileStore::new(dir)),
            Arc::new(docs),
            config,
        ))
    }

    /// A library that lives only as long as the process.
    pub fn in_memory(config: LibraryConfig) -> Self {
        Self::open(
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryDocumentStore::new()),
            config,
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }

    /// The PDF behind a record.
    pub async fn document(&self, id: Uuid) -> Result<Bytes, RecipeError> {
        let record = self
            .catalog
            .get(id)
            .ok_or(RecipeError::RecordNotFound { id })?;
        self.docs
            .fetch(record.document)
            .await
            .ok_or_else(|| RecipeError::Store {
                detail: format!("document for '{}' is missing", record.title),
            })
    }

    /// Records passing a category filter and search term.
    pub fn filter(&self, filter: &CategoryFilter, term: &str) -> Vec<&RecipeRecord> {
        self.catalog.filter(filter, term)
    }

    /// Run the import pool, then persist. A category not yet in the set is
    /// added to it.
    pub async fn import(
        &mut self,
        files: Vec<SourceFile>,
        default_title: &str,
        category: &str,
    ) -> Result<BatchSummary, RecipeError> {
        let summary = import_all(
            &mut self.catalog,
            self.docs.as_ref(),
            files,
            default_title,
            category,
            &self.config,
        )
        .await?;
        if self.catalog.add_category(category) {
            info!("Added category '{}'", category.trim());
        }
        self.persist();
        Ok(summary)
    }

    /// Change a record's title and/or category, then persist.
    pub fn edit(
        &mut self,
        id: Uuid,
        title: Option<&str>,
        category: Option<&str>,
    ) -> Result<(), RecipeError> {
        if !self.catalog.edit(id, title, category) {
            return Err(RecipeError::RecordNotFound { id });
        }
        if let Some(c) = category {
            self.catalog.add_category(c);
        }
        self.persist();
        Ok(())
    }

    /// Delete records and release their documents.
    ///
    /// Every id must exist; otherwise nothing is deleted.
    pub async fn delete(&mut self, ids: &[Uuid]) -> Result<Vec<RecipeRecord>, RecipeError> {
        if let Some(&id) = ids.iter().find(|id| self.catalog.get(**id).is_none()) {
            return Err(RecipeError::RecordNotFound { id });
        }
        let removed = self.catalog.remove(ids);
        for record in &removed {
            self.docs.release(record.document).await;
        }
        self.persist();
        info!("Deleted {} record(s)", removed.len());
        Ok(removed)
    }

    /// Add a category. Returns `false` when it already existed or is blank.
    pub fn add_category(&mut self, name: &str) -> bool {
        let added = self.catalog.add_category(name);
        if added {
            self.persist();
        }
        added
    }

    /// Save records to `target`: the given ids, or every record when `ids`
    /// is empty.
    pub async fn sync(
        &self,
        ids: &[Uuid],
        target: Option<&FolderHandle>,
    ) -> Result<BatchSummary, RecipeError> {
        let records = self.selection(ids)?;
        sync_to_folder(&records, self.docs.as_ref(), target, &self.config).await
    }

    /// One summary page per selected record.
    ///
    /// An empty `ids` is [`RecipeError::EmptySelection`]; an id that is not
    /// in the catalog is [`RecipeError::RecordNotFound`].
    pub async fn export(&self, ids: &[Uuid]) -> Result<Bytes, RecipeError> {
        if ids.is_empty() {
            return Err(RecipeError::EmptySelection);
        }
        let records = self.selection(ids)?;
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || export_summary(&records, &config))
            .await
            .map_err(|e| RecipeError::Internal(format!("Export task panicked: {}", e)))?
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    fn selection(&self, ids: &[Uuid]) -> Result<Vec<RecipeRecord>, RecipeError> {
        if ids.is_empty() {
            return Ok(self.catalog.records().to_vec());
        }
        if let Some(&id) = ids.iter().find(|id| self.catalog.get(**id).is_none()) {
            return Err(RecipeError::RecordNotFound { id });
        }
        Ok(self.catalog.select(ids))
    }

    fn persist(&self) {
        self.store.set(RECIPES_KEY, self.catalog.records());
        self.store.set(CATEGORIES_KEY, self.catalog.categories());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(name: &str, body: &str) -> SourceFile {
        SourceFile::from_bytes(name.to_string(), body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn reopening_restores_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let mut lib = Library::open_dir(dir.path(), LibraryConfig::default()).unwrap();
        lib.import(vec![md("pie.md", "# Pie")], "", "Baking").await.unwrap();
        let id = lib.catalog().records()[0].id;

        let lib = Library::open_dir(dir.path(), LibraryConfig::default()).unwrap();
        assert_eq!(lib.catalog().len(), 1);
        assert!(lib.catalog().categories().iter().any(|c| c == "Baking"));
        assert!(lib.document(id).await.unwrap().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn edit_unknown_record_fails() {
        let mut lib = Library::in_memory(LibraryConfig::default());
        let err = lib.edit(Uuid::new_v4(), Some("x"), None).unwrap_err();
        assert!(matches!(err, RecipeError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn edit_rebuilds_search_text() {
        let mut lib = Library::in_memory(LibraryConfig::default());
        lib.import(vec![md("a.md", "butter")], "Old", "").await.unwrap();
        let id = lib.catalog().records()[0].id;
        lib.edit(id, Some("New"), Some("Desserts")).unwrap();

        let rec = lib.catalog().get(id).unwrap();
        assert_eq!(rec.searchable_text, "new butter");
        assert_eq!(rec.category, "Desserts");
    }

    #[tokio::test]
    async fn delete_keeps_categories() {
        let mut lib = Library::in_memory(LibraryConfig::default());
        lib.import(vec![md("a.md", "x")], "", "Soups").await.unwrap();
        let id = lib.catalog().records()[0].id;
        lib.delete(&[id]).await.unwrap();
        assert!(lib.catalog().is_empty());
        assert!(lib.catalog().categories().iter().any(|c| c == "Soups"));
    }

    #[tokio::test]
    async fn export_with_unknown_id_fails() {
        let mut lib = Library::in_memory(LibraryConfig::default());
        lib.import(vec![md("a.md", "x")], "", "").await.unwrap();
        let known = lib.catalog().records()[0].id;

        let err = lib.export(&[known, Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, RecipeError::RecordNotFound { .. }));

        let pdf = lib.export(&[known, known]).await.unwrap();
        assert_eq!(crate::pipeline::pdf::page_count(&pdf).unwrap(), 1);
    }

    #[tokio::test]
    async fn sync_with_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lib = Library::in_memory(LibraryConfig::default());
        let target = FolderHandle::open(dir.path()).unwrap();
        let err = lib.sync(&[Uuid::new_v4()], Some(&target)).await.unwrap_err();
        assert!(matches!(err, RecipeError::RecordNotFound { .. }));
    }
}
