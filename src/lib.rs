//! # recipebox
//!
//! A personal recipe library: import text, Markdown, DOCX, images and PDFs,
//! turn every one of them into a paginated PDF, organise the results by
//! category and mirror them into a folder tree on disk.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Input    expand directories, drop unsupported extensions
//!  ├─ 2. Convert  dispatch on extension (pdf / image / docx / md / txt / other)
//!  ├─ 3. Render   markup → raster → page slices → PDF (CPU-bound, spawn_blocking)
//!  ├─ 4. Store    PDF bytes into the DocumentStore, record into the Catalog
//!  └─ 5. Sync     <root>/<category>/<title>.pdf, one file per record
//! ```
//!
//! Imports convert up to three files at a time; a file that fails is
//! counted and skipped, never aborting the rest of the batch. Sync writes
//! records strictly in order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipebox::{collect_files, FolderHandle, Library, LibraryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut library = Library::open_dir("recipes-db", LibraryConfig::default())?;
//!
//!     let summary = library.import(collect_files(&["inbox"]), "", "Desserts").await?;
//!     eprintln!("{} imported, {} failed", summary.succeeded, summary.failed);
//!
//!     let target = FolderHandle::open("/home/me/Recipes")?;
//!     library.sync(&[], Some(&target)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `recipebox` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! recipebox = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod library;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod store;
pub mod sync;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::Catalog;
pub use config::{
    LibraryConfig, LibraryConfigBuilder, PageGeometry, RenderSettings, DEFAULT_CATEGORIES,
    DEFAULT_CATEGORY,
};
pub use error::{ItemError, RecipeError};
pub use export::{export_file_name, export_summary};
pub use import::import_all;
pub use library::Library;
pub use model::{BatchSummary, CategoryFilter, DocumentHandle, RecipeRecord};
pub use pipeline::format::{convert_file, Converted};
pub use pipeline::input::{collect_files, SourceFile, SUPPORTED_EXTENSIONS};
pub use pipeline::render::{render, Pagination, RenderedDocument};
pub use progress::{BatchKind, BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use store::{
    DirDocumentStore, DocumentStore, JsonFileStore, KeyValueStore, KeyValueStoreExt,
    MemoryDocumentStore, MemoryStore,
};
pub use sync::{safe_file_name, sync_to_folder, FolderHandle};
