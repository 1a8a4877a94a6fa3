//! CLI binary for recipebox.
//!
//! A thin shim over the library crate: every subcommand opens the library
//! directory, calls one `Library` method and prints the outcome.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use recipebox::{
    collect_files, export_file_name, pipeline::pdf::page_count, BatchKind, BatchProgressCallback, BatchSummary,
    CategoryFilter, FolderHandle, Library, LibraryConfig, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar for imports and syncs. Item failures are printed above the
/// bar as they happen.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, kind: BatchKind, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(match kind {
            BatchKind::Import => "Importing",
            BatchKind::Sync => "Saving",
        });
    }

    fn on_progress(&self, _kind: BatchKind, processed: usize, _total: usize, failed: usize) {
        self.bar.set_position(processed as u64);
        if failed > 0 {
            self.bar.set_message(red(&format!("{failed} failed")));
        }
    }

    fn on_item_error(&self, _kind: BatchKind, name: &str, error: &str) {
        self.bar
            .println(format!("  {} {}  {}", red("✗"), name, dim(error)));
    }

    fn on_batch_complete(&self, _kind: BatchKind, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Import a folder of recipes into a category
  recipebox import ~/Downloads/recipes --category Desserts

  # Import one file under a chosen title
  recipebox import scan.jpg --title "Grandma's Pie"

  # Find recipes
  recipebox list --category Soups --search lentil

  # Mirror everything to <dir>/<category>/<title>.pdf
  recipebox sync --to ~/Documents/Recipes

  # One summary page per selected recipe
  recipebox export 6f1c... 9a2e... -o picks.pdf

SUPPORTED FILES:
  txt, md, docx, pdf, png, jpg, jpeg, gif, webp

ENVIRONMENT VARIABLES:
  RECIPEBOX_LIBRARY       Library directory (default: platform data dir)
  RECIPEBOX_CONCURRENCY   Files converted at once during import
  RUST_LOG                Override log filter
"#;

/// Organise recipes as PDFs, by category.
#[derive(Parser, Debug)]
#[command(
    name = "recipebox",
    version,
    about = "Convert recipe files to PDF and organise them by category",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Library directory holding the catalog and generated PDFs.
    #[arg(long, global = true, env = "RECIPEBOX_LIBRARY")]
    library: Option<PathBuf>,

    /// Files converted concurrently during import.
    #[arg(short, long, global = true, env = "RECIPEBOX_CONCURRENCY", default_value_t = 3)]
    concurrency: usize,

    /// Raster pixels per layout unit when rendering text (1–4).
    #[arg(long, global = true, env = "RECIPEBOX_DENSITY", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=4))]
    density: u32,

    /// Disable progress bar.
    #[arg(long, global = true, env = "RECIPEBOX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "RECIPEBOX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "RECIPEBOX_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert files (or whole folders) and add them to the library.
    Import {
        /// Files or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Title for every imported file. Default: the file name.
        #[arg(short, long, default_value = "")]
        title: String,

        /// Category for every imported file.
        #[arg(long, default_value = "")]
        category: String,
    },

    /// List recipes, newest first.
    List {
        /// Only this category ("All" for every category).
        #[arg(long, default_value = "All")]
        category: String,

        /// Case-insensitive text the recipe must contain.
        #[arg(short, long, default_value = "")]
        search: String,

        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Change a recipe's title or category.
    Edit {
        id: Uuid,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Delete recipes and their PDFs.
    Delete {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },

    /// Show categories, or add one.
    Categories {
        #[command(subcommand)]
        action: Option<CategoryAction>,
    },

    /// Save PDFs to <DIR>/<category>/<title>.pdf.
    Sync {
        /// Library folder to write into. Must already exist.
        #[arg(long)]
        to: Option<PathBuf>,

        /// Only these recipes. Default: all.
        ids: Vec<Uuid>,
    },

    /// Export one summary page per selected recipe into a single PDF.
    Export {
        #[arg(required = true)]
        ids: Vec<Uuid>,

        /// Output file. Default: MyRecipes_Selected_<millis>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    /// Add a category.
    Add { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs for batch commands.
    let batch = matches!(cli.command, Command::Import { .. } | Command::Sync { .. });
    let show_progress = batch && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    let dir = library_dir(&cli)?;
    let mut library = Library::open_dir(&dir, config)
        .with_context(|| format!("Failed to open library at {}", dir.display()))?;

    match cli.command {
        Command::Import {
            paths,
            title,
            category,
        } => {
            let files = collect_files(&paths);
            let summary = library
                .import(files, &title, &category)
                .await
                .context("Import failed")?;
            if !cli.quiet {
                eprintln!("{}", import_message(&summary));
            }
        }

        Command::List {
            category,
            search,
            json,
        } => {
            let records = library.filter(&CategoryFilter::parse(&category), &search);
            if json {
                let out = serde_json::to_string_pretty(&records)
                    .context("Failed to serialise records")?;
                println!("{out}");
            } else if records.is_empty() {
                eprintln!("{}", dim("No recipes found."));
            } else {
                for r in records {
                    println!(
                        "{}  {:<14}  {}  {}",
                        dim(&r.id.to_string()),
                        r.category,
                        bold(&r.title),
                        dim(&r.created.format("%Y-%m-%d %H:%M").to_string()),
                    );
                }
            }
        }

        Command::Edit {
            id,
            title,
            category,
        } => {
            library
                .edit(id, title.as_deref(), category.as_deref())
                .context("Edit failed")?;
            if !cli.quiet {
                eprintln!("{} Updated {}", green("✔"), id);
            }
        }

        Command::Delete { ids } => {
            let removed = library.delete(&ids).await.context("Delete failed")?;
            if !cli.quiet {
                eprintln!("{} Deleted {} recipe(s)", green("✔"), removed.len());
            }
        }

        Command::Categories { action } => match action {
            Some(CategoryAction::Add { name }) => {
                if name.trim().is_empty() {
                    bail!("Category name must not be empty");
                }
                if library.add_category(&name) {
                    eprintln!("{} Added category {}", green("✔"), bold(name.trim()));
                } else {
                    eprintln!("Category {} already exists", bold(name.trim()));
                }
            }
            None => {
                for c in library.catalog().categories() {
                    println!("{c}");
                }
            }
        },

        Command::Sync { to, ids } => {
            let target = to
                .map(FolderHandle::open)
                .transpose()
                .context("Cannot use library folder")?;
            let summary = library
                .sync(&ids, target.as_ref())
                .await
                .context("Sync failed")?;
            if !cli.quiet {
                eprintln!("{}", sync_message(&summary));
            }
        }

        Command::Export { ids, output } => {
            let bytes = library.export(&ids).await.context("Export failed")?;
            let exported = page_count(&bytes).context("Exported PDF is unreadable")?;
            let path = output.unwrap_or_else(|| {
                PathBuf::from(export_file_name(chrono::Utc::now().timestamp_millis()))
            });
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} Exported {} recipe(s) → {}",
                    green("✔"),
                    exported,
                    bold(&path.display().to_string())
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `LibraryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<LibraryConfig> {
    let mut builder = LibraryConfig::builder()
        .concurrency(cli.concurrency)
        .density(cli.density);
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

fn library_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(ref dir) = cli.library {
        return Ok(dir.clone());
    }
    dirs::data_dir()
        .map(|d| d.join("recipebox"))
        .context("No data directory on this platform; pass --library <DIR>")
}

fn import_message(s: &BatchSummary) -> String {
    if s.failed == 0 {
        format!("{} Imported {} file(s). All succeeded.", green("✔"), s.succeeded)
    } else {
        format!("{} Imported {} file(s). {} failed.", red("✘"), s.succeeded, s.failed)
    }
}

fn sync_message(s: &BatchSummary) -> String {
    if s.failed == 0 {
        format!("{} Saved {}/{}. All done.", green("✔"), s.succeeded, s.total())
    } else {
        format!("{} Saved {}/{}. {} failed.", red("✘"), s.succeeded, s.total(), s.failed)
    }
}
