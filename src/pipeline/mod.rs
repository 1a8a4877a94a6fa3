//! Conversion stages: source file → PDF document.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ format ──┬──────────────────────────────▶ pdf   (pdf files)
//!                    ├─▶ raster (decode) ──▶ render ─▶ pdf   (images)
//!                    └─▶ docx / markup ──▶ raster ──▶ render ──▶ pdf
//! ```
//!
//! 1. [`input`]: file names, extension allow-list, directory walking
//! 2. [`format`]: per-extension dispatch and the fallback path
//! 3. [`docx`], [`markup`]: normalise text sources into sanitised HTML
//! 4. [`raster`]: lay out HTML blocks and paint them onto a white raster
//! 5. [`render`]: slice the raster into letter-sized pages
//! 6. [`pdf`]: write image pages into a PDF document

pub mod docx;
pub mod format;
pub mod input;
pub mod markup;
pub mod pdf;
pub mod raster;
pub mod render;
