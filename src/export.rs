//! Multi-record export: one summary page per selected record.
//!
//! Each page is a small card (title, a note that the original document is
//! kept in the library, creation time) rendered the same way as any other
//! markup and placed at the top margin. The records' own documents are not
//! merged into the export.

use crate::config::{LibraryConfig, PageGeometry};
use crate::error::RecipeError;
use crate::model::RecipeRecord;
use crate::pipeline::markup::escape_html;
use crate::pipeline::pdf::{PdfWriter, Placement};
use crate::pipeline::raster;
use crate::pipeline::render::Pagination;
use bytes::Bytes;
use tracing::info;

/// Line printed on every summary card.
pub const EMBEDDED_NOTE: &str = "Embedded original PDF is stored in your library.";

/// Default export file name for a timestamp in milliseconds.
pub fn export_file_name(millis: i64) -> String {
    format!("MyRecipes_Selected_{millis}.pdf")
}

/// Markup of one summary card.
pub fn summary_html(record: &RecipeRecord) -> String {
    format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p>Created: {}</p>",
        escape_html(&record.title),
        EMBEDDED_NOTE,
        record.created.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Build one PDF with a summary page per record, in the given order.
///
/// CPU-bound; async callers should run it on the blocking pool.
///
/// # Errors
/// [`RecipeError::EmptySelection`] for an empty slice,
/// [`RecipeError::Render`] if PDF assembly fails.
pub fn export_summary(
    records: &[RecipeRecord],
    config: &LibraryConfig,
) -> Result<Bytes, RecipeError> {
    if records.is_empty() {
        return Err(RecipeError::EmptySelection);
    }

    let page: &PageGeometry = &config.text_page;
    let mut writer = PdfWriter::new();
    for record in records {
        let laid_out = raster::layout_html(&summary_html(record), &config.render);
        let (width, height) = (laid_out.width(), laid_out.height());
        let plan = Pagination::plan(width, height, page);
        // A card never needs more than one page; anything taller is cut.
        let rows = height.min(plan.slice_height_px);
        let card = raster::draw_rows(&laid_out, 0, rows);
        writer
            .add_image_page(
                page,
                &card,
                Placement {
                    x: page.margin,
                    y: page.margin,
                    width: width as f32 * plan.scale,
                    height: rows as f32 * plan.scale,
                },
            )
            .map_err(|e| RecipeError::Render {
                detail: e.to_string(),
            })?;
    }

    let bytes = writer.finish(page).map_err(|e| RecipeError::Render {
        detail: e.to_string(),
    })?;
    info!("Exported {} summary page(s)", records.len());
    Ok(Bytes::from(bytes))
}
