//! Paginating renderer: markup fragment → multi-page PDF.
//!
//! The fragment is wrapped in an article template (title heading first) and
//! laid out once at the configured density. The virtual raster is then cut
//! into page-sized horizontal slices, and only one slice is painted at a
//! time, so a long recipe never holds its full-length raster in memory. Each
//! slice becomes one page, placed at the margin offset and scaled uniformly
//! so the raster width fills the content box:
//!
//! ```text
//! scale        = content_width / raster_width
//! slice_height = floor(content_height / scale)      (raster px)
//! pages        = max(1, ceil(raster_height / slice_height))
//! ```
//!
//! Page content is an image, so it is not selectable; the record keeps a
//! separate searchable text for that reason.
//!
//! Everything here is CPU-bound and synchronous. Callers on the async side
//! run it inside `tokio::task::spawn_blocking`.

use super::markup::escape_html;
use super::pdf::{PdfError, PdfWriter, Placement};
use super::raster;
use crate::config::{PageGeometry, RenderSettings};
use bytes::Bytes;
use image::{imageops, RgbImage};
use tracing::debug;

/// How a raster maps onto pages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    /// PDF units per raster pixel.
    pub scale: f32,
    /// Raster rows per full page.
    pub slice_height_px: u32,
    /// Number of output pages, at least 1.
    pub pages: usize,
}

impl Pagination {
    pub fn plan(raster_width: u32, raster_height: u32, page: &PageGeometry) -> Self {
        let scale = page.content_width() / raster_width.max(1) as f32;
        let slice_height_px = ((page.content_height() / scale).floor() as u32).max(1);
        let pages = (raster_height.div_ceil(slice_height_px) as usize).max(1);
        Self {
            scale,
            slice_height_px,
            pages,
        }
    }
}

/// A rendered document plus the numbers that produced it.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Bytes,
    pub raster_width: u32,
    pub raster_height: u32,
    pub pagination: Pagination,
}

/// Compose the article: title heading, then the fragment.
pub fn article_html(fragment: &str, title: &str) -> String {
    format!("<h1>{}</h1>\n{}", escape_html(title), fragment)
}

/// Render `fragment` under `title` into a paginated PDF.
pub fn render(
    fragment: &str,
    title: &str,
    settings: &RenderSettings,
    page: &PageGeometry,
) -> Result<RenderedDocument, PdfError> {
    let laid_out = raster::layout_html(&article_html(fragment, title), settings);
    write_pages(laid_out.width(), laid_out.height(), page, |top, rows| {
        raster::draw_rows(&laid_out, top, rows)
    })
}

/// Slice an existing raster into pages.
pub fn paginate(raster: &RgbImage, page: &PageGeometry) -> Result<RenderedDocument, PdfError> {
    let (width, height) = raster.dimensions();
    write_pages(width, height, page, |top, rows| {
        imageops::crop_imm(raster, 0, top, width, rows).to_image()
    })
}

/// One page per slice of a `width x height` raster; `slice(top, rows)`
/// produces the pixels of each band.
fn write_pages<F>(
    width: u32,
    height: u32,
    page: &PageGeometry,
    mut slice: F,
) -> Result<RenderedDocument, PdfError>
where
    F: FnMut(u32, u32) -> RgbImage,
{
    let plan = Pagination::plan(width, height, page);
    let mut writer = PdfWriter::new();

    for i in 0..plan.pages as u32 {
        let top = i * plan.slice_height_px;
        if top >= height {
            break;
        }
        let rows = plan.slice_height_px.min(height - top);
        let band = slice(top, rows);
        writer.add_image_page(
            page,
            &band,
            Placement {
                x: page.margin,
                y: page.margin,
                width: width as f32 * plan.scale,
                height: rows as f32 * plan.scale,
            },
        )?;
    }

    debug!(
        "Paginated {}x{} px raster into {} page(s) of {} rows",
        width, height, plan.pages, plan.slice_height_px
    );

    let bytes = writer.finish(page)?;
    Ok(RenderedDocument {
        bytes: Bytes::from(bytes),
        raster_width: width,
        raster_height: height,
        pagination: plan,
    })
}

/// A single page showing `image` scaled to fit the content box, centred.
pub fn image_document(image: &RgbImage, page: &PageGeometry) -> Result<Bytes, PdfError> {
    let (w, h) = image.dimensions();
    let (w, h) = (w.max(1) as f32, h.max(1) as f32);
    let scale = (page.content_width() / w).min(page.content_height() / h);
    let (draw_w, draw_h) = (w * scale, h * scale);

    let mut writer = PdfWriter::new();
    writer.add_image_page(
        page,
        image,
        Placement {
            x: (page.width - draw_w) / 2.0,
            y: (page.height - draw_h) / 2.0,
            width: draw_w,
            height: draw_h,
        },
    )?;
    Ok(Bytes::from(writer.finish(page)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdf::page_count;
    use image::Rgb;

    #[test]
    fn plan_for_default_geometry() {
        let plan = Pagination::plan(1360, 100, &PageGeometry::TEXT);
        assert!((plan.scale - 540.0 / 1360.0).abs() < 1e-6);
        assert_eq!(plan.slice_height_px, 1813);
        assert_eq!(plan.pages, 1);

        assert_eq!(Pagination::plan(1360, 1813, &PageGeometry::TEXT).pages, 1);
        assert_eq!(Pagination::plan(1360, 1814, &PageGeometry::TEXT).pages, 2);
        assert_eq!(Pagination::plan(1360, 0, &PageGeometry::TEXT).pages, 1);
    }

    #[test]
    fn tall_raster_is_sliced() {
        let raster = RgbImage::from_pixel(1360, 4000, Rgb([255, 255, 255]));
        let doc = paginate(&raster, &PageGeometry::TEXT).unwrap();
        assert_eq!(doc.pagination.pages, 3);
        assert_eq!(page_count(&doc.bytes).unwrap(), 3);
    }

    #[test]
    fn empty_fragment_renders_one_page() {
        let doc = render("", "", &RenderSettings::default(), &PageGeometry::TEXT).unwrap();
        assert_eq!(page_count(&doc.bytes).unwrap(), 1);
    }

    #[test]
    fn page_count_matches_raster_slices() {
        let fragment = "<p>A line of recipe text that goes on for a while.</p>".repeat(120);
        let doc = render(&fragment, "Long", &RenderSettings::default(), &PageGeometry::TEXT)
            .unwrap();
        let expected = doc.raster_height.div_ceil(doc.pagination.slice_height_px) as usize;
        assert!(expected > 1);
        assert_eq!(page_count(&doc.bytes).unwrap(), expected);
    }

    #[test]
    fn layout_pages_match_full_raster_pages() {
        let fragment = "<p>Whisk the eggs, fold in the flour and rest.</p>".repeat(150);
        let html = article_html(&fragment, "Crêpes");
        let settings = RenderSettings::default();

        let banded = render(&fragment, "Crêpes", &settings, &PageGeometry::TEXT).unwrap();
        let whole = paginate(&raster::rasterize(&html, &settings), &PageGeometry::TEXT).unwrap();

        assert!(banded.pagination.pages > 1);
        assert_eq!(banded.raster_height, whole.raster_height);
        assert_eq!(banded.pagination, whole.pagination);
        assert_eq!(
            page_count(&banded.bytes).unwrap(),
            page_count(&whole.bytes).unwrap()
        );
    }

    #[test]
    fn article_escapes_title() {
        assert_eq!(article_html("<p>x</p>", "A&B"), "<h1>A&amp;B</h1>\n<p>x</p>");
    }

    #[test]
    fn image_page_is_single() {
        let img = RgbImage::from_pixel(800, 200, Rgb([10, 20, 30]));
        let bytes = image_document(&img, &PageGeometry::IMAGE).unwrap();
        assert_eq!(page_count(&bytes).unwrap(), 1);
    }
}
