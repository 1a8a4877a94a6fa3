//! Markup rasterisation: HTML fragment → white RGB raster.
//!
//! The layout engine is deliberately small. A fragment is flattened into a
//! list of blocks (headings, paragraphs, preformatted text, list items,
//! rules, images), each block is word-wrapped into fixed-pitch lines, and the
//! lines are stamped with 8×8 bitmap glyphs scaled per block type. Output is
//! fully deterministic: the same fragment and [`RenderSettings`] always give
//! the same raster size, which is what pagination relies on.
//!
//! ```text
//! HTML ──▶ parse_blocks ──▶ layout (positions, height) ──▶ draw ──▶ RgbImage
//! ```

use super::markup::collapse_whitespace;
use crate::config::RenderSettings;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{imageops, DynamicImage, Rgb, RgbImage};
use scraper::{ElementRef, Html};
use tracing::debug;

const GLYPH: u32 = 8;
const INK: Rgb<u8> = Rgb([0x22, 0x22, 0x22]);
const RULE_INK: Rgb<u8> = Rgb([0xbb, 0xbb, 0xbb]);
const WHITE: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

/// A laid-out unit of content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    /// Whitespace-preserving text; lines are hard-wrapped.
    Preformatted(String),
    ListItem { marker: String, text: String },
    Rule,
    Image(RgbImage),
}

impl Block {
    /// Glyph magnification in layout units.
    fn text_scale(&self) -> u32 {
        match self {
            Block::Heading { level: 1, .. } => 3,
            Block::Heading { level: 2, .. } => 2,
            _ => 1,
        }
    }
}

/// Flatten an HTML fragment into blocks, in document order.
pub fn parse_blocks(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    collect_children(fragment.root_element(), &mut blocks);
    blocks
}

/// Loose text directly inside a container becomes its own paragraph.
fn collect_children(parent: ElementRef<'_>, out: &mut Vec<Block>) {
    for child in parent.children() {
        if let Some(el) = ElementRef::wrap(child) {
            collect_element(el, out);
        } else if let Some(t) = child.value().as_text() {
            let text = collapse_whitespace(t);
            if !text.is_empty() {
                out.push(Block::Paragraph(text));
            }
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn collect_element(el: ElementRef<'_>, out: &mut Vec<Block>) {
    let name = el.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse().unwrap_or(6);
            let text = element_text(el);
            if !text.is_empty() {
                out.push(Block::Heading { level, text });
            }
        }
        "pre" => {
            let text: String = el.text().collect();
            let text = text.trim_end_matches('\n').replace('\t', "    ");
            if !text.is_empty() {
                out.push(Block::Preformatted(text));
            }
        }
        "ul" | "ol" => {
            let ordered = name == "ol";
            let items = el
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| c.value().name() == "li");
            for (i, li) in items.enumerate() {
                let marker = if ordered {
                    format!("{}.", i + 1)
                } else {
                    "-".to_string()
                };
                out.push(Block::ListItem {
                    marker,
                    text: element_text(li),
                });
            }
        }
        "table" => {
            for tr in el
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|d| d.value().name() == "tr")
            {
                let cells: Vec<String> = tr
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(element_text)
                    .collect();
                if !cells.is_empty() {
                    out.push(Block::Paragraph(cells.join(" | ")));
                }
            }
        }
        "hr" => out.push(Block::Rule),
        "img" => {
            if let Some(img) = el.value().attr("src").and_then(decode_data_url) {
                out.push(Block::Image(img));
            }
        }
        "div" | "article" | "section" | "body" | "main" | "header" | "footer" | "figure" => {
            collect_children(el, out)
        }
        "script" | "style" | "head" | "title" => {}
        _ => {
            // Paragraph-like: keep inline images, then the text.
            for img in el
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|d| d.value().name() == "img")
            {
                if let Some(decoded) = img.value().attr("src").and_then(decode_data_url) {
                    out.push(Block::Image(decoded));
                }
            }
            let text = element_text(el);
            if !text.is_empty() {
                out.push(Block::Paragraph(text));
            }
        }
    }
}

/// Decode a base64 `data:` URL into an image flattened onto white.
pub fn decode_data_url(src: &str) -> Option<RgbImage> {
    let rest = src.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    let img = image::load_from_memory(&bytes).ok()?;
    Some(flatten_on_white(&img))
}

/// Composite any alpha channel onto an opaque white background.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let a = px[3] as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

// ── Layout ───────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Placed {
    Text { x: u32, y: u32, scale: u32, text: String },
    Rule { x: u32, y: u32, width: u32, thickness: u32 },
    Image { x: u32, y: u32, image: RgbImage },
}

impl Placed {
    /// Raster rows `[start, end)` the item paints.
    fn rows(&self) -> (u32, u32) {
        match self {
            Placed::Text { y, scale, .. } => (*y, y + GLYPH * scale),
            Placed::Rule { y, thickness, .. } => (*y, y + thickness),
            Placed::Image { y, image, .. } => (*y, y + image.height()),
        }
    }
}

/// Positions of everything on the raster plus its final height.
#[derive(Debug)]
pub struct Layout {
    width: u32,
    height: u32,
    items: Vec<Placed>,
}

impl Layout {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Lay out blocks at the configured width and density.
pub fn layout(blocks: Vec<Block>, settings: &RenderSettings) -> Layout {
    let d = settings.density.max(1);
    let width = settings.raster_width();
    let pad = settings.padding * d;
    let gap = settings.block_gap * d;
    let content_w = width.saturating_sub(2 * pad).max(GLYPH * d);

    let mut items = Vec::new();
    let mut y = pad;

    for (i, block) in blocks.into_iter().enumerate() {
        if i > 0 {
            y += gap;
        }
        let scale = block.text_scale() * d;
        let cell = GLYPH * scale;
        let line_height = cell * 3 / 2;

        match block {
            Block::Heading { text, .. } | Block::Paragraph(text) => {
                let cols = (content_w / cell).max(1) as usize;
                for line in wrap_words(&text, cols) {
                    items.push(Placed::Text { x: pad, y, scale, text: line });
                    y += line_height;
                }
            }
            Block::Preformatted(text) => {
                let cols = (content_w / cell).max(1) as usize;
                for src_line in text.lines() {
                    for line in wrap_hard(src_line, cols) {
                        items.push(Placed::Text { x: pad, y, scale, text: line });
                        y += line_height;
                    }
                }
            }
            Block::ListItem { marker, text } => {
                let indent = (marker.chars().count() as u32 + 1) * cell;
                let cols = (content_w.saturating_sub(indent) / cell).max(1) as usize;
                items.push(Placed::Text { x: pad, y, scale, text: marker });
                let lines = wrap_words(&text, cols);
                if lines.is_empty() {
                    y += line_height;
                }
                for line in lines {
                    items.push(Placed::Text { x: pad + indent, y, scale, text: line });
                    y += line_height;
                }
            }
            Block::Rule => {
                items.push(Placed::Rule { x: pad, y: y + d, width: content_w, thickness: d });
                y += 3 * d;
            }
            Block::Image(image) => {
                let image = fit_width(image, content_w);
                let h = image.height();
                items.push(Placed::Image { x: pad, y, image });
                y += h;
            }
        }
    }

    let height = (y + pad).max(1);
    Layout { width, height, items }
}

fn fit_width(image: RgbImage, max_w: u32) -> RgbImage {
    if image.width() <= max_w || image.width() == 0 {
        return image;
    }
    let h = ((image.height() as u64 * max_w as u64) / image.width() as u64).max(1) as u32;
    imageops::resize(&image, max_w, h, imageops::FilterType::Triangle)
}

/// Greedy word wrap to `cols` characters; words longer than a line are split.
fn wrap_words(text: &str, cols: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > cols {
            if len > 0 {
                lines.push(std::mem::take(&mut current));
                len = 0;
            }
            let rest = word.split_off(cols);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if len == 0 { word.len() } else { len + 1 + word.len() };
        if needed > cols {
            lines.push(std::mem::take(&mut current));
            len = 0;
        }
        if len > 0 {
            current.push(' ');
            len += 1;
        }
        current.extend(word.iter());
        len += word.len();
    }
    if len > 0 {
        lines.push(current);
    }
    lines
}

/// Split a line every `cols` characters, keeping spaces. An empty line
/// still occupies one row.
fn wrap_hard(line: &str, cols: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(cols).map(|c| c.iter().collect()).collect()
}

// ── Drawing ──────────────────────────────────────────────────────────────────

/// Paint a whole layout onto one white raster.
pub fn draw(layout: &Layout) -> RgbImage {
    draw_rows(layout, 0, layout.height)
}

/// Paint only raster rows `[top, top + rows)` of a layout.
///
/// The result is pixel-identical to the same crop of [`draw`], but memory is
/// bounded by the band, not by the document. Items crossing the band edges
/// are clipped.
pub fn draw_rows(layout: &Layout, top: u32, rows: u32) -> RgbImage {
    let rows = rows.min(layout.height.saturating_sub(top)).max(1);
    let bottom = top.saturating_add(rows);
    let offset = top as i64;

    let mut img = RgbImage::from_pixel(layout.width, rows, WHITE);
    for item in &layout.items {
        let (start, end) = item.rows();
        if end <= top || start >= bottom {
            continue;
        }
        match item {
            Placed::Text { x, y, scale, text } => {
                draw_text(&mut img, *x, *y as i64 - offset, *scale, text)
            }
            Placed::Rule { x, y, width, thickness } => {
                fill_rect(&mut img, *x, *y as i64 - offset, *width, *thickness, RULE_INK)
            }
            Placed::Image { x, y, image } => {
                imageops::replace(&mut img, image, *x as i64, *y as i64 - offset)
            }
        }
    }
    img
}

/// Parse and lay out a fragment without painting it.
pub fn layout_html(html: &str, settings: &RenderSettings) -> Layout {
    let laid_out = layout(parse_blocks(html), settings);
    debug!("Laid out fragment → {}x{} px", laid_out.width, laid_out.height);
    laid_out
}

/// Layout and draw in one step.
pub fn rasterize(html: &str, settings: &RenderSettings) -> RgbImage {
    draw(&layout_html(html, settings))
}

fn glyph_for(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_text(img: &mut RgbImage, x: u32, y: i64, scale: u32, text: &str) {
    let cell = GLYPH * scale;
    for (i, c) in text.chars().enumerate() {
        if c == ' ' {
            continue;
        }
        let gx = x + i as u32 * cell;
        let glyph = glyph_for(c);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH {
                if bits & (1 << col) != 0 {
                    fill_rect(
                        img,
                        gx + col * scale,
                        y + (row as u32 * scale) as i64,
                        scale,
                        scale,
                        INK,
                    );
                }
            }
        }
    }
}

/// `y` may fall above the buffer; rows outside it are skipped.
fn fill_rect(img: &mut RgbImage, x: u32, y: i64, w: u32, h: u32, color: Rgb<u8>) {
    let x_end = x.saturating_add(w).min(img.width());
    let y_start = y.clamp(0, img.height() as i64) as u32;
    let y_end = (y + h as i64).clamp(0, img.height() as i64) as u32;
    for py in y_start..y_end {
        for px in x..x_end {
            img.put_pixel(px, py, color);
        }
    }
}
