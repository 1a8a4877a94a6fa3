//! Format dispatch: one source file → PDF document, preview and search text.
//!
//! Dispatch is on the lower-cased extension:
//!
//! | extension                    | document                         | search text        |
//! |------------------------------|----------------------------------|--------------------|
//! | `pdf`                        | bytes passed through unchanged   | file name          |
//! | `png jpg jpeg gif webp`      | one page, image fitted + centred | `[image]`          |
//! | `docx`                       | rendered markup                  | flattened markup   |
//! | `md`                         | rendered markup                  | raw source         |
//! | `txt`, none                  | rendered `<pre>` block           | raw source         |
//! | anything else                | markup if UTF-8, else notice     | text or file name  |
//!
//! Only the explicit formats can fail. The fallback path always produces a
//! document.

use super::docx::docx_to_html;
use super::input::SourceFile;
use super::markup::{
    escape_html, html_to_text, limit_preview, markdown_to_html, sanitize_html, text_to_pre_html,
};
use super::raster::flatten_on_white;
use super::render::{self, image_document};
use crate::config::{LibraryConfig, PageGeometry, RenderSettings};
use crate::error::ItemError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use tracing::debug;

/// Search text stored for image files.
pub const IMAGE_SEARCH_TOKEN: &str = "[image]";

/// The result of converting one file.
#[derive(Debug, Clone)]
pub struct Converted {
    /// PDF bytes.
    pub document: Bytes,
    pub preview_fragment: String,
    /// Text the record's search index is built from.
    pub search_text: String,
}

/// Geometry a conversion needs; copied into the blocking task.
#[derive(Debug, Clone, Copy)]
struct Targets {
    render: RenderSettings,
    text_page: PageGeometry,
    image_page: PageGeometry,
}

impl From<&LibraryConfig> for Targets {
    fn from(c: &LibraryConfig) -> Self {
        Self {
            render: c.render,
            text_page: c.text_page,
            image_page: c.image_page,
        }
    }
}

/// Read and convert `file`.
///
/// Decoding and rasterising run on the blocking pool so the import pool's
/// other conversions keep making progress.
pub async fn convert_file(
    file: &SourceFile,
    config: &LibraryConfig,
) -> Result<Converted, ItemError> {
    let name = file.name().to_string();
    let ext = file.extension();

    let bytes = match file.read().await {
        Ok(b) => b,
        Err(e) if is_fallback(&ext) => {
            debug!("{} unreadable ({}); using placeholder", name, e);
            Bytes::new()
        }
        Err(e) => return Err(ItemError::conversion(&name, e)),
    };

    let targets = Targets::from(config);
    tokio::task::spawn_blocking(move || convert_bytes(&name, &ext, bytes, targets))
        .await
        .map_err(|e| ItemError::conversion(file.name(), format!("conversion task panicked: {e}")))?
}

fn is_fallback(ext: &str) -> bool {
    !matches!(
        ext,
        "pdf" | "png" | "jpg" | "jpeg" | "gif" | "webp" | "docx" | "md" | "txt" | ""
    )
}

/// Convert already-read bytes. Blocking.
fn convert_bytes(
    name: &str,
    ext: &str,
    bytes: Bytes,
    targets: Targets,
) -> Result<Converted, ItemError> {
    let render_markup = |html: &str| {
        render::render(html, name, &targets.render, &targets.text_page)
            .map(|doc| doc.bytes)
            .map_err(|e| ItemError::conversion(name, e))
    };

    let converted = match ext {
        "pdf" => Converted {
            preview_fragment: format!(
                "<p><strong>PDF:</strong> {} (kept as-is)</p>",
                escape_html(name)
            ),
            search_text: name.to_string(),
            document: bytes,
        },

        "png" | "jpg" | "jpeg" | "gif" | "webp" => {
            let decoded =
                image::load_from_memory(&bytes).map_err(|e| ItemError::conversion(name, e))?;
            let pixels = flatten_on_white(&decoded);
            let document = image_document(&pixels, &targets.image_page)
                .map_err(|e| ItemError::conversion(name, e))?;
            Converted {
                document,
                preview_fragment: format!(
                    "<img src=\"data:{};base64,{}\" alt=\"Recipe image\" />",
                    image_mime(ext),
                    STANDARD.encode(&bytes)
                ),
                search_text: IMAGE_SEARCH_TOKEN.to_string(),
            }
        }

        "docx" => {
            let raw = docx_to_html(&bytes).map_err(|e| ItemError::conversion(name, e))?;
            let html = sanitize_html(&raw);
            Converted {
                document: render_markup(&html)?,
                preview_fragment: limit_preview(&html),
                search_text: html_to_text(&html),
            }
        }

        "md" => {
            let text = String::from_utf8_lossy(&bytes);
            let html = sanitize_html(&markdown_to_html(&text));
            Converted {
                document: render_markup(&html)?,
                preview_fragment: limit_preview(&html),
                search_text: text.into_owned(),
            }
        }

        "txt" | "" => {
            let text = String::from_utf8_lossy(&bytes);
            let html = sanitize_html(&text_to_pre_html(&text));
            Converted {
                document: render_markup(&html)?,
                preview_fragment: limit_preview(&html),
                search_text: text.into_owned(),
            }
        }

        other => {
            let (html, search_text) = match std::str::from_utf8(&bytes) {
                Ok(text) if !text.trim().is_empty() => {
                    (sanitize_html(&markdown_to_html(text)), text.to_string())
                }
                _ => (
                    format!("<p>Unsupported file type: .{}</p>", escape_html(other)),
                    name.to_string(),
                ),
            };
            Converted {
                document: render_markup(&html)?,
                preview_fragment: limit_preview(&html),
                search_text,
            }
        }
    };

    debug!("Converted {} ({} bytes of PDF)", name, converted.document.len());
    Ok(converted)
}

fn image_mime(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pdf::page_count;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(30, 20))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    async fn convert(name: &str, bytes: impl Into<Bytes>) -> Result<Converted, ItemError> {
        convert_file(&SourceFile::from_bytes(name, bytes), &LibraryConfig::default()).await
    }

    #[tokio::test]
    async fn pdf_passes_through() {
        let c = convert("menu.pdf", &b"%PDF-1.4 fake"[..]).await.unwrap();
        assert_eq!(&c.document[..], b"%PDF-1.4 fake");
        assert_eq!(c.search_text, "menu.pdf");
        assert!(c.preview_fragment.contains("menu.pdf"));
    }

    #[tokio::test]
    async fn markdown_renders_and_keeps_raw_text() {
        let c = convert("tart.md", &b"# Title\nBody text"[..]).await.unwrap();
        assert_eq!(c.search_text, "# Title\nBody text");
        assert_eq!(c.preview_fragment, "<h1>Title</h1><p>Body text</p>");
        assert_eq!(page_count(&c.document).unwrap(), 1);
    }

    #[tokio::test]
    async fn text_preview_is_placeholder() {
        let c = convert("notes.txt", &b"2 eggs\n1 cup flour"[..]).await.unwrap();
        assert_eq!(c.preview_fragment, "<p>(no preview)</p>");
        assert_eq!(c.search_text, "2 eggs\n1 cup flour");
    }

    #[tokio::test]
    async fn image_gets_one_page_and_token() {
        let png = png_bytes();
        let c = convert("photo.png", png).await.unwrap();
        assert_eq!(c.search_text, IMAGE_SEARCH_TOKEN);
        assert!(c.preview_fragment.starts_with("<img src=\"data:image/png;base64,"));
        assert_eq!(page_count(&c.document).unwrap(), 1);
    }

    #[tokio::test]
    async fn corrupt_image_is_a_conversion_error() {
        let err = convert("broken.png", &b"not a png"[..]).await.unwrap_err();
        assert!(matches!(err, ItemError::Conversion { ref file, .. } if file == "broken.png"));
    }

    #[tokio::test]
    async fn corrupt_docx_is_a_conversion_error() {
        assert!(convert("broken.docx", &b"nope"[..]).await.is_err());
    }

    #[tokio::test]
    async fn unknown_extension_never_fails() {
        let c = convert("recipe.rtf", &b"Plain words"[..]).await.unwrap();
        assert_eq!(c.search_text, "Plain words");

        let c = convert("blob.bin", vec![0xff, 0xfe, 0x00]).await.unwrap();
        assert_eq!(c.preview_fragment, "<p>Unsupported file type: .bin</p>");
        assert_eq!(c.search_text, "blob.bin");
        assert_eq!(page_count(&c.document).unwrap(), 1);
    }

    #[tokio::test]
    async fn unreadable_fallback_file_degrades() {
        let missing = SourceFile::from_path("/definitely/not/here.xyz");
        let c = convert_file(&missing, &LibraryConfig::default()).await.unwrap();
        assert!(c.preview_fragment.contains("Unsupported file type: .xyz"));
    }

    #[tokio::test]
    async fn unreadable_markdown_fails() {
        let missing = SourceFile::from_path("/definitely/not/here.md");
        assert!(convert_file(&missing, &LibraryConfig::default()).await.is_err());
    }
}
