//! Minimal PDF writer: one raster image per page.
//!
//! Every page the library produces is a picture: a slice of a rendered
//! recipe, a photo, or a summary card. So the writer only needs to
//! Flate-compress RGB pixels into an image XObject and paint it at a given
//! position with a single `cm … Do` content stream.

use crate::config::PageGeometry;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("image compression failed: {0}")]
    Compress(#[from] std::io::Error),

    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Where an image lands on a page, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Accumulates pages, then serialises the whole document.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page of size `page` showing `image` at `at`.
    pub fn add_image_page(
        &mut self,
        page: &PageGeometry,
        image: &RgbImage,
        at: Placement,
    ) -> Result<(), PdfError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(image.as_raw())?;
        let pixels = encoder.finish()?;

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(image.width() as i64),
                "Height" => Object::Integer(image.height() as i64),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "FlateDecode",
            },
            pixels,
        ));

        // PDF space has its origin at the bottom-left.
        let pdf_y = page.height - at.y - at.height;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(at.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(at.height),
                        Object::Real(at.x),
                        Object::Real(pdf_y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => media_box(page),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Serialise. A writer with no pages yields a single blank page so the
    /// output is always a valid document.
    pub fn finish(mut self, blank: &PageGeometry) -> Result<Vec<u8>, PdfError> {
        if self.kids.is_empty() {
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "MediaBox" => media_box(blank),
            });
            self.kids.push(page_id.into());
        }

        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => Object::Integer(count),
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

fn media_box(page: &PageGeometry) -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(page.width),
        Object::Real(page.height),
    ]
}

/// Number of pages in a serialised PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}
