//! PDF processing module.

mod ccitt;
mod decode;
mod reader;

pub use decode::PdfImageDecoder;
pub use reader::PdfDocument;

use image::DynamicImage;
use lopdf::Stream;

use crate::error::{DecodeError, PdfError};

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// An image XObject as stored in a page's resources.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Resource name the page refers to it by (e.g. `Im0`).
    pub name: String,
    /// Image dictionary and still-encoded data.
    pub stream: Stream,
}

/// Source of ordered pages exposing their embedded raster resources.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Image resources of a 1-based page, in resource order.
    fn page_images(&self, page: u32) -> Result<Vec<RawImage>>;
}

/// Decodes embedded raster resources into bitmaps.
pub trait ImageDecoder {
    /// Decode one resource. Failure only excludes this image from selection.
    fn decode(&self, image: &RawImage) -> std::result::Result<DynamicImage, DecodeError>;
}
