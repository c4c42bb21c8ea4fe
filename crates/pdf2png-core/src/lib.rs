//! Core library for turning scanned PDFs into lossless per-page PNGs.
//!
//! This crate provides:
//! - PDF page and image resource enumeration (lopdf)
//! - Decoding of embedded rasters (Flate, LZW, DCT, CCITT; gray, RGB, CMYK, indexed)
//! - Largest-image selection per page
//! - Lossless PNG output with fail-fast, page-ordered conversion

pub mod convert;
pub mod error;
pub mod models;
pub mod pdf;
pub mod png;
pub mod select;

pub use convert::{
    ConversionSummary, PageOutput, convert_document, convert_pdf, convert_pdf_with_progress,
};
pub use error::{DecodeError, PageError, Pdf2PngError, PdfError, Result};
pub use models::config::{DecodeConfig, Pdf2PngConfig, PngCompression, PngConfig, PngFilter};
pub use models::request::{ConversionRequest, output_file_name};
pub use pdf::{ImageDecoder, PageSource, PdfDocument, PdfImageDecoder, RawImage};
pub use select::largest_image;
