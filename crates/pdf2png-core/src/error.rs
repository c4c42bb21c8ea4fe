//! Error types for the pdf2png-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for a conversion run.
#[derive(Error, Debug)]
pub enum Pdf2PngError {
    /// The destination file for a page exists and overwriting is disabled.
    #[error("Output file {} already exists. Use --overwrite to replace it.", .0.display())]
    OutputExists(PathBuf),

    /// A page could not be turned into a PNG.
    #[error("Failed on page {index} of {total}: {source}")]
    Page {
        index: u32,
        total: u32,
        source: PageError,
    },

    /// PDF reading error.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to opening and walking the PDF.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The page resource tree is malformed.
    #[error("failed to read page resources: {0}")]
    Resources(String),
}

/// Errors that abort a single page.
#[derive(Error, Debug)]
pub enum PageError {
    /// None of the page's embedded images could be decoded.
    #[error("No extractable images found on page")]
    NoImages,

    /// The output file could not be created.
    #[error("unable to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The PNG encoder failed.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Reasons an embedded image resource cannot be decoded.
///
/// These are expected for some resources and only exclude the image from
/// selection.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not an image stream or a required key is missing.
    #[error("malformed image dictionary: {0}")]
    Malformed(String),

    /// The stream uses a filter without a decoder.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// The color space cannot be mapped to PNG channels.
    #[error("unsupported color space: {0}")]
    UnsupportedColorSpace(String),

    /// Bits per component outside 1, 2, 4, 8, 16.
    #[error("unsupported bits per component: {0}")]
    UnsupportedBitDepth(i64),

    /// The decoded stream is shorter than the dimensions require.
    #[error("image data too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Stream decompression failed.
    #[error("failed to decompress stream: {0}")]
    Decompress(String),

    /// The embedded codec rejected the data.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Result type for the pdf2png library.
pub type Result<T> = std::result::Result<T, Pdf2PngError>;
