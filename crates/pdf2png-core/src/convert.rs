//! The page-by-page conversion pipeline.

use std::path::PathBuf;
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{PageError, Pdf2PngError, Result};
use crate::models::config::Pdf2PngConfig;
use crate::models::request::ConversionRequest;
use crate::pdf::{ImageDecoder, PageSource, PdfDocument, RawImage};
use crate::png::write_png;
use crate::select::largest_image;

/// A PNG written for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutput {
    /// 1-based page number.
    pub index: u32,
    /// Page count of the document.
    pub total: u32,
    /// Written file.
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    /// One entry per page, in page order.
    pub pages: Vec<PageOutput>,
}

/// Convert every page of `request.source` into a numbered PNG.
pub fn convert_pdf(
    request: &ConversionRequest,
    config: &Pdf2PngConfig,
) -> Result<ConversionSummary> {
    convert_pdf_with_progress(request, config, |_| {})
}

/// Like [`convert_pdf`], calling `on_page` after each page is written.
pub fn convert_pdf_with_progress<F>(
    request: &ConversionRequest,
    config: &Pdf2PngConfig,
    on_page: F,
) -> Result<ConversionSummary>
where
    F: FnMut(&PageOutput),
{
    let document = PdfDocument::open(&request.source)?;
    let decoder = document.decoder(&config.decode);
    convert_document(&document, &decoder, request, config, on_page)
}

/// Run the pipeline over any page source and decoder.
///
/// Pages are processed in order and the first failure stops the run; files
/// written for earlier pages are left in place.
pub fn convert_document<S, D, F>(
    source: &S,
    decoder: &D,
    request: &ConversionRequest,
    config: &Pdf2PngConfig,
    mut on_page: F,
) -> Result<ConversionSummary>
where
    S: PageSource,
    D: ImageDecoder,
    F: FnMut(&PageOutput),
{
    let start = Instant::now();
    let total = source.page_count();
    if total == 0 {
        warn!("{} has no pages, nothing to convert", request.source.display());
    }

    let mut summary = ConversionSummary::default();
    for index in 1..=total {
        let path = request.output_path(index);

        if path.exists() && !request.overwrite {
            return Err(Pdf2PngError::OutputExists(path));
        }

        let raw_images = source.page_images(index)?;
        let image = decode_primary_image(decoder, &raw_images, index)
            .and_then(|image| write_png(&image, &path, &config.png).map(|()| image))
            .map_err(|source| Pdf2PngError::Page {
                index,
                total,
                source,
            })?;

        debug!(
            "Page {}/{}: {}x{} -> {}",
            index,
            total,
            image.width(),
            image.height(),
            path.display()
        );

        let output = PageOutput {
            index,
            total,
            path,
            width: image.width(),
            height: image.height(),
        };
        on_page(&output);
        summary.pages.push(output);
    }

    info!(
        "Converted {} pages from {} in {:?}",
        summary.pages.len(),
        request.source.display(),
        start.elapsed()
    );
    Ok(summary)
}

/// Decode what can be decoded and keep the largest image.
fn decode_primary_image<D: ImageDecoder>(
    decoder: &D,
    raw_images: &[RawImage],
    page: u32,
) -> std::result::Result<DynamicImage, PageError> {
    let decoded = raw_images.iter().filter_map(|raw| match decoder.decode(raw) {
        Ok(image) => Some(image),
        Err(e) => {
            debug!("Skipping image {} on page {}: {}", raw.name, page, e);
            None
        }
    });

    largest_image(decoded).ok_or(PageError::NoImages)
}
