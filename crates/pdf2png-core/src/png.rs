//! Lossless PNG output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::DynamicImage;
use image::codecs::png::PngEncoder;
use tracing::trace;

use crate::error::PageError;
use crate::models::config::PngConfig;

/// Encode `image` as PNG into `writer`. Pixel values are written unchanged.
pub fn encode_png<W: Write>(
    image: &DynamicImage,
    writer: W,
    config: &PngConfig,
) -> Result<(), PageError> {
    let encoder =
        PngEncoder::new_with_quality(writer, config.compression.into(), config.filter.into());
    image.write_with_encoder(encoder)?;
    Ok(())
}

/// Write `image` to `path`, truncating any existing file.
pub fn write_png(image: &DynamicImage, path: &Path, config: &PngConfig) -> Result<(), PageError> {
    let file = File::create(path).map_err(|source| PageError::Create {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = BufWriter::new(file);
    encode_png(image, &mut writer, config)?;
    writer.flush().map_err(|e| PageError::Encode(e.into()))?;

    trace!("Wrote {}x{} PNG to {}", image.width(), image.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{PngCompression, PngFilter};
    use image::{ImageFormat, Rgb, RgbImage};

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(17, 9, |x, y| {
            Rgb([(x * 15) as u8, (y * 28) as u8, ((x + y) * 7) as u8])
        }))
    }

    #[test]
    fn test_every_setting_is_lossless() {
        let source = gradient();
        for compression in [PngCompression::Fast, PngCompression::Default, PngCompression::Best] {
            for filter in [PngFilter::None, PngFilter::Paeth, PngFilter::Adaptive] {
                let mut bytes = Vec::new();
                encode_png(&source, &mut bytes, &PngConfig { compression, filter }).unwrap();

                let decoded =
                    image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
                assert_eq!(decoded.as_rgb8().unwrap().as_raw(), source.as_rgb8().unwrap().as_raw());
            }
        }
    }

    #[test]
    fn test_write_png_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        std::fs::write(&path, vec![0xAA; 1 << 16]).unwrap();

        write_png(&gradient(), &path, &PngConfig::default()).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (17, 9));
        assert!(std::fs::metadata(&path).unwrap().len() < 1 << 16);
    }

    #[test]
    fn test_missing_directory_is_create_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");

        let err = write_png(&gradient(), &path, &PngConfig::default()).unwrap_err();
        assert!(matches!(err, PageError::Create { .. }));
    }
}
