//! Raw image XObject decoding into lossless bitmaps.
//!
//! Sampled data is kept at its native depth where PNG can hold it:
//! 8- and 16-bit gray and RGB pass through untouched, 1/2/4-bit samples
//! are scaled to 8-bit, and CMYK is converted to RGB.

use std::borrow::Cow;

use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::trace;

use super::ccitt::{self, CcittParams};
use super::{ImageDecoder, RawImage};
use crate::error::DecodeError;
use crate::models::config::DecodeConfig;

type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Nesting limit for color space arrays that refer to other color spaces.
const MAX_COLOR_SPACE_DEPTH: usize = 4;

/// Decoder for image XObjects of one document.
pub struct PdfImageDecoder<'a> {
    document: &'a Document,
    config: DecodeConfig,
}

/// Color space of sampled image data.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<ColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// Everything needed to turn a decompressed sample buffer into pixels.
#[derive(Debug, Clone)]
struct SampleLayout {
    width: u32,
    height: u32,
    bits: u8,
    color_space: ColorSpace,
    /// Per-component `/Decode` inversion.
    invert: Vec<bool>,
}

impl<'a> PdfImageDecoder<'a> {
    pub fn new(document: &'a Document, config: DecodeConfig) -> Self {
        Self { document, config }
    }

    fn resolve<'b>(&'b self, obj: &'b Object) -> &'b Object {
        self.document
            .dereference(obj)
            .map(|(_, resolved)| resolved)
            .unwrap_or(obj)
    }

    fn get<'b>(&'b self, dict: &'b Dictionary, key: &[u8]) -> Option<&'b Object> {
        dict.get(key).ok().map(|obj| self.resolve(obj))
    }

    fn integer(&self, dict: &Dictionary, key: &[u8]) -> Option<i64> {
        self.get(dict, key).and_then(|obj| obj.as_i64().ok())
    }

    fn dimension(&self, dict: &Dictionary, key: &[u8]) -> DecodeResult<u32> {
        let value = self.integer(dict, key).ok_or_else(|| {
            DecodeError::Malformed(format!("missing /{}", String::from_utf8_lossy(key)))
        })?;
        match u32::try_from(value) {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(DecodeError::Malformed(format!(
                "/{} must be positive, got {}",
                String::from_utf8_lossy(key),
                value
            ))),
        }
    }

    /// Filter names in application order.
    fn filters(&self, dict: &Dictionary) -> DecodeResult<Vec<Vec<u8>>> {
        let Some(filter) = self.get(dict, b"Filter") else {
            return Ok(Vec::new());
        };
        match filter {
            Object::Name(name) => Ok(vec![name.clone()]),
            Object::Array(items) => items
                .iter()
                .map(|item| match self.resolve(item) {
                    Object::Name(name) => Ok(name.clone()),
                    other => Err(DecodeError::Malformed(format!(
                        "filter entry is {}",
                        type_name(other)
                    ))),
                })
                .collect(),
            other => Err(DecodeError::Malformed(format!(
                "/Filter is {}",
                type_name(other)
            ))),
        }
    }

    fn is_image_mask(&self, dict: &Dictionary) -> bool {
        self.get(dict, b"ImageMask")
            .and_then(|obj| obj.as_bool().ok())
            .unwrap_or(false)
    }

    fn bits_per_component(&self, dict: &Dictionary) -> DecodeResult<u8> {
        let bits = self.integer(dict, b"BitsPerComponent").unwrap_or(8);
        match bits {
            1 | 2 | 4 | 8 | 16 => Ok(bits as u8),
            other => Err(DecodeError::UnsupportedBitDepth(other)),
        }
    }

    fn color_space(&self, obj: &Object, depth: usize) -> DecodeResult<ColorSpace> {
        if depth > MAX_COLOR_SPACE_DEPTH {
            return Err(DecodeError::UnsupportedColorSpace("nested too deeply".into()));
        }

        match self.resolve(obj) {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"G" | b"CalGray" => Ok(ColorSpace::Gray),
                b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(ColorSpace::Rgb),
                b"DeviceCMYK" | b"CMYK" => Ok(ColorSpace::Cmyk),
                other => Err(DecodeError::UnsupportedColorSpace(
                    String::from_utf8_lossy(other).into_owned(),
                )),
            },
            Object::Array(items) => {
                let family = items
                    .first()
                    .and_then(|item| self.resolve(item).as_name().ok())
                    .ok_or_else(|| DecodeError::Malformed("empty color space array".into()))?;
                match family {
                    b"ICCBased" => self.icc_color_space(items, depth),
                    b"Indexed" | b"I" => self.indexed_color_space(items, depth),
                    b"CalGray" => Ok(ColorSpace::Gray),
                    b"CalRGB" => Ok(ColorSpace::Rgb),
                    _ if items.len() == 1 => self.color_space(&items[0], depth + 1),
                    other => Err(DecodeError::UnsupportedColorSpace(
                        String::from_utf8_lossy(other).into_owned(),
                    )),
                }
            }
            other => Err(DecodeError::Malformed(format!(
                "/ColorSpace is {}",
                type_name(other)
            ))),
        }
    }

    fn icc_color_space(&self, items: &[Object], depth: usize) -> DecodeResult<ColorSpace> {
        let profile = items
            .get(1)
            .map(|obj| self.resolve(obj))
            .and_then(|obj| obj.as_stream().ok())
            .ok_or_else(|| DecodeError::Malformed("ICCBased without profile stream".into()))?;

        let components = self.integer(&profile.dict, b"N");
        match components {
            Some(1) => Ok(ColorSpace::Gray),
            Some(3) => Ok(ColorSpace::Rgb),
            Some(4) => Ok(ColorSpace::Cmyk),
            _ => match profile.dict.get(b"Alternate") {
                Ok(alternate) => self.color_space(alternate, depth + 1),
                Err(_) => Err(DecodeError::UnsupportedColorSpace(format!(
                    "ICCBased with N={:?}",
                    components
                ))),
            },
        }
    }

    fn indexed_color_space(&self, items: &[Object], depth: usize) -> DecodeResult<ColorSpace> {
        let [_, base, hival, lookup] = items else {
            return Err(DecodeError::Malformed(format!(
                "Indexed color space has {} entries",
                items.len()
            )));
        };

        let base = self.color_space(base, depth + 1)?;
        if matches!(base, ColorSpace::Indexed { .. }) {
            return Err(DecodeError::Malformed("Indexed base is Indexed".into()));
        }

        let hival = self
            .resolve(hival)
            .as_i64()
            .ok()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| DecodeError::Malformed("Indexed hival out of range".into()))?;

        let lookup = match self.resolve(lookup) {
            Object::String(bytes, _) => bytes.clone(),
            Object::Stream(stream) => self
                .decompress(stream, &self.filters(&stream.dict)?)?
                .into_owned(),
            other => {
                return Err(DecodeError::Malformed(format!(
                    "Indexed lookup is {}",
                    type_name(other)
                )));
            }
        };

        let expected = (hival as usize + 1) * base.components();
        if lookup.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: lookup.len(),
            });
        }

        Ok(ColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        })
    }

    /// Per-component inversion from a `/Decode` array such as `[1 0]`.
    fn decode_inversion(&self, dict: &Dictionary, components: usize) -> Vec<bool> {
        let mut invert = vec![false; components];
        if !self.config.apply_decode_array {
            return invert;
        }

        let Some(Object::Array(ranges)) = self.get(dict, b"Decode") else {
            return invert;
        };
        for (slot, pair) in invert.iter_mut().zip(ranges.chunks(2)) {
            if let [min, max] = pair {
                let (min, max) = (as_number(self.resolve(min)), as_number(self.resolve(max)));
                if let (Some(min), Some(max)) = (min, max) {
                    *slot = min > max;
                }
            }
        }
        invert
    }

    /// Apply general-purpose `filters` to the stream data.
    fn decompress<'s>(
        &self,
        stream: &'s Stream,
        filters: &[Vec<u8>],
    ) -> DecodeResult<Cow<'s, [u8]>> {
        if filters.is_empty() {
            return Ok(Cow::Borrowed(&stream.content));
        }

        for filter in filters {
            if !matches!(
                filter.as_slice(),
                b"FlateDecode" | b"LZWDecode" | b"ASCII85Decode"
            ) {
                return Err(DecodeError::UnsupportedFilter(
                    String::from_utf8_lossy(filter).into_owned(),
                ));
            }
        }

        // lopdf reads only direct filter names, and the chain may stop short
        // of an image codec.
        let mut chain = stream.clone();
        chain.dict.set(
            "Filter",
            Object::Array(filters.iter().cloned().map(Object::Name).collect()),
        );
        chain
            .decompressed_content()
            .map(Cow::Owned)
            .map_err(|e| DecodeError::Decompress(e.to_string()))
    }

    /// `/DecodeParms` of the filter at `index`.
    fn decode_parms<'b>(&'b self, dict: &'b Dictionary, index: usize) -> Option<&'b Dictionary> {
        match self.get(dict, b"DecodeParms")? {
            Object::Dictionary(parms) => Some(parms),
            Object::Array(items) => items
                .get(index)
                .and_then(|item| self.resolve(item).as_dict().ok()),
            _ => None,
        }
    }

    fn ccitt_params(
        &self,
        dict: &Dictionary,
        index: usize,
        width: u32,
        height: u32,
    ) -> CcittParams {
        let parms = self.decode_parms(dict, index);

        let mut params = CcittParams {
            columns: width,
            rows: Some(height),
            ..CcittParams::default()
        };
        let Some(parms) = parms else {
            return params;
        };

        if let Some(k) = self.integer(parms, b"K") {
            params.k = k;
        }
        let positive = |key: &[u8]| {
            self.integer(parms, key)
                .and_then(|v| u32::try_from(v).ok())
                .filter(|&v| v > 0)
        };
        let flag = |key: &[u8]| self.get(parms, key).and_then(|obj| obj.as_bool().ok());

        if let Some(columns) = positive(b"Columns") {
            params.columns = columns;
        }
        if let Some(rows) = positive(b"Rows") {
            params.rows = Some(rows);
        }
        if let Some(black_is_1) = flag(b"BlackIs1") {
            params.black_is_1 = black_is_1;
        }
        if let Some(byte_align) = flag(b"EncodedByteAlign") {
            params.byte_align = byte_align;
        }
        params
    }

    fn decode_jpeg(&self, data: &[u8], invert: bool) -> DecodeResult<DynamicImage> {
        let mut decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map_err(|e| DecodeError::Codec(e.to_string()))?;
        if invert {
            decoded.invert();
        }
        Ok(decoded)
    }
}

impl ImageDecoder for PdfImageDecoder<'_> {
    fn decode(&self, image: &RawImage) -> DecodeResult<DynamicImage> {
        let dict = &image.stream.dict;
        let width = self.dimension(dict, b"Width")?;
        let height = self.dimension(dict, b"Height")?;
        let filters = self.filters(dict)?;
        let image_mask = self.is_image_mask(dict);

        trace!(
            "Decoding {} ({}x{}), filters={:?}",
            image.name,
            width,
            height,
            filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect::<Vec<_>>()
        );

        let color_space = if image_mask {
            ColorSpace::Gray
        } else {
            match dict.get(b"ColorSpace") {
                Ok(obj) => self.color_space(obj, 0)?,
                Err(_) => {
                    trace!("{} has no /ColorSpace, assuming DeviceGray", image.name);
                    ColorSpace::Gray
                }
            }
        };
        let invert = self.decode_inversion(dict, color_space.components());

        // Image codecs come last; anything before them is general-purpose.
        let (data, bits) = match filters.split_last() {
            Some((codec, leading)) if codec.as_slice() == b"DCTDecode" => {
                let jpeg = self.decompress(&image.stream, leading)?;
                let invert_all = matches!(color_space, ColorSpace::Gray | ColorSpace::Rgb)
                    && invert.iter().all(|&i| i);
                return self.decode_jpeg(&jpeg, invert_all);
            }
            Some((codec, leading)) if codec.as_slice() == b"CCITTFaxDecode" => {
                let params = self.ccitt_params(dict, leading.len(), width, height);
                if params.columns != width {
                    return Err(DecodeError::Malformed(format!(
                        "CCITT /Columns {} differs from /Width {}",
                        params.columns, width
                    )));
                }
                let coded = self.decompress(&image.stream, leading)?;
                (Cow::Owned(ccitt::decode(&coded, &params)?), 1)
            }
            _ => {
                let bits = if image_mask { 1 } else { self.bits_per_component(dict)? };
                (self.decompress(&image.stream, &filters)?, bits)
            }
        };

        let layout = SampleLayout {
            width,
            height,
            bits,
            color_space,
            invert,
        };
        layout.to_image(&data)
    }
}

impl SampleLayout {
    fn to_image(&self, data: &[u8]) -> DecodeResult<DynamicImage> {
        let components = self.color_space.components();
        let width = self.width as usize;
        let height = self.height as usize;

        let samples_per_row = width
            .checked_mul(components)
            .ok_or_else(|| DecodeError::Malformed("image too large".into()))?;
        let row_bytes = samples_per_row
            .checked_mul(self.bits as usize)
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| DecodeError::Malformed("image too large".into()))?;
        let expected = row_bytes
            .checked_mul(height)
            .ok_or_else(|| DecodeError::Malformed("image too large".into()))?;
        if data.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let samples = unpack_samples(&data[..expected], row_bytes, samples_per_row, self.bits);

        if let ColorSpace::Indexed {
            base,
            hival,
            lookup,
        } = &self.color_space
        {
            if self.bits == 16 {
                return Err(DecodeError::UnsupportedBitDepth(16));
            }
            return self.expand_palette(&samples, base, *hival, lookup);
        }

        if self.bits == 16 {
            return self.build_16bit(samples);
        }

        let max = (1u32 << self.bits) - 1;
        let bytes: Vec<u8> = samples
            .into_iter()
            .enumerate()
            .map(|(i, sample)| {
                let value = (sample as u32 * 255 / max) as u8;
                if self.invert[i % components] { 255 - value } else { value }
            })
            .collect();
        self.build_8bit(bytes, &self.color_space)
    }

    fn build_8bit(&self, bytes: Vec<u8>, color_space: &ColorSpace) -> DecodeResult<DynamicImage> {
        let image = match color_space {
            ColorSpace::Gray => GrayImage::from_raw(self.width, self.height, bytes)
                .map(DynamicImage::ImageLuma8),
            ColorSpace::Rgb => {
                RgbImage::from_raw(self.width, self.height, bytes).map(DynamicImage::ImageRgb8)
            }
            ColorSpace::Cmyk => RgbImage::from_raw(self.width, self.height, cmyk_to_rgb(&bytes))
                .map(DynamicImage::ImageRgb8),
            ColorSpace::Indexed { .. } => None,
        };
        image.ok_or_else(|| {
            DecodeError::Malformed("sample buffer does not match dimensions".into())
        })
    }

    fn build_16bit(&self, samples: Vec<u16>) -> DecodeResult<DynamicImage> {
        let components = self.color_space.components();
        let samples: Vec<u16> = samples
            .into_iter()
            .enumerate()
            .map(|(i, v)| if self.invert[i % components] { u16::MAX - v } else { v })
            .collect();

        let image = match self.color_space {
            ColorSpace::Gray => {
                ImageBuffer::<Luma<u16>, _>::from_raw(self.width, self.height, samples)
                    .map(DynamicImage::ImageLuma16)
            }
            ColorSpace::Rgb => {
                ImageBuffer::<Rgb<u16>, _>::from_raw(self.width, self.height, samples)
                    .map(DynamicImage::ImageRgb16)
            }
            ColorSpace::Cmyk => {
                let bytes: Vec<u8> = samples.into_iter().map(|v| (v >> 8) as u8).collect();
                return self.build_8bit(bytes, &ColorSpace::Cmyk);
            }
            ColorSpace::Indexed { .. } => None,
        };
        image.ok_or_else(|| {
            DecodeError::Malformed("sample buffer does not match dimensions".into())
        })
    }

    fn expand_palette(
        &self,
        indices: &[u16],
        base: &ColorSpace,
        hival: u8,
        lookup: &[u8],
    ) -> DecodeResult<DynamicImage> {
        let components = base.components();
        let mut bytes = Vec::with_capacity(indices.len() * components);
        for &index in indices {
            let entry = index.min(hival as u16) as usize * components;
            bytes.extend_from_slice(&lookup[entry..entry + components]);
        }
        self.build_8bit(bytes, base)
    }
}

/// Split byte-aligned rows into samples of `bits` width.
fn unpack_samples(data: &[u8], row_bytes: usize, samples_per_row: usize, bits: u8) -> Vec<u16> {
    let rows = data.len() / row_bytes.max(1);
    let mut samples = Vec::with_capacity(rows * samples_per_row);

    for row in data.chunks_exact(row_bytes) {
        match bits {
            8 => samples.extend(row[..samples_per_row].iter().map(|&b| b as u16)),
            16 => samples.extend(
                row.chunks_exact(2)
                    .take(samples_per_row)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
            ),
            _ => {
                let per_byte = 8 / bits as usize;
                let mask = (1u16 << bits) - 1;
                samples.extend((0..samples_per_row).map(|i| {
                    let byte = row[i / per_byte] as u16;
                    let shift = 8 - bits as usize * (i % per_byte + 1);
                    (byte >> shift) & mask
                }));
            }
        }
    }
    samples
}

fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for pixel in cmyk.chunks_exact(4) {
        let k = 255 - pixel[3] as u32;
        for &ink in &pixel[..3] {
            rgb.push(((255 - ink as u32) * k / 255) as u8);
        }
    }
    rgb
}

fn type_name(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "a boolean",
        Object::Integer(_) => "an integer",
        Object::Real(_) => "a real",
        Object::Name(_) => "a name",
        Object::String(..) => "a string",
        Object::Array(_) => "an array",
        Object::Dictionary(_) => "a dictionary",
        Object::Stream(_) => "a stream",
        Object::Reference(_) => "a reference",
    }
}

fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}
