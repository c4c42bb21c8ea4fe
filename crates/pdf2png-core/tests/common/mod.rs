//! Builds small scanned-style PDFs for tests.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// One image XObject placed on a page.
#[derive(Clone)]
pub struct TestImage {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub data: Vec<u8>,
    pub filter: Option<&'static str>,
}

impl TestImage {
    /// RGB image whose pixels depend on position and `seed`.
    pub fn rgb(width: u32, height: u32, seed: u8) -> Self {
        let data = (0..height)
            .flat_map(|y| {
                (0..width).flat_map(move |x| {
                    [
                        (x as u8).wrapping_mul(7).wrapping_add(seed),
                        (y as u8).wrapping_mul(13),
                        (x ^ y) as u8,
                    ]
                })
            })
            .collect();
        Self {
            width,
            height,
            color_space: "DeviceRGB",
            data,
            filter: None,
        }
    }

    /// 8-bit gray ramp, Flate-compressed.
    pub fn gray_flate(width: u32, height: u32) -> Self {
        let data = (0..width * height).map(|i| (i % 251) as u8).collect();
        Self {
            width,
            height,
            color_space: "DeviceGray",
            data,
            filter: Some("FlateDecode"),
        }
    }

    /// Declared as JPEG 2000, which has no decoder.
    pub fn undecodable(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_space: "DeviceRGB",
            data: vec![0xFF; 16],
            filter: Some("JPXDecode"),
        }
    }

    fn into_stream(self) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space,
            "BitsPerComponent" => 8,
        };

        let content = match self.filter {
            Some("FlateDecode") => {
                dict.set("Filter", "FlateDecode");
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&self.data).unwrap();
                encoder.finish().unwrap()
            }
            Some(other) => {
                dict.set("Filter", other);
                self.data
            }
            None => self.data,
        };

        let mut stream = Stream::new(dict, content);
        stream.allows_compression = false;
        stream
    }
}

/// Write a PDF with one page per entry, each page holding the given images.
pub fn write_pdf(path: &Path, pages: Vec<Vec<TestImage>>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for images in pages {
        let mut xobjects = Dictionary::new();
        let mut content = Vec::new();
        for (i, image) in images.into_iter().enumerate() {
            let name = format!("Im{}", i);
            let placement =
                format!("q {} 0 0 {} 0 0 cm /{} Do Q\n", image.width, image.height, name);
            content.extend_from_slice(placement.as_bytes());
            let image_id = doc.add_object(image.into_stream());
            xobjects.set(name, image_id);
        }

        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "XObject" => xobjects },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}
