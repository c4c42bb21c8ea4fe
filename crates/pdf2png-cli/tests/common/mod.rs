//! Minimal scanned-style PDFs for exercising the binary.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// Write a PDF with one page per `(width, height)`, each holding one gray
/// image. A `None` page gets an image declared with an undecodable filter.
pub fn write_pdf(path: &Path, pages: &[Option<(u32, u32)>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for page in pages {
        let image = match page {
            Some((width, height)) => Stream::new(
                image_dict(*width, *height),
                (0..width * height).map(|i| (i % 256) as u8).collect(),
            ),
            None => {
                let mut dict = image_dict(8, 8);
                dict.set("Filter", "JBIG2Decode");
                Stream::new(dict, vec![0; 8])
            }
        };
        let image_id = doc.add_object(image);

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
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

fn image_dict(width: u32, height: u32) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceGray",
        "BitsPerComponent" => 8,
    }
}
