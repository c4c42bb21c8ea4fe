//! Page and image resource enumeration using lopdf.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{PageSource, PdfImageDecoder, RawImage, Result};
use crate::error::PdfError;
use crate::models::config::DecodeConfig;

/// An opened PDF. Dropping it releases the parsed document.
pub struct PdfDocument {
    document: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfDocument {
    /// Open and parse a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let document = Document::load(path).map_err(|e| PdfError::Parse(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: Document) -> Result<Self> {
        if document.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        let pages = document.get_pages();
        debug!("Loaded PDF with {} pages", pages.len());
        Ok(Self { document, pages })
    }

    /// Decoder bound to this document, for resolving indirect color spaces.
    pub fn decoder(&self, config: &DecodeConfig) -> PdfImageDecoder<'_> {
        PdfImageDecoder::new(&self.document, config.clone())
    }

    /// Resources dictionary of a page, following `/Parent` inheritance.
    fn page_resources(&self, page_id: ObjectId) -> Result<Option<&Dictionary>> {
        let mut visited = HashSet::new();
        let mut node_id = page_id;

        loop {
            if !visited.insert(node_id) {
                return Err(PdfError::Resources(format!(
                    "cycle in page tree at object {} {}",
                    node_id.0, node_id.1
                )));
            }

            let node = self
                .document
                .get_dictionary(node_id)
                .map_err(|e| PdfError::Resources(e.to_string()))?;

            if let Ok(resources) = node.get(b"Resources") {
                return match self.document.dereference(resources) {
                    Ok((_, Object::Dictionary(dict))) => Ok(Some(dict)),
                    _ => Err(PdfError::Resources("/Resources is not a dictionary".into())),
                };
            }

            match node.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => node_id = *parent_id,
                _ => return Ok(None),
            }
        }
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_images(&self, page: u32) -> Result<Vec<RawImage>> {
        let page_id = *self.pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let Some(resources) = self.page_resources(page_id)? else {
            debug!("Page {} has no resources", page);
            return Ok(Vec::new());
        };

        let xobjects = match resources.get(b"XObject") {
            Ok(obj) => match self.document.dereference(obj) {
                Ok((_, Object::Dictionary(dict))) => dict,
                _ => return Err(PdfError::Resources("/XObject is not a dictionary".into())),
            },
            Err(_) => return Ok(Vec::new()),
        };

        let mut images = Vec::new();
        for (name, obj) in xobjects.iter() {
            let Ok((_, Object::Stream(stream))) = self.document.dereference(obj) else {
                trace!("Skipping non-stream XObject {}", String::from_utf8_lossy(name));
                continue;
            };

            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Image");
            if !is_image {
                trace!("Skipping non-image XObject {}", String::from_utf8_lossy(name));
                continue;
            }

            images.push(RawImage {
                name: String::from_utf8_lossy(name).into_owned(),
                stream: stream.clone(),
            });
        }

        debug!("Found {} image resources on page {}", images.len(), page);
        Ok(images)
    }
}
