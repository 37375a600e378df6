//! Text extraction from stored uploads
//!
//! PDF and DOCX documents have their own extractors, legacy `.doc` files have
//! none unless one is registered. Callers decide what an extraction error means,
//! the upload service counts the file as empty and reports the error with it.

use std::{collections::HashMap, fs, io::Read, path::Path};

use lopdf::Document;
use quick_xml::{events::Event, Reader};

use crate::wf::error::ExtractError;

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path, content_type: &str) -> Result<String, ExtractError>;
}

/// Reads the file as UTF-8 text
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(&self, path: &Path, _content_type: &str) -> Result<String, ExtractError> {
        let bytes = fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| ExtractError::Encoding { path: path.to_path_buf() })
    }
}

fn document_err(path: &Path, message: impl ToString) -> ExtractError {
    ExtractError::Document {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Text of every page of a PDF, pages separated by a newline
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract_text(&self, path: &Path, _content_type: &str) -> Result<String, ExtractError> {
        let doc = Document::load(path).map_err(|e| document_err(path, e))?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut text = String::new();
        for page in pages {
            text.push_str(&doc.extract_text(&[page]).map_err(|e| document_err(path, e))?);
            text.push('\n');
        }
        Ok(text)
    }
}

/// Where a DOCX package keeps the body of the document
const DOCX_BODY: &str = "word/document.xml";

/// Text runs of a DOCX body, one line per paragraph
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract_text(&self, path: &Path, _content_type: &str) -> Result<String, ExtractError> {
        let file = fs::File::open(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| document_err(path, e))?;
        let mut xml = String::new();
        archive
            .by_name(DOCX_BODY)
            .map_err(|e| document_err(path, e))?
            .read_to_string(&mut xml)
            .map_err(|e| document_err(path, e))?;
        docx_body_text(&xml).map_err(|e| document_err(path, e))
    }
}

/// Keeps the content of `w:t` runs; paragraphs, breaks and tabs become whitespace
fn docx_body_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::with_capacity(xml.len() / 4);
    let mut in_run_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Picks an extractor from the file extension, like the upload service always did:
/// `.pdf` and `.docx` go to their document extractor, `.doc` needs one registered,
/// anything else is text
pub struct ExtensionExtractor {
    formats: HashMap<String, Box<dyn TextExtractor>>,
    text: PlainTextExtractor,
}

impl Default for ExtensionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionExtractor {
    pub fn new() -> Self {
        Self {
            formats: HashMap::new(),
            text: PlainTextExtractor,
        }
        .with_format("pdf", Box::new(PdfExtractor))
        .with_format("docx", Box::new(DocxExtractor))
    }

    /// Register an extractor for an extension, given without the dot
    pub fn with_format(mut self, extension: &str, extractor: Box<dyn TextExtractor>) -> Self {
        self.formats.insert(extension.to_lowercase(), extractor);
        self
    }
}

impl TextExtractor for ExtensionExtractor {
    fn extract_text(&self, path: &Path, content_type: &str) -> Result<String, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        if let Some(extractor) = self.formats.get(&extension) {
            return extractor.extract_text(path, content_type);
        }
        if extension == "doc" {
            return Err(ExtractError::Unsupported { extension });
        }
        self.text.extract_text(path, content_type)
    }
}
