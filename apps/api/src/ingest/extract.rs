//! Format-specific text extraction.
//!
//! Callers hand over a fully buffered artifact plus the kind resolved by
//! [`DocumentKind::from_file_name`]; each strategy returns plain UTF-8 text.

use std::io::{Cursor, Read};

use thiserror::Error;

use crate::ingest::format::DocumentKind;

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const DOCX_MAIN_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("corrupt {kind} document: {reason}")]
    CorruptDocument { kind: DocumentKind, reason: String },

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

impl ExtractionError {
    fn corrupt(kind: DocumentKind, reason: impl ToString) -> Self {
        ExtractionError::CorruptDocument {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// Text pulled out of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub text: String,
}

impl ExtractedDocument {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Converts raw bytes of a known kind into plain text.
///
/// Carried in `AppState` as `Arc<dyn TextExtractor>` so tests can count or fail calls.
/// Implementations are synchronous; callers run them on the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError>;
}

/// Production extractor: pdf-extract for PDF, zip + quick-xml for DOCX, UTF-8 for text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
        match kind {
            DocumentKind::Pdf => extract_pdf(bytes),
            DocumentKind::StructuredDoc => extract_docx(bytes),
            DocumentKind::PlainText => Ok(decode_plain_text(bytes)),
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractionError::corrupt(DocumentKind::Pdf, "PDF parser aborted"))?
        .map_err(|e| ExtractionError::corrupt(DocumentKind::Pdf, e))?;

    let mut out = String::new();
    for page in &pages {
        out.push_str(page.trim());
        out.push('\n');
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let kind = DocumentKind::StructuredDoc;
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractionError::corrupt(kind, e))?;

    let entry = archive.by_name(DOCX_MAIN_PART).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            ExtractionError::corrupt(kind, "no main document part")
        }
        other => ExtractionError::corrupt(kind, other),
    })?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractionError::corrupt(kind, e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractionError::corrupt(
            kind,
            format!("{DOCX_MAIN_PART} exceeds size limit ({MAX_XML_ENTRY_BYTES} bytes)"),
        ));
    }

    body_paragraph_text(&xml)
}

/// Walks `w:body` and emits one line per paragraph, in document order.
///
/// This is wider than iterating only the direct paragraph children of the
/// body: paragraphs inside table cells are emitted too, so tabular resumes
/// keep their text. Text-box paragraphs nested inside a paragraph fold into
/// their host paragraph.
fn body_paragraph_text(xml: &[u8]) -> Result<String, ExtractionError> {
    use quick_xml::events::Event;

    let kind = DocumentKind::StructuredDoc;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut depth = 0usize;
    let mut saw_body = false;
    let mut in_body = false;
    let mut paragraph_depth: Option<usize> = None;
    let mut in_text = false;
    let mut current = String::new();
    let mut out = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                match e.local_name().as_ref() {
                    b"body" if !saw_body => {
                        saw_body = true;
                        in_body = true;
                    }
                    b"p" if in_body && paragraph_depth.is_none() => {
                        paragraph_depth = Some(depth);
                        current.clear();
                    }
                    b"t" if paragraph_depth.is_some() => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"body" if !saw_body => saw_body = true,
                b"p" if in_body && paragraph_depth.is_none() => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractionError::corrupt(kind, e))?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if in_text => {
                current.push_str(&String::from_utf8_lossy(&c));
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if paragraph_depth == Some(depth) => {
                        out.push_str(&current);
                        out.push('\n');
                        paragraph_depth = None;
                    }
                    b"body" if in_body && paragraph_depth.is_none() => in_body = false,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::corrupt(kind, e)),
            _ => {}
        }
        buf.clear();
    }

    if !saw_body {
        return Err(ExtractionError::corrupt(kind, "document has no body"));
    }
    Ok(out)
}

fn decode_plain_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
