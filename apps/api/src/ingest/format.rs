use std::fmt;
use std::path::Path;

use serde::Serialize;

/// Closed set of artifact kinds the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    /// Office Open XML word-processing document (.docx).
    StructuredDoc,
    PlainText,
}

impl DocumentKind {
    /// Resolves the kind from the file name's final extension, ignoring ASCII case.
    /// Returns `None` for anything outside the supported set, including no extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::StructuredDoc),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::StructuredDoc => "docx",
            DocumentKind::PlainText => "txt",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
